// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tw - timing-wheel scheduler CLI

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod env;
mod output;

use output::OutputFormat;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use commands::{bench, config};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tw_engine::TimerConfig;

#[derive(Parser)]
#[command(
    name = "tw",
    version,
    about = "Hierarchical timing-wheel scheduler"
)]
struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    /// Timer config file (TOML)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long = "log-file", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule a burst of timers and report how late they fired
    Bench(bench::BenchArgs),
    /// Print the effective timer configuration
    Config(config::ConfigArgs),
}

fn cli_command() -> clap::Command {
    Cli::command()
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(1);
    }
}

/// Format an anyhow error, deduplicating the chain.
///
/// If the top-level Display already contains the source error text, the
/// "Caused by" chain is skipped. Otherwise the full chain is rendered.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            cli_command().print_help()?;
            println!();
            return Ok(());
        }
    };

    let _guard = setup_logging(cli.log_file.as_deref())?;
    let config_path = cli.config.or_else(env::config_path);
    let config = load_config(config_path.as_deref())?;

    match command {
        Commands::Bench(args) => bench::handle(args, config, format).await?,
        Commands::Config(args) => config::handle(args, config, format)?,
    }

    Ok(())
}

/// Defaults, then the TOML file if any, then `TW_*` overrides.
fn load_config(path: Option<&Path>) -> Result<TimerConfig> {
    let config = match path {
        Some(path) => TimerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TimerConfig::default(),
    };
    Ok(config.with_env())
}

/// Install the tracing subscriber.
///
/// Logs go to stderr so stdout stays parseable, or to `log_file` through a
/// non-blocking writer whose guard must outlive the command.
fn setup_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let file_name = path
        .file_name()
        .with_context(|| format!("log path has no file name: {}", path.display()))?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(Some(guard))
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
