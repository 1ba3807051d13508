// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tw config` - print the effective timer configuration.

use anyhow::Result;
use clap::Args;
use tw_engine::TimerConfig;

use crate::output::{print_json, OutputFormat};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Show values as loaded, before minimums are enforced
    #[arg(long)]
    pub raw: bool,
}

pub fn handle(args: ConfigArgs, config: TimerConfig, format: OutputFormat) -> Result<()> {
    let config = effective(&args, config);
    match format {
        OutputFormat::Text => print!("{}", render(&config)?),
        OutputFormat::Json => print_json(&config)?,
    }
    Ok(())
}

fn effective(args: &ConfigArgs, config: TimerConfig) -> TimerConfig {
    if args.raw {
        config
    } else {
        config.validated()
    }
}

/// TOML text that [`TimerConfig::from_toml_str`] reads back unchanged.
fn render(config: &TimerConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}
