//! CLI help output specs

use crate::prelude::*;

#[test]
fn tw_no_args_shows_usage_and_exits_zero() {
    cli().passes().stdout_has("Usage:");
}

#[test]
fn tw_help_lists_subcommands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("bench")
        .stdout_has("config");
}

#[test]
fn tw_bench_help_shows_flags() {
    cli()
        .args(&["bench", "--help"])
        .passes()
        .stdout_has("--max-delay-ms")
        .stdout_has("--cancel-ratio")
        .stdout_has("--repeat");
}

#[test]
fn tw_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}
