//! CLI error reporting specs

use crate::prelude::*;

#[test]
fn unknown_subcommand_fails() {
    cli().args(&["frobnicate"]).fails().stderr_has("frobnicate");
}

#[test]
fn missing_config_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");

    cli()
        .args(&["config", "--config", &path.to_string_lossy()])
        .fails()
        .stderr_has("Error:")
        .stderr_has("missing.toml");
}

#[test]
fn malformed_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tw.toml");
    std::fs::write(&path, "tick_ms = \"soon\"\n").unwrap();

    cli()
        .args(&["config", "--config", &path.to_string_lossy()])
        .fails()
        .stderr_has("invalid config");
}

#[test]
fn bench_rejects_out_of_range_cancel_ratio() {
    cli()
        .args(&["bench", "--cancel-ratio", "2"])
        .fails()
        .stderr_has("--cancel-ratio");
}
