//! `tw config` specs

use crate::prelude::*;

#[test]
fn defaults_print_as_toml() {
    cli()
        .args(&["config"])
        .passes()
        .stdout_has("name = \"timer\"")
        .stdout_has("tick_ms = 1")
        .stdout_has("slot_size = 64")
        .stdout_has("clock = \"system\"");
}

#[test]
fn file_values_are_validated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tw.toml");
    std::fs::write(&path, "name = \"edge\"\ntick_ms = 1\nslot_size = 4\n").unwrap();

    let json = cli()
        .args(&["config", "--config", &path.to_string_lossy(), "-o", "json"])
        .passes()
        .stdout_json();

    assert_eq!(json["name"], "edge");
    assert_eq!(json["slot_size"], 20);
}

#[test]
fn raw_skips_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tw.toml");
    std::fs::write(&path, "slot_size = 4\n").unwrap();

    cli()
        .args(&["config", "--raw", "--config", &path.to_string_lossy()])
        .passes()
        .stdout_has("slot_size = 4");
}

#[test]
fn env_overrides_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tw.toml");
    std::fs::write(&path, "tick_ms = 5\n").unwrap();

    let json = cli()
        .args(&["config", "-o", "json"])
        .env("TW_CONFIG", &path)
        .env("TW_TICK_MS", "10")
        .passes()
        .stdout_json();

    assert_eq!(json["tick_ms"], 10);
}
