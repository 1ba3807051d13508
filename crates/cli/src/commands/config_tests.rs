// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn effective_config_enforces_minimums() {
    let loaded = TimerConfig {
        tick_ms: 1,
        slot_size: 4,
        ..TimerConfig::default()
    };

    let config = effective(&ConfigArgs::default(), loaded);
    assert_eq!(config.slot_size, 20);
}

#[test]
fn raw_config_is_left_alone() {
    let loaded = TimerConfig {
        slot_size: 4,
        ..TimerConfig::default()
    };

    let config = effective(&ConfigArgs { raw: true }, loaded.clone());
    assert_eq!(config, loaded);
}

#[test]
fn rendered_toml_reads_back() {
    let config = TimerConfig {
        name: "bench".to_string(),
        tick_ms: 5,
        stats: true,
        ..TimerConfig::default()
    };

    let text = render(&config).unwrap();
    assert!(text.contains("tick_ms = 5"));
    assert_eq!(TimerConfig::from_toml_str(&text).unwrap(), config);
}
