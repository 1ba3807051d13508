// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.
//!
//! Timer tuning overrides (`TW_TICK_MS` and friends) live in `tw_engine::env`.

use std::path::PathBuf;

/// Config file used when `--config` is not given
pub fn config_path() -> Option<PathBuf> {
    std::env::var("TW_CONFIG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}
