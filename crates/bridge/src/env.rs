// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the bridge crate.

use std::path::PathBuf;

use crate::error::BridgeError;

pub const BRIDGE_PORT: &str = "BOARDLAB_BRIDGE_PORT";
pub const HEARTBEAT_INTERVAL_MS: &str = "BOARDLAB_HEARTBEAT_INTERVAL_MS";
pub const HEARTBEAT_TIMEOUT_MS: &str = "BOARDLAB_HEARTBEAT_TIMEOUT_MS";
pub const LOG_HEARTBEAT: &str = "BOARDLAB_LOG_HEARTBEAT";
pub const BRIDGE_PROGRAM: &str = "BOARDLAB_BRIDGE_PROGRAM";
pub const BRIDGE_ENTRY: &str = "BOARDLAB_BRIDGE_ENTRY";
pub const CLI_PATH: &str = "BOARDLAB_CLI_PATH";
pub const STATE_DIR: &str = "BOARDLAB_STATE_DIR";
pub const IDENTITY_STRICTNESS: &str = "BOARDLAB_IDENTITY_STRICTNESS";

/// Resolve state directory: BOARDLAB_STATE_DIR > XDG_STATE_HOME/boardlab > ~/.local/state/boardlab
pub fn state_dir() -> Result<PathBuf, BridgeError> {
    state_dir_from(&|key| std::env::var(key).ok())
}

pub(crate) fn state_dir_from(
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<PathBuf, BridgeError> {
    if let Some(dir) = lookup(STATE_DIR).filter(|s| !s.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = lookup("XDG_STATE_HOME").filter(|s| !s.is_empty()) {
        return Ok(PathBuf::from(xdg).join("boardlab"));
    }
    let home = dirs::home_dir()
        .ok_or_else(|| BridgeError::Config("cannot determine home directory".into()))?;
    Ok(home.join(".local/state/boardlab"))
}

/// Parse a boolean flag the way shells usually spell it.
pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
