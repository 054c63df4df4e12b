// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod bridge;
pub mod monitor;

use boardlab_bridge::{BridgeConfig, BridgeError};

use crate::exit_error::{codes, ExitError};

/// Load bridge configuration, letting `--bridge-port` win over the file
/// and environment.
pub fn load_config(bridge_port: Option<u16>) -> anyhow::Result<BridgeConfig> {
    let mut config = BridgeConfig::load()?;
    if let Some(port) = bridge_port {
        config.preferred_port = port;
    }
    Ok(config)
}

/// Client id the CLI attaches with. Unique per process.
pub fn cli_client_id() -> String {
    format!("boardlab-cli-{}", std::process::id())
}

/// Map a bridge failure to an exit error, preferring the one-shot
/// occupancy notice when there is one.
pub fn bridge_failure(err: BridgeError, notice: Option<String>) -> anyhow::Error {
    match (err.is_port_occupied(), notice) {
        (true, Some(notice)) => ExitError::new(codes::PORT_OCCUPIED, notice).into(),
        (true, None) => ExitError::new(codes::PORT_OCCUPIED, err.to_string()).into(),
        (false, _) => anyhow::Error::new(err).context("bridge unavailable"),
    }
}
