// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridge client configuration.
//!
//! Layering: built-in defaults, then `<state_dir>/bridge.toml`, then
//! environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::env;
use crate::error::BridgeError;
use crate::identity::{HostIdentity, IdentityStrictness};

pub const DEFAULT_BRIDGE_PORT: u16 = 55888;
pub const CONFIG_FILE_NAME: &str = "bridge.toml";
pub const LEASE_FILE_NAME: &str = "bridge-owner.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Loopback port the bridge listens on; shared by every host on the machine.
    pub preferred_port: u16,
    /// Heartbeat period; `<= 0` disables the heartbeat.
    pub heartbeat_interval_ms: i64,
    /// Bridge-side token expiry; `<= 0` disables the heartbeat.
    pub heartbeat_timeout_ms: i64,
    pub log_heartbeat: bool,
    /// Interpreter or executable that runs the bridge.
    pub program: String,
    /// Script passed to `program`, if any.
    pub entry: Option<PathBuf>,
    pub cli_path: String,
    pub state_dir: PathBuf,
    pub identity_strictness: IdentityStrictness,
    /// Identity of this host; compared against the running bridge.
    pub extension_id: String,
    pub version: Option<String>,
    pub extension_path: Option<PathBuf>,
    pub mode: Option<String>,
    pub commit: Option<String>,

    pub health_timeout_ms: u64,
    pub startup_poll_interval_ms: u64,
    pub startup_attempts: u32,
    pub stop_grace_ms: u64,
    pub retry_backoff_ms: u64,
    pub takeover_cooldown_ms: u64,
    pub fresh_owner_window_ms: u64,
    pub takeover_startup_retries: u32,
    pub stale_host_wait_attempts: u32,
    pub decision_dedupe_window_ms: u64,
    pub decision_dedupe_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            preferred_port: DEFAULT_BRIDGE_PORT,
            heartbeat_interval_ms: 5_000,
            heartbeat_timeout_ms: 20_000,
            log_heartbeat: false,
            program: "node".to_string(),
            entry: None,
            cli_path: "arduino-cli".to_string(),
            state_dir: PathBuf::from(".boardlab"),
            identity_strictness: IdentityStrictness::Lenient,
            extension_id: "boardlab".to_string(),
            version: None,
            extension_path: None,
            mode: None,
            commit: None,
            health_timeout_ms: 1_500,
            startup_poll_interval_ms: 250,
            startup_attempts: 60,
            stop_grace_ms: 3_000,
            retry_backoff_ms: 750,
            takeover_cooldown_ms: 30_000,
            fresh_owner_window_ms: 15_000,
            takeover_startup_retries: 3,
            stale_host_wait_attempts: 20,
            decision_dedupe_window_ms: 60_000,
            decision_dedupe_capacity: 64,
        }
    }
}

impl BridgeConfig {
    /// Load from the process environment and the state directory's TOML file.
    pub fn load() -> Result<Self, BridgeError> {
        Self::load_with(&|key| std::env::var(key).ok())
    }

    /// Same as [`BridgeConfig::load`] with an injectable variable lookup.
    pub fn load_with(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, BridgeError> {
        let state_dir = env::state_dir_from(lookup)?;
        let file = state_dir.join(CONFIG_FILE_NAME);
        let mut config = if file.exists() { Self::from_file(&file)? } else { Self::default() };
        config.state_dir = state_dir;
        config.apply_env(lookup)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, BridgeError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Override fields from environment variables.
    pub fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<(), BridgeError> {
        if let Some(port) = lookup(env::BRIDGE_PORT) {
            self.preferred_port = parse_var(env::BRIDGE_PORT, &port)?;
        }
        if let Some(ms) = lookup(env::HEARTBEAT_INTERVAL_MS) {
            self.heartbeat_interval_ms = parse_var(env::HEARTBEAT_INTERVAL_MS, &ms)?;
        }
        if let Some(ms) = lookup(env::HEARTBEAT_TIMEOUT_MS) {
            self.heartbeat_timeout_ms = parse_var(env::HEARTBEAT_TIMEOUT_MS, &ms)?;
        }
        if let Some(flag) = lookup(env::LOG_HEARTBEAT) {
            self.log_heartbeat = env::parse_flag(&flag).ok_or_else(|| {
                BridgeError::Config(format!("{}: expected a boolean, got {:?}", env::LOG_HEARTBEAT, flag))
            })?;
        }
        if let Some(program) = lookup(env::BRIDGE_PROGRAM).filter(|s| !s.is_empty()) {
            self.program = program;
        }
        if let Some(entry) = lookup(env::BRIDGE_ENTRY).filter(|s| !s.is_empty()) {
            self.entry = Some(PathBuf::from(entry));
        }
        if let Some(cli) = lookup(env::CLI_PATH).filter(|s| !s.is_empty()) {
            self.cli_path = cli;
        }
        if let Some(strictness) = lookup(env::IDENTITY_STRICTNESS) {
            self.identity_strictness = strictness.parse()?;
        }
        if self.preferred_port == 0 {
            return Err(BridgeError::Config(format!("{}: port must be non-zero", env::BRIDGE_PORT)));
        }
        Ok(())
    }

    boardlab_core::setters! {
        option {
            version: String,
            extension_path: PathBuf,
            mode: String,
            commit: String,
        }
    }

    /// Identity this host presents to the bridge.
    pub fn host_identity(&self) -> HostIdentity {
        HostIdentity {
            version: self.version.clone(),
            extension_path: self.extension_path.clone(),
            mode: self.mode.clone(),
            commit: self.commit.clone(),
        }
    }

    /// `None` when the heartbeat is disabled.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        if self.heartbeat_interval_ms <= 0 || self.heartbeat_timeout_ms <= 0 {
            return None;
        }
        Some(Duration::from_millis(self.heartbeat_interval_ms as u64))
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    pub fn startup_poll_interval(&self) -> Duration {
        Duration::from_millis(self.startup_poll_interval_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn lease_path(&self) -> PathBuf {
        self.state_dir.join(LEASE_FILE_NAME)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, BridgeError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| BridgeError::Config(format!("{}: {} ({:?})", name, e, value)))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
