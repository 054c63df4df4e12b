// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor manager configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Resume calls made after an upload before giving up.
    pub resume_attempts: u32,
    /// Delay between a resume call and the state poll that confirms it.
    pub resume_delay_ms: u64,
    /// Baud rate used when neither the client nor the cache has one.
    pub default_baudrates: BTreeMap<String, String>,
    /// Per-request timeout of the HTTP monitor transport.
    pub request_timeout_ms: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            resume_attempts: 5,
            resume_delay_ms: 500,
            default_baudrates: BTreeMap::from([("serial".to_string(), "9600".to_string())]),
            request_timeout_ms: 5_000,
        }
    }
}

impl ManagerConfig {
    boardlab_core::setters! {
        set {
            resume_attempts: u32,
            resume_delay_ms: u64,
        }
    }

    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Default baud rate for `protocol`, if it has one.
    pub fn default_baudrate(&self, protocol: &str) -> Option<&str> {
        self.default_baudrates.get(protocol).map(String::as_str)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
