// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caches the manager keeps next to its sessions: monitors the bridge runs
//! and the last baud rate used per port.

use boardlab_core::{PortIdentifier, PortKey, RunningMonitor};
use std::collections::BTreeMap;

/// Monitors the bridge reports as running, keyed by port.
#[derive(Debug, Default)]
pub struct RunningMonitors {
    monitors: BTreeMap<PortKey, RunningMonitor>,
}

impl RunningMonitors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns true when the list changed.
    pub fn upsert(&mut self, monitor: RunningMonitor) -> bool {
        let key = monitor.port.key();
        if self.monitors.get(&key) == Some(&monitor) {
            return false;
        }
        self.monitors.insert(key, monitor);
        true
    }

    /// Returns true when a monitor was removed.
    pub fn remove(&mut self, port: &PortIdentifier) -> bool {
        self.monitors.remove(port.key().as_str()).is_some()
    }

    pub fn get(&self, port: &PortIdentifier) -> Option<&RunningMonitor> {
        self.monitors.get(port.key().as_str())
    }

    pub fn contains(&self, port: &PortIdentifier) -> bool {
        self.monitors.contains_key(port.key().as_str())
    }

    /// Replace the whole list with a bridge report. Returns true on change.
    pub fn replace_all(&mut self, monitors: impl IntoIterator<Item = RunningMonitor>) -> bool {
        let next: BTreeMap<PortKey, RunningMonitor> =
            monitors.into_iter().map(|m| (m.port.key(), m)).collect();
        if next == self.monitors {
            return false;
        }
        self.monitors = next;
        true
    }

    /// Overwrite the baud rate of a running monitor. Returns true on change.
    pub fn set_baudrate(&mut self, port: &PortIdentifier, baudrate: &str) -> bool {
        match self.monitors.get_mut(port.key().as_str()) {
            Some(monitor) if monitor.baudrate.as_deref() != Some(baudrate) => {
                monitor.baudrate = Some(baudrate.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn list(&self) -> Vec<RunningMonitor> {
        self.monitors.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

/// Last baud rate seen per port.
#[derive(Debug, Default)]
pub struct BaudrateCache {
    rates: BTreeMap<PortKey, String>,
}

impl BaudrateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, port: &PortIdentifier) -> Option<&str> {
        self.rates.get(port.key().as_str()).map(String::as_str)
    }

    /// Returns true when the cached value changed.
    pub fn set(&mut self, port: &PortIdentifier, baudrate: impl Into<String>) -> bool {
        let baudrate = baudrate.into();
        if baudrate.is_empty() {
            return false;
        }
        let key = port.key();
        if self.rates.get(&key) == Some(&baudrate) {
            return false;
        }
        self.rates.insert(key, baudrate);
        true
    }
}

#[cfg(test)]
#[path = "caches_tests.rs"]
mod tests;
