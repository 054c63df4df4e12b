// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auxiliary state registries kept next to the session table.
//!
//! - [`PhysicalStateRegistry`]: hardware detection per port, with transition
//!   history, consolidated into one list for clients.
//! - [`RuntimeStateRegistry`]: externally observable monitor lifecycle per
//!   port ([`MonitorRuntimeState`]), independent of session desired/status.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::port::{PortIdentifier, PortKey};

/// Detection state of one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalState {
    pub port: PortIdentifier,
    pub detected: bool,
    pub changed_at_ms: u64,
    pub transitions: u32,
}

/// A detection flip recorded by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionTransition {
    pub port: PortIdentifier,
    pub detected: bool,
    pub at_ms: u64,
}

#[derive(Debug, Default)]
pub struct PhysicalStateRegistry {
    states: BTreeMap<PortKey, PhysicalState>,
    /// Set once the bridge delivered a full detected-ports list.
    reported: bool,
}

impl PhysicalStateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a full detected-ports list. Ports absent from the list become
    /// undetected. Returns the transitions in key order.
    pub fn apply_detected_ports<'a>(
        &mut self,
        ports: impl IntoIterator<Item = &'a PortIdentifier>,
        at_ms: u64,
    ) -> Vec<DetectionTransition> {
        self.reported = true;
        let present: BTreeMap<PortKey, &PortIdentifier> =
            ports.into_iter().map(|port| (port.key(), port)).collect();

        let mut transitions = Vec::new();
        let known: BTreeSet<PortKey> = self.states.keys().cloned().collect();
        for key in known.iter().filter(|key| !present.contains_key(*key)) {
            if let Some(state) = self.states.get(key) {
                let port = state.port.clone();
                transitions.extend(self.record(&port, false, at_ms));
            }
        }
        for port in present.values() {
            transitions.extend(self.record(port, true, at_ms));
        }
        transitions.sort_by(|a, b| a.port.cmp(&b.port));
        transitions
    }

    /// Record a single port's detection. Returns the transition if it changed.
    pub fn record(
        &mut self,
        port: &PortIdentifier,
        detected: bool,
        at_ms: u64,
    ) -> Option<DetectionTransition> {
        let key = port.key();
        match self.states.get_mut(&key) {
            Some(state) if state.detected == detected => None,
            Some(state) => {
                state.detected = detected;
                state.changed_at_ms = at_ms;
                state.transitions = state.transitions.saturating_add(1);
                Some(DetectionTransition { port: port.clone(), detected, at_ms })
            }
            None => {
                self.states.insert(
                    key,
                    PhysicalState {
                        port: port.clone(),
                        detected,
                        changed_at_ms: at_ms,
                        transitions: 1,
                    },
                );
                Some(DetectionTransition { port: port.clone(), detected, at_ms })
            }
        }
    }

    /// Detection for `port`.
    ///
    /// Before the bridge reported anything every port is assumed present so
    /// clients can open monitors immediately; afterwards unknown ports are
    /// treated as absent.
    pub fn is_detected(&self, port: &PortIdentifier) -> bool {
        match self.states.get(port.key().as_str()) {
            Some(state) => state.detected,
            None => !self.reported,
        }
    }

    pub fn has_report(&self) -> bool {
        self.reported
    }

    pub fn detected_ports(&self) -> Vec<PortIdentifier> {
        self.states.values().filter(|s| s.detected).map(|s| s.port.clone()).collect()
    }

    pub fn snapshot(&self) -> Vec<PhysicalState> {
        self.states.values().cloned().collect()
    }
}

/// Externally observable lifecycle of a port's monitor (status bar, tasks).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorRuntimeState {
    #[default]
    Disconnected,
    Connected,
    Running,
    Suspended,
}

crate::simple_display! {
    MonitorRuntimeState {
        Disconnected => "disconnected",
        Connected => "connected",
        Running => "running",
        Suspended => "suspended",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeStateChange {
    pub port: PortIdentifier,
    pub previous: MonitorRuntimeState,
    pub current: MonitorRuntimeState,
}

#[derive(Debug, Default)]
pub struct RuntimeStateRegistry {
    states: BTreeMap<PortKey, MonitorRuntimeState>,
}

impl RuntimeStateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, port: &PortIdentifier) -> MonitorRuntimeState {
        self.states.get(port.key().as_str()).copied().unwrap_or_default()
    }

    /// Set the state; returns the change when it differs from the current one.
    /// `Disconnected` entries are dropped rather than stored.
    pub fn set(
        &mut self,
        port: &PortIdentifier,
        state: MonitorRuntimeState,
    ) -> Option<RuntimeStateChange> {
        let key = port.key();
        let previous = self.states.get(&key).copied().unwrap_or_default();
        if previous == state {
            return None;
        }
        if state == MonitorRuntimeState::Disconnected {
            self.states.remove(&key);
        } else {
            self.states.insert(key, state);
        }
        Some(RuntimeStateChange { port: port.clone(), previous, current: state })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
