// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connect requests, the selection they resolve to, and the snapshot sent
//! back to a newly connected client.

use boardlab_core::{
    Channel, DetectedPort, MonitorSettings, PhysicalState, PortIdentifier, RunningMonitor,
    SessionSnapshot,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What a client sends when it connects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectRequest {
    /// Port the client last showed, if any.
    pub port: Option<PortIdentifier>,
    pub baudrate: Option<String>,
    /// Channels to receive; empty means [`Channel::Monitor`] only.
    pub channels: BTreeSet<Channel>,
    /// Start the selected port's monitor right away.
    pub auto_start: bool,
}

impl ConnectRequest {
    pub fn new() -> Self {
        Self::default()
    }

    boardlab_core::setters! {
        set {
            auto_start: bool,
        }
        option {
            port: PortIdentifier,
            baudrate: String,
        }
    }

    pub fn channel(mut self, channel: Channel) -> Self {
        self.channels.insert(channel);
        self
    }

    /// Channels with the default applied.
    pub fn effective_channels(&self) -> BTreeSet<Channel> {
        if self.channels.is_empty() {
            BTreeSet::from([Channel::Monitor])
        } else {
            self.channels.clone()
        }
    }
}

/// Port and baud rate a client ends up monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub port: PortIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baudrate: Option<String>,
}

/// Facts a [`SelectionResolver`] may consult.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub request: &'a ConnectRequest,
    pub detected_ports: &'a [DetectedPort],
    pub running_monitors: &'a [RunningMonitor],
}

/// Decides which port (and baud rate) a connecting client monitors.
///
/// A `None` baud rate is filled in by the manager from its cache and then
/// the protocol default.
pub trait SelectionResolver: Send + Sync + 'static {
    fn resolve(&self, context: &SelectionContext<'_>) -> Option<Selection>;
}

/// Uses the requested port; without one, the only detected port if there is
/// exactly one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestedSelection;

impl SelectionResolver for RequestedSelection {
    fn resolve(&self, context: &SelectionContext<'_>) -> Option<Selection> {
        let port = match &context.request.port {
            Some(port) => port.clone(),
            None => match context.detected_ports {
                [only] => only.port.clone(),
                _ => return None,
            },
        };
        Some(Selection { port, baudrate: context.request.baudrate.clone() })
    }
}

/// Reply to a connect handshake: everything a client needs to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectSnapshot {
    pub detected_ports: Vec<DetectedPort>,
    pub settings: Vec<MonitorSettings>,
    pub running_monitors: Vec<RunningMonitor>,
    pub physical_states: Vec<PhysicalState>,
    pub sessions: Vec<SessionSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
}

/// Options for clients registered outside the connect handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalClientOptions {
    pub baudrate: Option<String>,
    /// Start the monitor on registration (default).
    pub auto_start: bool,
}

impl Default for ExternalClientOptions {
    fn default() -> Self {
        Self { baudrate: None, auto_start: true }
    }
}

impl ExternalClientOptions {
    boardlab_core::setters! {
        set {
            auto_start: bool,
        }
        option {
            baudrate: String,
        }
    }
}

#[cfg(test)]
#[path = "selection_tests.rs"]
mod tests;
