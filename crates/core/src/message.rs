// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages exchanged with the bridge and fanned out to monitor clients.
//!
//! [`BridgeEvent`] is what the bridge pushes over its WebSocket;
//! [`ClientNotification`] is what the manager delivers to participants.
//! Bridge events are forwarded verbatim inside [`ClientNotification::Bridge`].

use serde::{Deserialize, Serialize};

use crate::id::{AttemptId, ClientId};
use crate::port::PortIdentifier;
use crate::registry::{PhysicalState, RuntimeStateChange};
use crate::session::{OpenError, PauseReason, SessionSnapshot};

/// Board recognized on a detected port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqbn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedPort {
    pub port: PortIdentifier,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boards: Vec<BoardRef>,
}

/// Monitor settings the bridge reports for one protocol (baud rates, line
/// endings). Values are opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSettings {
    pub protocol: String,
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// A monitor the bridge currently runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningMonitor {
    pub port: PortIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baudrate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_session_id: Option<String>,
}

/// Lifecycle events pushed by the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BridgeEvent {
    DetectedPortsChanged {
        ports: Vec<DetectedPort>,
    },
    MonitorSettingsChanged {
        settings: MonitorSettings,
    },
    BaudrateChanged {
        port: PortIdentifier,
        baudrate: String,
    },
    MonitorPaused {
        port: PortIdentifier,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<PauseReason>,
    },
    MonitorResumed {
        port: PortIdentifier,
    },
    MonitorStarted {
        port: PortIdentifier,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        monitor_session_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        baudrate: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attempt_id: Option<AttemptId>,
    },
    MonitorStopped {
        port: PortIdentifier,
    },
    MonitorError {
        port: PortIdentifier,
        error: OpenError,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attempt_id: Option<AttemptId>,
    },
}

impl BridgeEvent {
    /// Port the event concerns, if it is port-scoped.
    pub fn port(&self) -> Option<&PortIdentifier> {
        match self {
            BridgeEvent::DetectedPortsChanged { .. } | BridgeEvent::MonitorSettingsChanged { .. } => {
                None
            }
            BridgeEvent::BaudrateChanged { port, .. }
            | BridgeEvent::MonitorPaused { port, .. }
            | BridgeEvent::MonitorResumed { port }
            | BridgeEvent::MonitorStarted { port, .. }
            | BridgeEvent::MonitorStopped { port }
            | BridgeEvent::MonitorError { port, .. } => Some(port),
        }
    }

    /// Short name for logs and traces.
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::DetectedPortsChanged { .. } => "detected-ports-changed",
            BridgeEvent::MonitorSettingsChanged { .. } => "monitor-settings-changed",
            BridgeEvent::BaudrateChanged { .. } => "baudrate-changed",
            BridgeEvent::MonitorPaused { .. } => "monitor-paused",
            BridgeEvent::MonitorResumed { .. } => "monitor-resumed",
            BridgeEvent::MonitorStarted { .. } => "monitor-started",
            BridgeEvent::MonitorStopped { .. } => "monitor-stopped",
            BridgeEvent::MonitorError { .. } => "monitor-error",
        }
    }
}

/// What a client asks of a port's monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Start,
    Stop,
    Resume,
}

crate::simple_display! {
    Intent {
        Start => "start",
        Stop => "stop",
        Resume => "resume",
    }
}

/// Notification channels a client can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Bridge events, session and physical state.
    Monitor,
    /// Session-level trace events.
    Trace,
}

/// Record of one session mutation, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEvent {
    pub at_ms: u64,
    pub kind: String,
    pub port: PortIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    pub session: SessionSnapshot,
}

/// Everything the manager delivers to participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientNotification {
    Bridge(BridgeEvent),
    SessionState(SessionSnapshot),
    PhysicalState(Vec<PhysicalState>),
    RunningMonitors(Vec<RunningMonitor>),
    RuntimeState(RuntimeStateChange),
    Trace(TraceEvent),
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        port: Option<PortIdentifier>,
        message: String,
    },
}

impl ClientNotification {
    /// Channel a client must be subscribed to in order to receive this.
    pub fn channel(&self) -> Channel {
        match self {
            ClientNotification::Trace(_) => Channel::Trace,
            _ => Channel::Monitor,
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
