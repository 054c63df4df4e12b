// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-port session state machine.
//!
//! A `PortSession` tracks what the attached clients want (`desired`) against
//! what the bridge last reported (`status`). It never talks to the bridge:
//! mutations return whether a close has to be dispatched, and
//! [`PortSession::next_action`] hands out at most one open/resume at a time.
//!
//! ```text
//! idle ──next_action──▶ opening ──started──▶ running ◀──resumed── paused
//!   ▲                      │                   │  ──paused/lost──▶   │
//!   └──────stopped─────────┴──── error ◀─open error (generic)        │
//!                                  └── intent start/resume ──▶ idle ◀┘ (detected again)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::id::{AttemptId, ClientId};
use crate::port::{PortIdentifier, PortKey};

/// Whether any attached client wants the monitor running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Desired {
    Running,
    Stopped,
}

crate::simple_display! {
    Desired {
        Running => "running",
        Stopped => "stopped",
    }
}

/// Last known bridge-side state of the monitor for this port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Opening,
    Running,
    Paused,
    Error,
}

crate::simple_display! {
    SessionStatus {
        Idle => "idle",
        Opening => "opening",
        Running => "running",
        Paused => "paused",
        Error => "error",
    }
}

/// Why a session is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PauseReason {
    /// The hardware disappeared (unplugged, port vanished).
    ResourceMissing,
    /// Suspended by a task such as an upload.
    Suspended,
    /// Paused on request of a client.
    User,
}

crate::simple_display! {
    PauseReason {
        ResourceMissing => "resource-missing",
        Suspended => "suspended",
        User => "user",
    }
}

/// Error reported by the bridge while opening or running a monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

const MISSING_PORT_CODES: &[&str] = &["ENOENT", "ENODEV", "port-not-found", "resource-missing"];
const MISSING_PORT_MESSAGES: &[&str] =
    &["no such file", "not found", "cannot find", "no such device", "file not found"];

impl OpenError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { code: None, status: None, message: message.into() }
    }

    crate::setters! {
        option {
            code: String,
            status: u16,
        }
    }

    /// True when the error means the port is gone rather than broken.
    pub fn is_missing_port(&self) -> bool {
        if self.status == Some(404) {
            return true;
        }
        if let Some(code) = &self.code {
            if MISSING_PORT_CODES.iter().any(|c| c.eq_ignore_ascii_case(code)) {
                return true;
            }
        }
        let message = self.message.to_ascii_lowercase();
        MISSING_PORT_MESSAGES.iter().any(|m| message.contains(m))
    }
}

/// Work the manager must dispatch to the bridge on behalf of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    Open { port: PortIdentifier, attempt_id: AttemptId, baudrate: Option<String> },
    Resume { port: PortIdentifier },
}

/// Payload of a bridge "monitor started" callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorStarted {
    pub monitor_session_id: Option<String>,
    pub baudrate: Option<String>,
    pub attempt_id: Option<AttemptId>,
}

/// Immutable view of a session, broadcast to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub port: PortIdentifier,
    pub detected: bool,
    pub desired: Desired,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<PauseReason>,
    pub clients: Vec<ClientId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baudrate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<AttemptId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<OpenError>,
}

#[derive(Debug, Clone)]
pub struct PortSession {
    port: PortIdentifier,
    key: PortKey,
    detected: bool,
    desired: Desired,
    status: SessionStatus,
    pause_reason: Option<PauseReason>,
    clients: BTreeSet<ClientId>,
    intents: BTreeSet<ClientId>,
    baudrate: Option<String>,
    current_attempt_id: Option<AttemptId>,
    /// Open that was in flight when the last intent was withdrawn.
    abandoned_attempt_id: Option<AttemptId>,
    monitor_session_id: Option<String>,
    last_error: Option<OpenError>,
    resume_pending: bool,
}

impl PortSession {
    pub fn new(port: PortIdentifier, detected: bool) -> Self {
        let key = port.key();
        Self {
            port,
            key,
            detected,
            desired: Desired::Stopped,
            status: SessionStatus::Idle,
            pause_reason: None,
            clients: BTreeSet::new(),
            intents: BTreeSet::new(),
            baudrate: None,
            current_attempt_id: None,
            abandoned_attempt_id: None,
            monitor_session_id: None,
            last_error: None,
            resume_pending: false,
        }
    }

    pub fn port(&self) -> &PortIdentifier {
        &self.port
    }

    pub fn key(&self) -> &PortKey {
        &self.key
    }

    pub fn detected(&self) -> bool {
        self.detected
    }

    pub fn desired(&self) -> Desired {
        self.desired
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn pause_reason(&self) -> Option<PauseReason> {
        self.pause_reason
    }

    pub fn baudrate(&self) -> Option<&str> {
        self.baudrate.as_deref()
    }

    pub fn current_attempt_id(&self) -> Option<&AttemptId> {
        self.current_attempt_id.as_ref()
    }

    pub fn abandoned_attempt_id(&self) -> Option<&AttemptId> {
        self.abandoned_attempt_id.as_ref()
    }

    /// Carry over an abandoned open from a pruned session for this port.
    pub fn set_abandoned_attempt(&mut self, attempt: AttemptId) {
        self.abandoned_attempt_id = Some(attempt);
    }

    pub fn last_error(&self) -> Option<&OpenError> {
        self.last_error.as_ref()
    }

    pub fn clients(&self) -> impl Iterator<Item = &ClientId> {
        self.clients.iter()
    }

    pub fn has_client(&self, client: &ClientId) -> bool {
        self.clients.contains(client)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn set_baudrate(&mut self, baudrate: impl Into<String>) {
        self.baudrate = Some(baudrate.into());
    }

    /// Returns true when the client was not attached yet.
    pub fn attach_client(&mut self, client: ClientId) -> bool {
        self.clients.insert(client)
    }

    /// Remove a client along with its intent.
    ///
    /// Returns true when the departure leaves nobody wanting the monitor
    /// while the bridge still has it active, i.e. a close must be dispatched.
    pub fn detach_client(&mut self, client: &ClientId) -> bool {
        self.clients.remove(client);
        if self.intents.remove(client) && self.intents.is_empty() {
            return self.set_stopped();
        }
        false
    }

    pub fn intent_start(&mut self, client: ClientId) {
        self.clients.insert(client.clone());
        self.intents.insert(client);
        self.desired = Desired::Running;
        if self.status == SessionStatus::Error {
            self.status = SessionStatus::Idle;
        }
    }

    /// Withdraw the client's intent.
    ///
    /// Returns true when a close must be dispatched. Other clients that still
    /// want the monitor keep it running.
    pub fn intent_stop(&mut self, client: &ClientId) -> bool {
        self.intents.remove(client);
        if !self.intents.is_empty() {
            return false;
        }
        self.set_stopped()
    }

    pub fn intent_resume(&mut self, client: ClientId) {
        self.clients.insert(client.clone());
        self.intents.insert(client);
        self.desired = Desired::Running;
        match self.status {
            SessionStatus::Paused if self.pause_reason != Some(PauseReason::ResourceMissing) => {
                self.resume_pending = true;
            }
            SessionStatus::Error => self.status = SessionStatus::Idle,
            _ => {}
        }
    }

    /// Record a hardware detection change. Returns false when nothing changed.
    pub fn mark_detected(&mut self, detected: bool) -> bool {
        if self.detected == detected {
            return false;
        }
        self.detected = detected;
        if detected {
            if self.status == SessionStatus::Paused
                && self.pause_reason == Some(PauseReason::ResourceMissing)
            {
                self.status = SessionStatus::Idle;
                self.pause_reason = None;
            }
        } else if self.desired == Desired::Running
            && matches!(self.status, SessionStatus::Opening | SessionStatus::Running)
        {
            self.pause_for_missing_resource();
        }
        true
    }

    /// Record an open/runtime error. Returns false for stale attempts.
    ///
    /// An error for the abandoned attempt only settles it: the stop was
    /// already acknowledged.
    pub fn mark_open_error(&mut self, error: OpenError, attempt: Option<&AttemptId>) -> bool {
        if attempt.is_some() && attempt == self.abandoned_attempt_id.as_ref() {
            self.abandoned_attempt_id = None;
            return false;
        }
        if self.is_stale(attempt) {
            return false;
        }
        if error.is_missing_port() {
            self.detected = false;
            self.pause_for_missing_resource();
        } else {
            self.status = SessionStatus::Error;
            self.pause_reason = None;
            self.current_attempt_id = None;
            self.resume_pending = false;
        }
        self.last_error = Some(error);
        true
    }

    /// Returns false for stale attempts. A start for the abandoned attempt is
    /// accepted: the monitor runs on the bridge whether or not it is wanted.
    pub fn mark_monitor_started(&mut self, started: MonitorStarted) -> bool {
        if self.is_stale(started.attempt_id.as_ref()) {
            return false;
        }
        self.status = SessionStatus::Running;
        self.detected = true;
        self.pause_reason = None;
        self.current_attempt_id = None;
        self.abandoned_attempt_id = None;
        self.last_error = None;
        self.resume_pending = false;
        if let Some(baudrate) = started.baudrate {
            self.baudrate = Some(baudrate);
        }
        if started.monitor_session_id.is_some() {
            self.monitor_session_id = started.monitor_session_id;
        }
        true
    }

    pub fn mark_monitor_stopped(&mut self) {
        self.status = SessionStatus::Idle;
        self.pause_reason = None;
        self.current_attempt_id = None;
        self.abandoned_attempt_id = None;
        self.monitor_session_id = None;
        self.resume_pending = false;
    }

    pub fn mark_paused(&mut self, reason: PauseReason) {
        self.status = SessionStatus::Paused;
        self.pause_reason = Some(reason);
        self.current_attempt_id = None;
    }

    pub fn mark_resumed(&mut self) {
        self.status = SessionStatus::Running;
        self.pause_reason = None;
        self.resume_pending = false;
    }

    /// Take the next pending action, if any.
    ///
    /// An `Open` moves the session to `opening` and mints a fresh attempt id,
    /// so calling again before the bridge answers yields nothing.
    pub fn next_action(&mut self) -> Option<SessionAction> {
        if self.desired != Desired::Running || !self.detected {
            return None;
        }
        match self.status {
            SessionStatus::Idle => {
                let attempt_id = AttemptId::new();
                self.status = SessionStatus::Opening;
                self.current_attempt_id = Some(attempt_id.clone());
                self.last_error = None;
                Some(SessionAction::Open {
                    port: self.port.clone(),
                    attempt_id,
                    baudrate: self.baudrate.clone(),
                })
            }
            SessionStatus::Paused if self.resume_pending => {
                self.resume_pending = false;
                Some(SessionAction::Resume { port: self.port.clone() })
            }
            _ => None,
        }
    }

    /// Clientless, stopped and idle sessions are garbage.
    pub fn is_prunable(&self) -> bool {
        self.clients.is_empty() && self.desired == Desired::Stopped && self.status == SessionStatus::Idle
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            port: self.port.clone(),
            detected: self.detected,
            desired: self.desired,
            status: self.status,
            pause_reason: self.pause_reason,
            clients: self.clients.iter().cloned().collect(),
            baudrate: self.baudrate.clone(),
            attempt_id: self.current_attempt_id.clone(),
            monitor_session_id: self.monitor_session_id.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// Flip to stopped. Returns true when a close must be dispatched.
    fn set_stopped(&mut self) -> bool {
        self.desired = Desired::Stopped;
        self.resume_pending = false;
        match self.status {
            // Nothing runs on the bridge; acknowledging the stop clears the fault.
            SessionStatus::Error => {
                self.status = SessionStatus::Idle;
                false
            }
            // The open may still land; its completion is matched against the
            // abandoned attempt and closed again.
            SessionStatus::Opening => {
                self.status = SessionStatus::Idle;
                self.abandoned_attempt_id = self.current_attempt_id.take();
                true
            }
            SessionStatus::Running | SessionStatus::Paused => true,
            SessionStatus::Idle => false,
        }
    }

    fn pause_for_missing_resource(&mut self) {
        self.status = SessionStatus::Paused;
        self.pause_reason = Some(PauseReason::ResourceMissing);
        self.current_attempt_id = None;
        self.resume_pending = false;
    }

    fn is_stale(&self, attempt: Option<&AttemptId>) -> bool {
        match attempt {
            Some(attempt) => {
                self.current_attempt_id.as_ref() != Some(attempt)
                    && self.abandoned_attempt_id.as_ref() != Some(attempt)
            }
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
