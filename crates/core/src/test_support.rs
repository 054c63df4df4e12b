// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::id::AttemptId;
use crate::message::{BridgeEvent, DetectedPort};
use crate::port::PortIdentifier;
use crate::session::OpenError;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core value types.
pub mod strategies {
    use crate::port::PortIdentifier;
    use crate::session::PauseReason;
    use proptest::prelude::*;

    pub fn arb_protocol() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9+.-]{0,8}"
    }

    pub fn arb_port_identifier() -> impl Strategy<Value = PortIdentifier> {
        (arb_protocol(), any::<String>())
            .prop_map(|(protocol, address)| PortIdentifier::new(protocol, address))
    }

    pub fn arb_pause_reason() -> impl Strategy<Value = PauseReason> {
        prop_oneof![
            Just(PauseReason::ResourceMissing),
            Just(PauseReason::Suspended),
            Just(PauseReason::User),
        ]
    }
}

// ── Bridge event factory functions ──────────────────────────────────────

pub fn detected_ports_event(ports: &[PortIdentifier]) -> BridgeEvent {
    BridgeEvent::DetectedPortsChanged {
        ports: ports
            .iter()
            .map(|port| DetectedPort { port: port.clone(), boards: Vec::new() })
            .collect(),
    }
}

pub fn monitor_started_event(
    port: &PortIdentifier,
    baudrate: Option<&str>,
    attempt_id: Option<&AttemptId>,
) -> BridgeEvent {
    BridgeEvent::MonitorStarted {
        port: port.clone(),
        monitor_session_id: Some(format!("mon-{}", port.address)),
        baudrate: baudrate.map(str::to_string),
        attempt_id: attempt_id.cloned(),
    }
}

pub fn monitor_stopped_event(port: &PortIdentifier) -> BridgeEvent {
    BridgeEvent::MonitorStopped { port: port.clone() }
}

pub fn monitor_error_event(
    port: &PortIdentifier,
    error: OpenError,
    attempt_id: Option<&AttemptId>,
) -> BridgeEvent {
    BridgeEvent::MonitorError { port: port.clone(), error, attempt_id: attempt_id.cloned() }
}
