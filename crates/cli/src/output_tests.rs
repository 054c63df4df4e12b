// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use boardlab_core::{
    Desired, MonitorRuntimeState, OpenError, PauseReason, PortIdentifier, RuntimeStateChange,
    SessionStatus,
};

fn session(status: SessionStatus) -> SessionSnapshot {
    SessionSnapshot {
        port: PortIdentifier::serial("COM3"),
        detected: true,
        desired: Desired::Running,
        status,
        pause_reason: None,
        clients: Vec::new(),
        baudrate: Some("115200".to_string()),
        attempt_id: None,
        monitor_session_id: None,
        last_error: None,
    }
}

#[test]
fn bridge_info_lists_known_fields() {
    let info = ServiceReadyInfo::local(4242, 55888).version("1.2.0").mode("production");
    let text = format_bridge_info(&info);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "bridge pid 4242 on 127.0.0.1:55888");
    assert!(lines.contains(&"  version: 1.2.0"));
    assert!(lines.contains(&"  mode: production"));
    assert!(lines.contains(&"  events: ws://127.0.0.1:55888/events"));
    assert!(!text.contains("commit"));
}

#[test]
fn running_session_line() {
    let line = format_notification(&ClientNotification::SessionState(session(SessionStatus::Running)));
    assert_eq!(line.as_deref(), Some("serial://COM3 running (wants running) @ 115200"));
}

#[test]
fn lost_session_line_shows_reason_and_error() {
    let mut snapshot = session(SessionStatus::Paused);
    snapshot.detected = false;
    snapshot.pause_reason = Some(PauseReason::ResourceMissing);
    snapshot.last_error = Some(OpenError::new("no such file"));
    let line = format_notification(&ClientNotification::SessionState(snapshot)).unwrap();
    assert!(line.contains("paused: resource-missing"), "{line}");
    assert!(line.contains("[not detected]"), "{line}");
    assert!(line.ends_with("error: no such file"), "{line}");
}

#[yare::parameterized(
    started = {
        BridgeEvent::MonitorStarted {
            port: PortIdentifier::serial("COM3"),
            monitor_session_id: None,
            baudrate: Some("9600".to_string()),
            attempt_id: None,
        },
        "serial://COM3 started @ 9600"
    },
    stopped = { BridgeEvent::MonitorStopped { port: PortIdentifier::serial("COM3") }, "serial://COM3 stopped" },
    paused  = {
        BridgeEvent::MonitorPaused { port: PortIdentifier::serial("COM3"), reason: Some(PauseReason::Suspended) },
        "serial://COM3 paused (suspended)"
    },
    no_ports = { BridgeEvent::DetectedPortsChanged { ports: Vec::new() }, "detected ports: none" },
)]
fn bridge_event_lines(event: BridgeEvent, expected: &str) {
    assert_eq!(format_notification(&ClientNotification::Bridge(event)).as_deref(), Some(expected));
}

#[test]
fn runtime_and_error_lines() {
    let change = RuntimeStateChange {
        port: PortIdentifier::serial("COM3"),
        previous: MonitorRuntimeState::Connected,
        current: MonitorRuntimeState::Running,
    };
    assert_eq!(
        format_notification(&ClientNotification::RuntimeState(change)).as_deref(),
        Some("serial://COM3 connected -> running")
    );
    let error = ClientNotification::Error { port: None, message: "bridge gone".to_string() };
    assert_eq!(format_notification(&error).as_deref(), Some("error: bridge gone"));
}

#[test]
fn list_notifications_are_skipped() {
    assert!(format_notification(&ClientNotification::RunningMonitors(Vec::new())).is_none());
    assert!(format_notification(&ClientNotification::PhysicalState(Vec::new())).is_none());
}
