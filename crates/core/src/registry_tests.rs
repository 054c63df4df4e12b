// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn port(address: &str) -> PortIdentifier {
    PortIdentifier::serial(address)
}

#[test]
fn unknown_ports_count_as_detected_until_first_report() {
    let mut registry = PhysicalStateRegistry::new();
    assert!(registry.is_detected(&port("COM3")));

    registry.apply_detected_ports(&[port("COM4")], 10);
    assert!(registry.has_report());
    assert!(!registry.is_detected(&port("COM3")));
    assert!(registry.is_detected(&port("COM4")));
}

#[test]
fn full_list_reports_only_changes() {
    let mut registry = PhysicalStateRegistry::new();
    let first = registry.apply_detected_ports(&[port("COM3"), port("COM4")], 10);
    assert_eq!(first.len(), 2);

    let second = registry.apply_detected_ports(&[port("COM3"), port("COM4")], 20);
    assert!(second.is_empty());

    let third = registry.apply_detected_ports(&[port("COM4")], 30);
    assert_eq!(
        third,
        vec![DetectionTransition { port: port("COM3"), detected: false, at_ms: 30 }]
    );
}

#[test]
fn transitions_are_counted_per_port() {
    let mut registry = PhysicalStateRegistry::new();
    registry.record(&port("COM3"), true, 1);
    registry.record(&port("COM3"), false, 2);
    registry.record(&port("COM3"), false, 3);
    registry.record(&port("COM3"), true, 4);

    let states = registry.snapshot();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].transitions, 3);
    assert_eq!(states[0].changed_at_ms, 4);
    assert_eq!(registry.detected_ports(), vec![port("COM3")]);
}

#[test]
fn runtime_state_defaults_to_disconnected() {
    let registry = RuntimeStateRegistry::new();
    assert_eq!(registry.get(&port("COM3")), MonitorRuntimeState::Disconnected);
}

#[test]
fn runtime_state_reports_changes_once() {
    let mut registry = RuntimeStateRegistry::new();
    let change = registry.set(&port("COM3"), MonitorRuntimeState::Connected).unwrap();
    assert_eq!(change.previous, MonitorRuntimeState::Disconnected);
    assert!(registry.set(&port("COM3"), MonitorRuntimeState::Connected).is_none());

    let change = registry.set(&port("COM3"), MonitorRuntimeState::Running).unwrap();
    assert_eq!(change.previous, MonitorRuntimeState::Connected);
    assert_eq!(change.current, MonitorRuntimeState::Running);
}

#[test]
fn disconnected_entries_are_dropped() {
    let mut registry = RuntimeStateRegistry::new();
    registry.set(&port("COM3"), MonitorRuntimeState::Suspended);
    assert_eq!(registry.len(), 1);
    registry.set(&port("COM3"), MonitorRuntimeState::Disconnected);
    assert!(registry.is_empty());
}
