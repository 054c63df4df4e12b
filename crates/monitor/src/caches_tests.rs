// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn running(address: &str, baudrate: Option<&str>) -> RunningMonitor {
    RunningMonitor {
        port: PortIdentifier::serial(address),
        baudrate: baudrate.map(str::to_string),
        monitor_session_id: None,
    }
}

#[test]
fn upsert_reports_changes_only() {
    let mut monitors = RunningMonitors::new();
    assert!(monitors.upsert(running("COM3", Some("9600"))));
    assert!(!monitors.upsert(running("COM3", Some("9600"))));
    assert!(monitors.upsert(running("COM3", Some("115200"))));
    assert_eq!(monitors.len(), 1);
}

#[test]
fn remove_and_contains() {
    let mut monitors = RunningMonitors::new();
    let port = PortIdentifier::serial("COM3");
    monitors.upsert(running("COM3", None));
    assert!(monitors.contains(&port));
    assert!(monitors.remove(&port));
    assert!(!monitors.remove(&port));
    assert!(monitors.is_empty());
}

#[test]
fn replace_all_detects_equal_lists() {
    let mut monitors = RunningMonitors::new();
    assert!(monitors.replace_all(vec![running("a", None), running("b", Some("9600"))]));
    assert!(!monitors.replace_all(vec![running("b", Some("9600")), running("a", None)]));
    assert!(monitors.replace_all(Vec::new()));
    assert!(monitors.is_empty());
}

#[test]
fn set_baudrate_touches_running_ports_only() {
    let mut monitors = RunningMonitors::new();
    monitors.upsert(running("COM3", Some("9600")));
    assert!(monitors.set_baudrate(&PortIdentifier::serial("COM3"), "115200"));
    assert!(!monitors.set_baudrate(&PortIdentifier::serial("COM3"), "115200"));
    assert!(!monitors.set_baudrate(&PortIdentifier::serial("COM9"), "115200"));
    let baud = monitors.get(&PortIdentifier::serial("COM3")).and_then(|m| m.baudrate.clone());
    assert_eq!(baud.as_deref(), Some("115200"));
}

#[test]
fn baudrate_cache_ignores_empty_and_repeats() {
    let mut cache = BaudrateCache::new();
    let port = PortIdentifier::serial("COM3");
    assert_eq!(cache.get(&port), None);
    assert!(!cache.set(&port, ""));
    assert!(cache.set(&port, "57600"));
    assert!(!cache.set(&port, "57600"));
    assert_eq!(cache.get(&port), Some("57600"));
}

proptest::proptest! {
    #[test]
    fn baudrate_cache_keeps_last_non_empty(rates in proptest::collection::vec("[0-9]{0,6}", 1..12)) {
        let mut cache = BaudrateCache::new();
        let port = PortIdentifier::serial("COM3");
        for rate in &rates {
            cache.set(&port, rate.as_str());
        }
        let expected = rates.iter().rev().find(|r| !r.is_empty()).map(String::as_str);
        proptest::prop_assert_eq!(cache.get(&port), expected);
    }
}
