// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn detected(address: &str) -> DetectedPort {
    DetectedPort { port: PortIdentifier::serial(address), boards: Vec::new() }
}

fn resolve(request: &ConnectRequest, ports: &[DetectedPort]) -> Option<Selection> {
    let context =
        SelectionContext { request, detected_ports: ports, running_monitors: &[] };
    RequestedSelection.resolve(&context)
}

#[test]
fn requested_port_wins() {
    let request = ConnectRequest::new().port(PortIdentifier::serial("COM4")).baudrate("115200");
    let selection = resolve(&request, &[detected("COM3")]).unwrap();
    assert_eq!(selection.port, PortIdentifier::serial("COM4"));
    assert_eq!(selection.baudrate.as_deref(), Some("115200"));
}

#[test]
fn single_detected_port_is_selected() {
    let selection = resolve(&ConnectRequest::new(), &[detected("/dev/ttyACM0")]).unwrap();
    assert_eq!(selection.port, PortIdentifier::serial("/dev/ttyACM0"));
    assert_eq!(selection.baudrate, None);
}

#[test]
fn ambiguous_or_empty_selects_nothing() {
    assert_eq!(resolve(&ConnectRequest::new(), &[]), None);
    assert_eq!(resolve(&ConnectRequest::new(), &[detected("a"), detected("b")]), None);
}

#[test]
fn channels_default_to_monitor() {
    assert_eq!(ConnectRequest::new().effective_channels(), BTreeSet::from([Channel::Monitor]));
    let traced = ConnectRequest::new().channel(Channel::Trace);
    assert_eq!(traced.effective_channels(), BTreeSet::from([Channel::Trace]));
}

#[test]
fn request_deserializes_with_defaults() {
    let request: ConnectRequest = serde_json::from_str(
        r#"{"port":{"protocol":"serial","address":"COM3"},"channels":["monitor","trace"]}"#,
    )
    .unwrap();
    assert_eq!(request.port, Some(PortIdentifier::serial("COM3")));
    assert!(!request.auto_start);
    assert_eq!(request.channels.len(), 2);
}

#[test]
fn external_options_auto_start_by_default() {
    assert!(ExternalClientOptions::default().auto_start);
    let options = ExternalClientOptions::default().auto_start(false).baudrate("57600");
    assert!(!options.auto_start);
    assert_eq!(options.baudrate.as_deref(), Some("57600"));
}
