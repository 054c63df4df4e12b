// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    bare_address = { "COM3", "serial", "COM3" },
    unix_device  = { "/dev/ttyACM0", "serial", "/dev/ttyACM0" },
    full_key     = { "serial:///dev/ttyUSB0", "serial", "/dev/ttyUSB0" },
    network      = { "network://192.168.1.20", "network", "192.168.1.20" },
    padded       = { "  COM4 ", "serial", "COM4" },
)]
fn port_argument(value: &str, protocol: &str, address: &str) {
    assert_eq!(parse_port(value).unwrap(), PortIdentifier::new(protocol, address));
}

#[yare::parameterized(
    empty         = { "" },
    blank         = { "   " },
    no_protocol   = { "://COM3" },
)]
fn bad_port_argument(value: &str) {
    assert!(parse_port(value).is_err());
}

fn args(port: Option<&str>) -> MonitorArgs {
    MonitorArgs {
        port: port.map(|p| parse_port(p).unwrap()),
        baud: None,
        no_start: false,
        trace: false,
    }
}

#[test]
fn request_starts_by_default() {
    let request = args(Some("COM3")).connect_request();
    assert!(request.auto_start);
    assert_eq!(request.port, Some(PortIdentifier::serial("COM3")));
    assert_eq!(request.effective_channels(), std::collections::BTreeSet::from([Channel::Monitor]));
}

#[test]
fn request_carries_flags() {
    let mut args = args(None);
    args.baud = Some("115200".to_string());
    args.no_start = true;
    args.trace = true;
    let request = args.connect_request();
    assert!(!request.auto_start);
    assert!(request.port.is_none());
    assert_eq!(request.baudrate.as_deref(), Some("115200"));
    assert!(request.channels.contains(&Channel::Trace));
}
