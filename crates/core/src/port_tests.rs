// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[test]
fn key_joins_protocol_and_address() {
    let port = PortIdentifier::serial("/dev/ttyACM0");
    assert_eq!(port.key(), "serial:///dev/ttyACM0");
    assert_eq!(port.to_string(), "serial:///dev/ttyACM0");
}

#[test]
fn key_is_case_sensitive() {
    let upper = PortIdentifier::serial("COM3");
    let lower = PortIdentifier::serial("com3");
    assert_ne!(upper.key(), lower.key());
}

#[yare::parameterized(
    serial  = { "serial:///dev/ttyUSB0", "serial", "/dev/ttyUSB0" },
    windows = { "serial://COM7",         "serial", "COM7" },
    network = { "network://192.168.1.4:3232", "network", "192.168.1.4:3232" },
    nested  = { "network://ws://host:80", "network", "ws://host:80" },
)]
fn from_key_splits_at_first_separator(key: &str, protocol: &str, address: &str) {
    let port = PortIdentifier::from_key(key).unwrap();
    assert_eq!(port.protocol, protocol);
    assert_eq!(port.address, address);
}

#[yare::parameterized(
    no_separator   = { "serial/dev/ttyUSB0" },
    empty_protocol = { "://COM3" },
)]
fn from_key_rejects_malformed(key: &str) {
    assert!(PortIdentifier::from_key(key).is_none());
}

#[test]
fn serde_uses_plain_fields() {
    let port = PortIdentifier::serial("COM3");
    let json = serde_json::to_value(&port).unwrap();
    assert_eq!(json, serde_json::json!({ "protocol": "serial", "address": "COM3" }));
}

fn arb_protocol() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9+.-]{0,8}"
}

proptest! {
    #[test]
    fn port_key_is_injective(
        p1 in arb_protocol(), a1 in ".{0,16}",
        p2 in arb_protocol(), a2 in ".{0,16}",
    ) {
        let left = PortIdentifier::new(p1.clone(), a1.clone());
        let right = PortIdentifier::new(p2.clone(), a2.clone());
        prop_assert_eq!(left.key() == right.key(), p1 == p2 && a1 == a2);
    }

    #[test]
    fn port_key_survives_reserialization(protocol in arb_protocol(), address in ".{0,24}") {
        let port = PortIdentifier::new(protocol, address);
        let json = serde_json::to_string(&port).unwrap();
        let back: PortIdentifier = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back.key(), port.key());
        prop_assert_eq!(PortIdentifier::from_key(port.key().as_str()), Some(port));
    }
}
