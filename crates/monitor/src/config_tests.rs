// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn serial_defaults_to_9600() {
    let config = ManagerConfig::default();
    assert_eq!(config.default_baudrate("serial"), Some("9600"));
    assert_eq!(config.default_baudrate("network"), None);
    assert_eq!(config.resume_attempts, 5);
    assert_eq!(config.resume_delay(), Duration::from_millis(500));
}

#[test]
fn partial_config_keeps_defaults() {
    let config: ManagerConfig = serde_json::from_str(r#"{"resume_attempts": 2}"#).unwrap();
    assert_eq!(config.resume_attempts, 2);
    assert_eq!(config.default_baudrate("serial"), Some("9600"));
}

#[test]
fn setters_chain() {
    let config = ManagerConfig::default().resume_attempts(1).resume_delay_ms(10);
    assert_eq!(config.resume_attempts, 1);
    assert_eq!(config.resume_delay(), Duration::from_millis(10));
}
