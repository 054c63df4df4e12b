// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use std::collections::HashMap;

fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> =
        vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults() {
    let config = BridgeConfig::default();
    assert_eq!(config.preferred_port, DEFAULT_BRIDGE_PORT);
    assert_eq!(config.heartbeat_interval(), Some(Duration::from_secs(5)));
    assert_eq!(config.identity_strictness, IdentityStrictness::Lenient);
    assert_eq!(config.startup_attempts, 60);
    assert!(config.host_identity().version.is_none());
}

#[test]
fn env_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().display().to_string();
    let lookup = lookup_from(&[
        (env::STATE_DIR, &state),
        (env::BRIDGE_PORT, "61000"),
        (env::HEARTBEAT_INTERVAL_MS, "250"),
        (env::LOG_HEARTBEAT, "yes"),
        (env::BRIDGE_ENTRY, "/opt/boardlab/bridge.js"),
        (env::IDENTITY_STRICTNESS, "strict"),
    ]);

    let config = BridgeConfig::load_with(&lookup).unwrap();
    assert_eq!(config.state_dir, dir.path());
    assert_eq!(config.preferred_port, 61000);
    assert_eq!(config.heartbeat_interval(), Some(Duration::from_millis(250)));
    assert!(config.log_heartbeat);
    assert_eq!(config.entry, Some(PathBuf::from("/opt/boardlab/bridge.js")));
    assert_eq!(config.identity_strictness, IdentityStrictness::Strict);
    assert_eq!(config.lease_path(), dir.path().join(LEASE_FILE_NAME));
}

#[test]
fn file_then_env() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "preferred_port = 60001\nprogram = \"bun\"\nstop_grace_ms = 10\n",
    )
    .unwrap();
    let state = dir.path().display().to_string();
    let lookup = lookup_from(&[(env::STATE_DIR, &state), (env::BRIDGE_PORT, "60002")]);

    let config = BridgeConfig::load_with(&lookup).unwrap();
    assert_eq!(config.preferred_port, 60002);
    assert_eq!(config.program, "bun");
    assert_eq!(config.stop_grace(), Duration::from_millis(10));
    assert_eq!(config.retry_backoff_ms, 750);
}

#[test]
fn malformed_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "preferred_port = \"high\"").unwrap();
    let state = dir.path().display().to_string();
    let lookup = lookup_from(&[(env::STATE_DIR, &state)]);

    let err = BridgeConfig::load_with(&lookup).unwrap_err();
    assert!(matches!(err, BridgeError::Config(_)), "{err:?}");
}

#[yare::parameterized(
    zero_port      = { env::BRIDGE_PORT, "0" },
    port_overflow  = { env::BRIDGE_PORT, "70000" },
    not_a_number   = { env::HEARTBEAT_INTERVAL_MS, "soon" },
    bad_flag       = { env::LOG_HEARTBEAT, "maybe" },
    bad_strictness = { env::IDENTITY_STRICTNESS, "paranoid" },
)]
fn invalid_env_is_rejected(key: &str, value: &str) {
    let mut config = BridgeConfig::default();
    let lookup = lookup_from(&[(key, value)]);
    assert!(matches!(config.apply_env(&lookup), Err(BridgeError::Config(_))));
}

#[yare::parameterized(
    interval_zero     = { 0, 20_000 },
    interval_negative = { -1, 20_000 },
    timeout_zero      = { 5_000, 0 },
)]
fn heartbeat_disabled(interval_ms: i64, timeout_ms: i64) {
    let config = BridgeConfig {
        heartbeat_interval_ms: interval_ms,
        heartbeat_timeout_ms: timeout_ms,
        ..BridgeConfig::default()
    };
    assert_eq!(config.heartbeat_interval(), None);
}

#[test]
fn empty_program_is_ignored() {
    let mut config = BridgeConfig::default();
    config.apply_env(&lookup_from(&[(env::BRIDGE_PROGRAM, "")])).unwrap();
    assert_eq!(config.program, "node");
}

#[test]
fn host_identity_from_setters() {
    let config = BridgeConfig::default()
        .version("1.4.0")
        .extension_path("/ext/boardlab-1.4.0")
        .mode("production");
    let identity = config.host_identity();
    assert_eq!(identity.version.as_deref(), Some("1.4.0"));
    assert_eq!(identity.extension_path, Some(PathBuf::from("/ext/boardlab-1.4.0")));
    assert_eq!(identity.mode.as_deref(), Some("production"));
    assert_eq!(identity.commit, None);
}

#[test]
#[serial]
fn load_reads_process_environment() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var(env::STATE_DIR, dir.path());
    std::env::set_var(env::BRIDGE_PORT, "61234");

    let config = BridgeConfig::load();

    std::env::remove_var(env::STATE_DIR);
    std::env::remove_var(env::BRIDGE_PORT);
    let config = config.unwrap();
    assert_eq!(config.preferred_port, 61234);
    assert_eq!(config.state_dir, dir.path());
}

#[test]
fn state_dir_precedence() {
    let explicit = lookup_from(&[(env::STATE_DIR, "/tmp/a"), ("XDG_STATE_HOME", "/tmp/x")]);
    assert_eq!(env::state_dir_from(&explicit).unwrap(), PathBuf::from("/tmp/a"));

    let xdg = lookup_from(&[("XDG_STATE_HOME", "/tmp/x")]);
    assert_eq!(env::state_dir_from(&xdg).unwrap(), PathBuf::from("/tmp/x/boardlab"));
}
