// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn spec() -> LaunchSpec {
    LaunchSpec::from_config(&BridgeConfig::default())
}

#[test]
fn minimal_args() {
    assert_eq!(
        spec().args(),
        vec!["--cli-path", "arduino-cli", "--port", "55888", "--heartbeat-timeout-ms", "20000"]
    );
}

#[test]
fn full_args_follow_entry() {
    let config = BridgeConfig {
        entry: Some(PathBuf::from("/ext/boardlab-1.0.0/dist/bridge.js")),
        log_heartbeat: true,
        ..BridgeConfig::default()
    }
    .version("1.0.0")
    .extension_path("/ext/boardlab-1.0.0")
    .mode("development")
    .commit("abc123");

    assert_eq!(
        LaunchSpec::from_config(&config).args(),
        vec![
            "/ext/boardlab-1.0.0/dist/bridge.js",
            "--cli-path",
            "arduino-cli",
            "--port",
            "55888",
            "--heartbeat-timeout-ms",
            "20000",
            "--boardlab-version",
            "1.0.0",
            "--extension-path",
            "/ext/boardlab-1.0.0",
            "--bridge-mode",
            "development",
            "--boardlab-commit",
            "abc123",
            "--log-heartbeat",
        ]
    );
}

#[yare::parameterized(
    node_error = { "Error: listen EADDRINUSE: address already in use 127.0.0.1:55888", true },
    lowercase  = { "bind failed: address already in use", true },
    plain_code = { "code: 'EADDRINUSE'", true },
    unrelated  = { "bridge listening on 127.0.0.1:55888", false },
)]
fn address_in_use_signature(line: &str, expected: bool) {
    assert_eq!(is_address_in_use(line), expected);
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    let spec = LaunchSpec { program: "/nonexistent/boardlab-bridge".to_string(), ..spec() };
    let err = ProcessLauncher.launch(&spec).await.unwrap_err();
    assert!(matches!(err, BridgeError::Spawn(_)), "{err:?}");
}

#[cfg(unix)]
async fn next_event(handle: &mut LaunchHandle) -> LaunchEvent {
    for _ in 0..200 {
        if let Some(event) = handle.try_event() {
            return event;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no launch event");
}

#[cfg(unix)]
#[tokio::test]
async fn output_is_reported_before_exit() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("bridge.sh");
    std::fs::write(&script, "echo 'Error: listen EADDRINUSE' >&2\nexit 3\n").unwrap();
    let spec = LaunchSpec { program: "sh".to_string(), entry: Some(script), ..spec() };

    let mut handle = ProcessLauncher.launch(&spec).await.unwrap();
    assert!(handle.pid.is_some());
    assert!(matches!(next_event(&mut handle).await, LaunchEvent::AddressInUse(_)));
    assert_eq!(next_event(&mut handle).await, LaunchEvent::Exited { code: Some(3) });
}

#[cfg(unix)]
#[tokio::test]
async fn clean_exit_reports_code_zero() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("bridge.sh");
    std::fs::write(&script, "echo 'another bridge is already serving'\nexit 0\n").unwrap();
    let spec = LaunchSpec { program: "sh".to_string(), entry: Some(script), ..spec() };

    let mut handle = ProcessLauncher.launch(&spec).await.unwrap();
    assert_eq!(next_event(&mut handle).await, LaunchEvent::Exited { code: Some(0) });
}
