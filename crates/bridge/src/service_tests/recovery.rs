// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test(start_paused = true)]
async fn nonzero_exit_fails_without_retry() {
    let h = harness();
    h.launcher.push(FakeLaunch::Exit(Some(1)));

    let err = h.client.get_bridge_info().await.unwrap_err();
    assert!(matches!(err, BridgeError::StartupFailed(_)), "{err:?}");
    assert_eq!(h.launcher.launch_count(), 1);
    assert!(h.client.cached_info().is_none());
}

#[tokio::test(start_paused = true)]
async fn clean_exit_before_startup_is_retried_once() {
    let h = harness();
    h.launcher.push(FakeLaunch::Exit(Some(0)));

    let info = h.client.get_bridge_info().await.unwrap();
    assert_eq!(h.launcher.launch_count(), 2);
    assert_eq!(h.owner_pid(), Some(info.owner_pid));
}

#[tokio::test(start_paused = true)]
async fn repeated_clean_exit_times_out() {
    let h = harness();
    h.launcher.push(FakeLaunch::Exit(Some(0)));
    h.launcher.push(FakeLaunch::Exit(None));

    let err = h.client.get_bridge_info().await.unwrap_err();
    assert!(
        matches!(err, BridgeError::StartupTimeout { exited_before_startup: true, .. }),
        "{err:?}"
    );
    assert_eq!(h.launcher.launch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn silent_bridge_times_out() {
    let h = harness_with(|config| BridgeConfig { startup_attempts: 5, ..config }, None);
    h.launcher.push(FakeLaunch::Silent);

    let err = h.client.get_bridge_info().await.unwrap_err();
    match err {
        BridgeError::StartupTimeout { port, attempts, exited_before_startup } => {
            assert_eq!(port, PORT);
            assert_eq!(attempts, 5);
            assert!(!exited_before_startup);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(h.launcher.launch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn address_in_use_terminates_stale_bridge_and_relaunches() {
    let h = harness();
    h.platform.add_process(
        77,
        "node /ext/boardlab-1.0.0/dist/bridge.js --port 55888 --boardlab-version 1.0.0 --extension-path /ext/boardlab-1.0.0",
    );
    h.platform.set_port_owner(PORT, 77);
    h.launcher.push(FakeLaunch::AddressInUse);

    let info = h.client.get_bridge_info().await.unwrap();
    assert_eq!(h.platform.terminations(), vec![(77, TerminateMode::Graceful)]);
    assert!(!h.platform.alive(77));
    assert_eq!(h.launcher.launch_count(), 2);
    assert_eq!(h.owner_pid(), Some(info.owner_pid));
}

#[tokio::test(start_paused = true)]
async fn stale_bridge_surviving_termination_is_not_relaunched_over() {
    let h = harness();
    h.platform.add_process(
        77,
        "node /ext/boardlab-1.0.0/dist/bridge.js --port 55888 --boardlab-version 1.0.0 --extension-path /ext/boardlab-1.0.0",
    );
    h.platform.make_unkillable(77);
    h.platform.set_port_owner(PORT, 77);
    h.launcher.push(FakeLaunch::AddressInUse);

    let err = h.client.get_bridge_info().await.unwrap_err();
    assert!(matches!(err, BridgeError::AddressInUse(PORT)), "{err:?}");
    assert_eq!(
        h.platform.terminations(),
        vec![(77, TerminateMode::Graceful), (77, TerminateMode::Force)]
    );
    assert!(h.platform.alive(77));
    assert_eq!(h.launcher.launch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn address_in_use_leaves_foreign_process_alone() {
    let h = harness();
    h.platform.add_process(77, "python3 -m http.server 55888");
    h.platform.set_port_owner(PORT, 77);
    h.launcher.push(FakeLaunch::AddressInUse);
    h.launcher.push(FakeLaunch::AddressInUse);

    let err = h.client.get_bridge_info().await.unwrap_err();
    assert!(matches!(err, BridgeError::AddressInUse(PORT)), "{err:?}");
    assert!(h.platform.terminations().is_empty());
    assert!(h.platform.alive(77));
    assert_eq!(h.launcher.launch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn address_in_use_without_port_lookup() {
    let h = harness();
    h.platform.set_lookup_unsupported(true);
    h.launcher.push(FakeLaunch::AddressInUse);
    h.launcher.push(FakeLaunch::AddressInUse);

    let err = h.client.get_bridge_info().await.unwrap_err();
    assert!(matches!(err, BridgeError::AddressInUse(PORT)), "{err:?}");
    assert_eq!(h.launcher.launch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_resolution_can_be_retried() {
    let h = harness();
    h.launcher.push(FakeLaunch::Exit(Some(2)));
    assert!(h.client.get_bridge_info().await.is_err());

    let info = h.client.get_bridge_info().await.unwrap();
    assert_eq!(h.launcher.launch_count(), 2);
    assert_eq!(h.client.resolution_count(), 1);
    assert_eq!(h.owner_pid(), Some(info.owner_pid));
}
