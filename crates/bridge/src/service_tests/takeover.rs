// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;

const OLD_VERSION: &str = "1.0.0";
const OLD_PATH: &str = "/ext/boardlab-1.0.0";

#[tokio::test(start_paused = true)]
async fn incompatible_bridge_is_taken_over_once() {
    let h = harness();
    h.run_bridge(500, OLD_VERSION, OLD_PATH);

    let info = h.client.get_bridge_info().await.unwrap();
    assert_ne!(info.owner_pid, 500);
    assert_eq!(info.version.as_deref(), Some(HOST_VERSION));
    assert_eq!(h.platform.terminations(), vec![(500, TerminateMode::Graceful)]);
    assert_eq!(h.launcher.launch_count(), 1);

    let lease = h.lease().unwrap();
    assert_eq!(lease.owner_pid, info.owner_pid);
    assert!(lease.takeover);
}

#[tokio::test(start_paused = true)]
async fn stubborn_bridge_is_force_killed() {
    let h = harness();
    h.run_bridge(500, OLD_VERSION, OLD_PATH);
    h.platform.ignore_graceful(500);

    h.client.get_bridge_info().await.unwrap();
    assert_eq!(
        h.platform.terminations(),
        vec![(500, TerminateMode::Graceful), (500, TerminateMode::Force)]
    );
}

#[tokio::test(start_paused = true)]
async fn fresh_foreign_owner_is_left_alone() {
    let h = harness();
    h.run_bridge(500, OLD_VERSION, OLD_PATH);
    let writer = identity(OLD_VERSION, OLD_PATH);
    h.write_lease(&OwnershipLease::new(500, &writer, h.clock.epoch_ms() - 2_000, true));

    let info = h.client.get_bridge_info().await.unwrap();
    assert_eq!(info.owner_pid, 500);
    assert!(h.platform.terminations().is_empty());
    assert_eq!(h.launcher.launch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn cooldown_prevents_takeover_ping_pong() {
    let h = harness();
    h.run_bridge(500, OLD_VERSION, OLD_PATH);
    let ours = h.client.get_bridge_info().await.unwrap();

    // The old host took the port back.
    h.control.remove_pid(ours.owner_pid);
    h.run_bridge(600, OLD_VERSION, OLD_PATH);
    let adopted = h.client.get_bridge_info().await.unwrap();
    assert_eq!(adopted.owner_pid, 600);
    assert_eq!(h.platform.terminations().len(), 1);

    // Once the cooldown expires the next incompatible owner is replaced.
    h.clock.advance(Duration::from_secs(31));
    h.run_bridge(700, OLD_VERSION, OLD_PATH);
    let replaced = h.client.get_bridge_info().await.unwrap();
    assert_ne!(replaced.owner_pid, 700);
    assert_eq!(
        h.platform.terminations(),
        vec![(500, TerminateMode::Graceful), (700, TerminateMode::Graceful)]
    );
    assert_eq!(h.launcher.launch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn startup_cooldown_retries_then_takes_over() {
    let h = harness();
    h.run_bridge(500, OLD_VERSION, OLD_PATH);
    h.launcher.push(FakeLaunch::Exit(Some(1)));
    assert!(h.client.get_bridge_info().await.is_err());

    // Still starting up: the cooldown yields a re-probe instead of a skip.
    h.run_bridge(600, OLD_VERSION, OLD_PATH);
    let info = h.client.get_bridge_info().await.unwrap();
    assert_ne!(info.owner_pid, 600);
    assert_eq!(
        h.platform.terminations(),
        vec![(500, TerminateMode::Graceful), (600, TerminateMode::Graceful)]
    );
    assert_eq!(h.launcher.launch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn stale_host_defers_to_installed_bridge() {
    let newer = identity("3.0.0", "/ext/boardlab-3.0.0");
    let h = harness_with(|config| config, Some(newer));
    let notices = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&notices);
    let _subscription =
        h.client.subscribe_stale_host(move |notice| sink.lock().push(notice.clone()));

    h.run_bridge(800, "3.0.0", "/ext/boardlab-3.0.0");
    let info = h.client.get_bridge_info().await.unwrap();
    assert_eq!(info.owner_pid, 800);
    // Still starting up: nothing to reload yet.
    assert!(notices.lock().is_empty());

    h.run_bridge(801, "3.0.0", "/ext/boardlab-3.0.0");
    assert_eq!(h.client.get_bridge_info().await.unwrap().owner_pid, 801);
    h.run_bridge(802, "3.0.0", "/ext/boardlab-3.0.0");
    assert_eq!(h.client.get_bridge_info().await.unwrap().owner_pid, 802);

    let notices = notices.lock();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].message.contains("3.0.0"));
    assert_eq!(notices[0].installed.version.as_deref(), Some("3.0.0"));
    assert!(h.platform.terminations().is_empty());
    assert_eq!(h.launcher.launch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn stale_host_never_kills_while_waiting() {
    let newer = identity("3.0.0", "/ext/boardlab-3.0.0");
    let h = harness_with(|config| BridgeConfig { stale_host_wait_attempts: 4, ..config }, Some(newer));
    h.run_bridge(500, OLD_VERSION, OLD_PATH);

    let info = h.client.get_bridge_info().await.unwrap();
    assert_eq!(info.owner_pid, 500);
    assert!(h.platform.terminations().is_empty());
    assert_eq!(h.launcher.launch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn up_to_date_host_ignores_installed_check() {
    let same = identity(HOST_VERSION, HOST_PATH);
    let h = harness_with(|config| config, Some(same));
    h.run_bridge(500, OLD_VERSION, OLD_PATH);

    h.client.get_bridge_info().await.unwrap();
    assert_eq!(h.platform.terminations(), vec![(500, TerminateMode::Graceful)]);
}
