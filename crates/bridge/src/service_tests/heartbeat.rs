// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test(start_paused = true)]
async fn heartbeat_runs_while_attached() {
    let h = harness();
    h.client.get_bridge_info().await.unwrap();
    assert!(h.client.heartbeat_active());

    tokio::time::sleep(Duration::from_millis(11_000)).await;
    assert_eq!(h.control.heartbeats(), 2);
    assert!(h.client.has_token());
}

#[tokio::test(start_paused = true)]
async fn rejected_token_is_dropped_and_reattached() {
    let h = harness();
    h.client.get_bridge_info().await.unwrap();
    h.control.revoke_tokens();

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    assert!(!h.client.has_token());
    assert!(!h.client.heartbeat_active());

    h.client.get_bridge_info().await.unwrap();
    assert!(h.client.has_token());
    assert!(h.client.heartbeat_active());
    assert_eq!(h.control.attach_calls(), 2);
    assert_eq!(h.launcher.launch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn unreachable_bridge_drops_token() {
    let h = harness();
    h.client.get_bridge_info().await.unwrap();
    h.control.fail_heartbeat(Some(HttpError::Timeout(5_000)));

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    assert!(!h.client.has_token());
    assert!(h.client.cached_info().is_some());
}

#[tokio::test(start_paused = true)]
async fn disabled_heartbeat_never_starts() {
    let h = harness_with(|config| BridgeConfig { heartbeat_timeout_ms: 0, ..config }, None);
    h.client.get_bridge_info().await.unwrap();
    assert!(!h.client.heartbeat_active());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.control.heartbeats(), 0);
    assert!(h.client.has_token());
}

#[tokio::test(start_paused = true)]
async fn dispose_stops_heartbeat() {
    let h = harness();
    h.client.get_bridge_info().await.unwrap();
    h.client.dispose().await;

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(h.control.heartbeats(), 0);
}
