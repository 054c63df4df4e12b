// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test(start_paused = true)]
async fn concurrent_callers_share_one_launch() {
    let h = harness();
    let calls: Vec<_> = (0..8)
        .map(|_| {
            let client = h.client.clone();
            tokio::spawn(async move { client.get_bridge_info().await })
        })
        .collect();

    let mut pids = Vec::new();
    for call in calls {
        pids.push(call.await.unwrap().unwrap().owner_pid);
    }
    pids.dedup();
    assert_eq!(pids.len(), 1);
    assert_eq!(h.launcher.launch_count(), 1);
    assert_eq!(h.client.resolution_count(), 1);
    assert_eq!(h.control.attach_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn launched_bridge_carries_host_identity() {
    let h = harness();
    let info = h.client.get_bridge_info().await.unwrap();

    let spec = &h.launcher.launches()[0];
    assert_eq!(spec.port, PORT);
    assert_eq!(spec.version.as_deref(), Some(HOST_VERSION));
    assert_eq!(info.version.as_deref(), Some(HOST_VERSION));
    assert!(h.client.has_token());

    let lease = h.lease().unwrap();
    assert_eq!(lease.owner_pid, info.owner_pid);
    assert!(!lease.takeover);
}

#[tokio::test(start_paused = true)]
async fn matching_bridge_is_reused() {
    let h = harness();
    h.run_bridge(300, HOST_VERSION, HOST_PATH);

    let info = h.client.get_bridge_info().await.unwrap();
    assert_eq!(info.owner_pid, 300);
    assert_eq!(h.launcher.launch_count(), 0);
    assert!(h.platform.terminations().is_empty());
    assert_eq!(h.lease().map(|l| l.owner_pid), Some(300));
}

#[tokio::test(start_paused = true)]
async fn cached_info_is_reused_while_owner_unchanged() {
    let h = harness();
    let first = h.client.get_bridge_info().await.unwrap();
    let second = h.client.get_bridge_info().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.client.resolution_count(), 1);
    assert_eq!(h.control.attach_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn attach_endpoints_override_health_info() {
    let h = harness();
    h.control.set_attach_urls(Some("ws://127.0.0.1:4000/events"), Some("http://127.0.0.1:4000"));

    let info = h.client.get_bridge_info().await.unwrap();
    assert_eq!(info.ws_url, "ws://127.0.0.1:4000/events");
    assert_eq!(info.http_base_url, "http://127.0.0.1:4000");
    assert_eq!(h.client.cached_info(), Some(info));
}

#[tokio::test(start_paused = true)]
async fn vanished_bridge_is_relaunched() {
    let h = harness();
    let first = h.client.get_bridge_info().await.unwrap();
    h.control.remove_pid(first.owner_pid);

    let second = h.client.get_bridge_info().await.unwrap();
    assert_ne!(first.owner_pid, second.owner_pid);
    assert_eq!(h.launcher.launch_count(), 2);
    assert_eq!(h.client.resolution_count(), 2);
    assert_eq!(h.control.attach_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn attach_failure_clears_cache() {
    let h = harness();
    h.control.fail_attach(Some(HttpError::Status { status: 500, body: "boom".into() }));

    let err = h.client.get_bridge_info().await.unwrap_err();
    assert!(matches!(err, BridgeError::AttachFailed(_)), "{err:?}");
    assert!(h.client.cached_info().is_none());
    assert!(!h.client.has_token());

    h.control.fail_attach(None);
    h.client.get_bridge_info().await.unwrap();
    assert_eq!(h.launcher.launch_count(), 1);
    assert!(h.client.has_token());
}

#[tokio::test(start_paused = true)]
async fn port_occupied_by_foreign_service() {
    let h = harness();
    h.control.set_unexpected(PORT, "HTTP 404: Not Found");

    let first = h.client.get_bridge_info().await.unwrap_err();
    assert!(first.is_port_occupied());
    let notice = h.client.occupancy_notice(&first).unwrap();
    assert!(notice.contains("55888"));

    let second = h.client.get_bridge_info().await.unwrap_err();
    assert!(second.is_port_occupied());
    assert_eq!(h.client.occupancy_notice(&second), None);
    assert_eq!(h.launcher.launch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn occupancy_notice_ignores_other_errors() {
    let h = harness();
    assert_eq!(h.client.occupancy_notice(&BridgeError::Disposed), None);
}

#[tokio::test(start_paused = true)]
async fn dispose_detaches_and_blocks_further_use() {
    let h = harness();
    h.client.get_bridge_info().await.unwrap();
    h.client.dispose().await;

    assert!(h.client.is_disposed());
    assert_eq!(h.control.detached_tokens(), vec!["tok-1".to_string()]);
    assert!(!h.client.heartbeat_active());
    assert!(matches!(h.client.get_bridge_info().await, Err(BridgeError::Disposed)));
    assert_eq!(h.launcher.launch_count(), 1);

    // Second dispose is a no-op.
    h.client.dispose().await;
    assert_eq!(h.control.detached_tokens().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn dispose_before_first_use() {
    let h = harness();
    h.client.dispose().await;
    assert!(matches!(h.client.get_bridge_info().await, Err(BridgeError::Disposed)));
    assert_eq!(h.launcher.launch_count(), 0);
    assert!(h.control.detached_tokens().is_empty());
}

#[tokio::test(start_paused = true)]
async fn logging_options_need_a_bridge() {
    let h = harness();
    h.client.update_logging_options(LoggingOptions { heartbeat: true }).await;
    assert!(h.control.logging_updates().is_empty());

    h.client.get_bridge_info().await.unwrap();
    h.client.update_logging_options(LoggingOptions { heartbeat: true }).await;
    assert_eq!(h.control.logging_updates(), vec![LoggingOptions { heartbeat: true }]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_running_bridge() {
    let h = harness();
    let info = h.client.get_bridge_info().await.unwrap();

    assert_eq!(h.client.shutdown_bridge().await.unwrap(), Some(info.owner_pid));
    assert_eq!(h.owner_pid(), None);
    assert!(h.client.cached_info().is_none());
    assert_eq!(h.client.shutdown_bridge().await.unwrap(), None);
}
