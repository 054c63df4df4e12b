// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use boardlab_core::Channel;

#[tokio::test]
async fn trace_channel_receives_session_traces() {
    let h = harness();
    h.transport.set_detected(&[com3()]);
    let (traced, _) = h
        .connect(
            "traced",
            ConnectRequest::new().port(com3()).channel(Channel::Monitor).channel(Channel::Trace),
        )
        .await;
    let (plain, _) = h.connect("plain", ConnectRequest::new().port(com3())).await;

    h.manager.handle_intent(&client("plain"), Intent::Start, &com3()).await.unwrap();

    let traces = traced.count(|n| matches!(n, ClientNotification::Trace(_)));
    assert!(traces >= 3, "attach, attach, start: {traces}");
    assert_eq!(plain.count(|n| matches!(n, ClientNotification::Trace(_))), 0);
    let last = traced
        .received()
        .into_iter()
        .filter_map(|n| match n {
            ClientNotification::Trace(event) => Some(event),
            _ => None,
        })
        .next_back()
        .unwrap();
    assert_eq!(last.kind, "intent-start");
    assert_eq!(last.client_id, Some(client("plain")));
    assert_eq!(last.session.status, SessionStatus::Opening);
}

#[tokio::test]
async fn trace_only_client_gets_no_monitor_notifications() {
    let h = harness();
    h.transport.set_detected(&[com3()]);
    let (traced, _) =
        h.connect("traced", ConnectRequest::new().port(com3()).channel(Channel::Trace)).await;

    assert!(traced.count(|n| matches!(n, ClientNotification::Trace(_))) > 0);
    assert!(traced.session_states(&com3()).is_empty());
}

#[tokio::test]
async fn sink_records_every_mutation() {
    let h = harness();
    h.connect_started("a", &com3()).await;
    h.bridge_started(&com3(), Some("9600")).await;
    drain_traces().await;

    assert_eq!(h.sink.kinds(), vec!["client-attached", "intent-start", "monitor-started"]);
    let events = h.sink.events();
    assert!(events.iter().all(|e| e.port == com3()));
    assert_eq!(events[0].client_id, Some(client("a")));
    assert_eq!(events[2].client_id, None);
}

#[tokio::test]
async fn failing_sink_does_not_disturb_the_flow() {
    let h = harness_with(ManagerConfig::default(), RecordingTraceSink::failing());
    h.connect_started("a", &com3()).await;
    h.bridge_started(&com3(), Some("9600")).await;
    drain_traces().await;

    assert!(h.sink.events().is_empty());
    assert_eq!(h.session(&com3()).status, SessionStatus::Running);
}
