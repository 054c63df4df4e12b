// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use boardlab_bridge::HttpError;

#[tokio::test]
async fn connect_without_auto_start_only_attaches() {
    let h = harness();
    h.transport.set_detected(&[com3()]);
    let (_, snapshot) = h.connect("a", ConnectRequest::new().port(com3())).await;

    assert_eq!(h.start_count(), 0);
    let session = h.session(&com3());
    assert_eq!(session.desired, Desired::Stopped);
    assert_eq!(session.clients, vec![client("a")]);
    assert_eq!(snapshot.sessions, vec![session]);
    assert_eq!(h.manager.runtime_state(&com3()), MonitorRuntimeState::Connected);
}

#[tokio::test]
async fn connect_without_selection_registers_client_only() {
    let h = harness();
    h.transport.set_detected(&[com3(), com4()]);
    let (_, snapshot) = h.connect("a", ConnectRequest::new()).await;

    assert_eq!(snapshot.selection, None);
    assert!(snapshot.sessions.is_empty());
    assert_eq!(snapshot.physical_states.len(), 2);
    assert_eq!(h.manager.client_count(), 1);
}

#[tokio::test]
async fn client_baud_overrides_stale_running_baud() {
    let h = harness();
    h.transport.set_detected(&[com3()]);
    h.transport.set_running(vec![RunningMonitor {
        port: com3(),
        baudrate: Some("9600".to_string()),
        monitor_session_id: Some("mon-1".to_string()),
    }]);

    let (_, snapshot) =
        h.connect("a", ConnectRequest::new().port(com3()).baudrate("115200")).await;

    assert_eq!(snapshot.running_monitors[0].baudrate.as_deref(), Some("115200"));
    assert_eq!(h.manager.running_monitors()[0].baudrate.as_deref(), Some("115200"));
    assert_eq!(h.manager.cached_baudrate(&com3()).as_deref(), Some("115200"));
}

#[tokio::test]
async fn running_baud_is_the_fallback_for_a_new_client() {
    let h = harness();
    h.transport.set_detected(&[com3()]);
    h.transport.set_running(vec![RunningMonitor {
        port: com3(),
        baudrate: Some("57600".to_string()),
        monitor_session_id: None,
    }]);

    let (_, snapshot) = h.connect("a", ConnectRequest::new().port(com3())).await;
    let selection = snapshot.selection.unwrap();
    assert_eq!(selection.baudrate.as_deref(), Some("57600"));
}

#[tokio::test]
async fn connect_reports_bridge_failure_once() {
    let h = harness();
    h.transport.fail_state(true);
    let participant = RecordingParticipant::new();

    let err = h
        .manager
        .handle_connect_monitor_client(
            client("a"),
            Arc::new(participant.clone()),
            ConnectRequest::new().port(com3()),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MonitorError::Http(_)), "{err:?}");
    assert_eq!(participant.errors().len(), 1);
}

#[tokio::test]
async fn external_client_auto_starts_with_default_baud() {
    let h = harness();
    h.manager
        .register_external_monitor_client(client("task"), com3(), ExternalClientOptions::default())
        .await
        .unwrap();

    let starts = h.transport.starts();
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].1.as_deref(), Some("9600"));
    assert_eq!(h.session(&com3()).status, SessionStatus::Opening);
}

#[tokio::test]
async fn external_client_prefers_options_then_cache() {
    let h = harness();
    h.manager
        .handle_bridge_event(BridgeEvent::BaudrateChanged {
            port: com3(),
            baudrate: "115200".to_string(),
        })
        .await;

    h.manager
        .register_external_monitor_client(client("cached"), com3(), ExternalClientOptions::default())
        .await
        .unwrap();
    h.manager
        .register_external_monitor_client(
            client("explicit"),
            com4(),
            ExternalClientOptions::default().baudrate("57600"),
        )
        .await
        .unwrap();

    let bauds: Vec<Option<String>> = h.transport.starts().into_iter().map(|(_, b, _)| b).collect();
    assert_eq!(bauds, vec![Some("115200".to_string()), Some("57600".to_string())]);
}

#[tokio::test]
async fn external_client_without_auto_start_waits() {
    let h = harness();
    h.manager
        .register_external_monitor_client(
            client("task"),
            com3(),
            ExternalClientOptions::default().auto_start(false),
        )
        .await
        .unwrap();
    assert_eq!(h.start_count(), 0);

    h.manager.unregister_external_monitor_client(&client("task")).await.unwrap();
    assert!(h.manager.session_snapshot(&com3()).is_none());
    assert_eq!(h.stop_count(), 0);
}

#[tokio::test]
async fn idle_session_is_pruned_on_disconnect() {
    let h = harness();
    h.transport.set_detected(&[com3()]);
    let (_, _) = h.connect("a", ConnectRequest::new().port(com3())).await;
    assert!(h.manager.session_snapshot(&com3()).is_some());

    h.manager.handle_disconnect_monitor_client(&client("a")).await.unwrap();
    assert!(h.manager.session_snapshot(&com3()).is_none());
    assert_eq!(h.stop_count(), 0);
    assert_eq!(h.manager.runtime_state(&com3()), MonitorRuntimeState::Disconnected);
}

#[tokio::test]
async fn disconnect_of_unknown_client_is_ignored() {
    let h = harness();
    h.manager.handle_disconnect_monitor_client(&client("ghost")).await.unwrap();
    assert!(h.transport.calls().is_empty());
}

#[tokio::test]
async fn intent_from_unknown_client_is_rejected() {
    let h = harness();
    let err = h.manager.handle_intent(&client("ghost"), Intent::Start, &com3()).await.unwrap_err();
    assert!(matches!(err, MonitorError::UnknownClient(_)), "{err:?}");
    assert_eq!(h.start_count(), 0);
}

#[tokio::test]
async fn intent_on_another_port_moves_the_client() {
    let h = harness();
    h.transport.set_detected(&[com3(), com4()]);
    h.connect("a", ConnectRequest::new().port(com3())).await;

    h.manager.handle_intent(&client("a"), Intent::Start, &com4()).await.unwrap();

    assert!(h.manager.session_snapshot(&com3()).is_none(), "old idle session pruned");
    assert_eq!(h.session(&com4()).clients, vec![client("a")]);
    assert_eq!(h.transport.starts()[0].0, com4());
}

#[tokio::test]
async fn generic_open_failure_marks_error_and_notifies_once() {
    let h = harness();
    h.transport.set_detected(&[com3()]);
    let (participant, _) = h.connect("a", ConnectRequest::new().port(com3())).await;
    h.transport.fail_start(Some(HttpError::Status {
        status: 500,
        body: r#"{"message":"port busy"}"#.to_string(),
    }));

    let err = h.manager.handle_intent(&client("a"), Intent::Start, &com3()).await.unwrap_err();
    assert_eq!(err.to_open_error().message, "port busy");

    let session = h.session(&com3());
    assert_eq!(session.status, SessionStatus::Error);
    assert_eq!(session.last_error.map(|e| e.message).as_deref(), Some("port busy"));
    assert_eq!(participant.errors().len(), 1);
    assert_eq!(h.start_count(), 1, "no automatic retry");
}

#[tokio::test]
async fn missing_port_failure_pauses_session() {
    let h = harness();
    h.transport.set_detected(&[com3()]);
    h.connect("a", ConnectRequest::new().port(com3())).await;
    h.transport.fail_start(Some(HttpError::Status { status: 404, body: "gone".to_string() }));

    assert!(h.manager.handle_intent(&client("a"), Intent::Start, &com3()).await.is_err());

    let session = h.session(&com3());
    assert_eq!(session.status, SessionStatus::Paused);
    assert_eq!(session.pause_reason, Some(PauseReason::ResourceMissing));
    assert!(!session.detected);
}

#[tokio::test]
async fn restart_after_error_opens_again() {
    let h = harness();
    h.transport.set_detected(&[com3()]);
    h.connect("a", ConnectRequest::new().port(com3())).await;
    h.transport.fail_start(Some(HttpError::Status { status: 500, body: "busy".to_string() }));
    let _ = h.manager.handle_intent(&client("a"), Intent::Start, &com3()).await;

    h.transport.fail_start(None);
    h.manager.handle_intent(&client("a"), Intent::Start, &com3()).await.unwrap();
    assert_eq!(h.start_count(), 2);
    assert_eq!(h.session(&com3()).status, SessionStatus::Opening);
}

#[tokio::test]
async fn disposed_manager_rejects_work() {
    let h = harness();
    h.transport.set_detected(&[com3()]);
    h.connect("a", ConnectRequest::new().port(com3())).await;

    h.manager.dispose().await;
    h.manager.dispose().await;

    assert!(h.manager.is_disposed());
    assert_eq!(h.manager.client_count(), 0);
    assert_eq!(h.transport.count(|c| matches!(c, TransportCall::Dispose)), 1);
    let err = h.manager.handle_intent(&client("a"), Intent::Start, &com3()).await.unwrap_err();
    assert!(matches!(err, MonitorError::Disposed), "{err:?}");
}
