// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use boardlab_core::MonitorSettings;

#[tokio::test]
async fn events_are_forwarded_verbatim_to_every_client() {
    let h = harness();
    h.transport.set_detected(&[com3()]);
    let (a, _) = h.connect("a", ConnectRequest::new().port(com3())).await;
    let (b, _) = h.connect("b", ConnectRequest::new()).await;

    let event = BridgeEvent::MonitorSettingsChanged {
        settings: MonitorSettings {
            protocol: "serial".to_string(),
            settings: serde_json::json!({"baudrates": ["9600", "115200"]}),
        },
    };
    h.manager.handle_bridge_event(event.clone()).await;

    assert_eq!(a.bridge_events(), vec![event.clone()]);
    assert_eq!(b.bridge_events(), vec![event]);

    let (_, snapshot) = h.connect("c", ConnectRequest::new()).await;
    assert_eq!(snapshot.settings.len(), 1);
    assert_eq!(snapshot.settings[0].protocol, "serial");
}

#[tokio::test]
async fn unchanged_snapshots_are_not_rebroadcast() {
    let h = harness();
    h.transport.set_detected(&[com3()]);
    let (participant, _) = h.connect("a", ConnectRequest::new().port(com3())).await;
    let before = participant.session_states(&com3()).len();
    assert!(before > 0);

    let same = BridgeEvent::BaudrateChanged { port: com3(), baudrate: "9600".to_string() };
    h.manager.handle_bridge_event(same.clone()).await;
    h.manager.handle_bridge_event(same).await;
    assert_eq!(participant.session_states(&com3()).len(), before);

    let changed = BridgeEvent::BaudrateChanged { port: com3(), baudrate: "115200".to_string() };
    h.manager.handle_bridge_event(changed).await;
    let states = participant.session_states(&com3());
    assert_eq!(states.len(), before + 1);
    assert_eq!(states.last().and_then(|s| s.baudrate.as_deref()), Some("115200"));
}

#[tokio::test]
async fn stale_start_is_ignored() {
    let h = harness();
    h.connect_started("a", &com3()).await;

    let stale = AttemptId::from_string("att-old");
    h.manager.handle_bridge_event(monitor_started_event(&com3(), Some("9600"), Some(&stale))).await;

    assert_eq!(h.session(&com3()).status, SessionStatus::Opening);
    assert!(h.manager.running_monitors().is_empty());
}

#[tokio::test]
async fn start_after_stop_is_closed_again() {
    let h = harness();
    h.connect_started("a", &com3()).await;
    h.manager.handle_intent(&client("a"), Intent::Stop, &com3()).await.unwrap();
    assert_eq!(h.stop_count(), 1);

    h.manager.handle_bridge_event(monitor_started_event(&com3(), Some("9600"), None)).await;

    assert_eq!(h.stop_count(), 2);
    assert_eq!(h.session(&com3()).desired, Desired::Stopped);
}

#[tokio::test]
async fn pause_and_resume_events_drive_runtime_state() {
    let h = harness();
    let changes = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&changes);
    let _sub = h.manager.subscribe_runtime_state(move |change| seen.lock().push(change.current));

    h.connect_started("a", &com3()).await;
    h.bridge_started(&com3(), None).await;
    h.manager
        .handle_bridge_event(BridgeEvent::MonitorPaused { port: com3(), reason: None })
        .await;
    assert_eq!(h.session(&com3()).pause_reason, Some(PauseReason::Suspended));
    h.manager.handle_bridge_event(BridgeEvent::MonitorResumed { port: com3() }).await;

    assert_eq!(
        *changes.lock(),
        vec![
            MonitorRuntimeState::Connected,
            MonitorRuntimeState::Running,
            MonitorRuntimeState::Suspended,
            MonitorRuntimeState::Running,
        ]
    );
}

#[tokio::test]
async fn runtime_error_for_current_attempt_marks_error() {
    let h = harness();
    h.connect_started("a", &com3()).await;
    let attempt = h.last_attempt(&com3());

    h.manager
        .handle_bridge_event(monitor_error_event(&com3(), OpenError::new("access denied"), Some(&attempt)))
        .await;

    let session = h.session(&com3());
    assert_eq!(session.status, SessionStatus::Error);
    assert_eq!(session.last_error.map(|e| e.message).as_deref(), Some("access denied"));
}

#[tokio::test]
async fn missing_port_error_pauses_and_marks_undetected() {
    let h = harness();
    h.connect_started("a", &com3()).await;
    h.bridge_started(&com3(), Some("9600")).await;

    let error = OpenError::new("port vanished").code("ENOENT");
    h.manager.handle_bridge_event(monitor_error_event(&com3(), error, None)).await;

    let session = h.session(&com3());
    assert_eq!(session.status, SessionStatus::Paused);
    assert_eq!(session.pause_reason, Some(PauseReason::ResourceMissing));
    assert!(h.manager.running_monitors().is_empty());
}

#[tokio::test]
async fn stopped_while_wanted_reopens() {
    let h = harness();
    h.connect_started("a", &com3()).await;
    h.bridge_started(&com3(), Some("9600")).await;

    h.manager.handle_bridge_event(monitor_stopped_event(&com3())).await;

    assert_eq!(h.start_count(), 2);
    assert_eq!(h.session(&com3()).status, SessionStatus::Opening);
}

#[tokio::test]
async fn disposed_manager_ignores_events() {
    let h = harness();
    h.manager.dispose().await;
    h.manager.handle_bridge_event(monitor_started_event(&com3(), None, None)).await;
    assert!(h.manager.running_monitors().is_empty());
}
