// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end flows through connect, intents and bridge events.

use super::*;

#[tokio::test]
async fn auto_start_opens_with_protocol_default_baud() {
    let h = harness();
    let running_seen = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&running_seen);
    let _sub = h.manager.subscribe_running_monitors(move |list| seen.lock().push(list.clone()));

    h.transport.set_detected(&[com3()]);
    let (participant, snapshot) =
        h.connect("webview-1", ConnectRequest::new().port(com3()).auto_start(true)).await;

    let selection = snapshot.selection.unwrap();
    assert_eq!(selection.port, com3());
    assert_eq!(selection.baudrate.as_deref(), Some("9600"));
    assert_eq!(snapshot.detected_ports.len(), 1);

    let starts = h.transport.starts();
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].0, com3());
    assert_eq!(starts[0].1.as_deref(), Some("9600"));

    let opening = h.session(&com3());
    assert_eq!(opening.status, SessionStatus::Opening);
    assert_eq!(opening.desired, Desired::Running);
    assert_eq!(opening.attempt_id.as_ref(), Some(&starts[0].2));
    assert_eq!(h.manager.runtime_state(&com3()), MonitorRuntimeState::Connected);

    h.bridge_started(&com3(), Some("9600")).await;

    let running = h.session(&com3());
    assert_eq!(running.status, SessionStatus::Running);
    assert_eq!(running.baudrate.as_deref(), Some("9600"));
    assert_eq!(running.attempt_id, None);
    assert_eq!(h.manager.runtime_state(&com3()), MonitorRuntimeState::Running);
    assert_eq!(h.manager.cached_baudrate(&com3()).as_deref(), Some("9600"));

    let monitors = h.manager.running_monitors();
    assert_eq!(monitors.len(), 1);
    assert_eq!(monitors[0].port, com3());
    assert_eq!(running_seen.lock().last(), Some(&monitors));

    let forwarded = participant.bridge_events();
    assert!(matches!(forwarded.last(), Some(BridgeEvent::MonitorStarted { .. })));
    let statuses: Vec<SessionStatus> =
        participant.session_states(&com3()).iter().map(|s| s.status).collect();
    assert_eq!(statuses.last(), Some(&SessionStatus::Running));
    assert!(statuses.contains(&SessionStatus::Opening));
}

#[tokio::test]
async fn shared_port_closes_after_last_client_and_prunes() {
    let h = harness();
    h.connect_started("a", &com3()).await;
    h.connect_started("b", &com3()).await;
    assert_eq!(h.start_count(), 1, "second start while opening is coalesced");

    h.bridge_started(&com3(), Some("9600")).await;
    assert_eq!(h.session(&com3()).clients, vec![client("a"), client("b")]);

    h.manager.handle_disconnect_monitor_client(&client("a")).await.unwrap();
    assert_eq!(h.stop_count(), 0, "b still wants the monitor");
    assert_eq!(h.session(&com3()).status, SessionStatus::Running);

    h.manager.handle_intent(&client("b"), Intent::Stop, &com3()).await.unwrap();
    assert_eq!(h.stop_count(), 1);
    assert_eq!(h.session(&com3()).desired, Desired::Stopped);

    h.manager.handle_disconnect_monitor_client(&client("b")).await.unwrap();
    assert_eq!(h.stop_count(), 1, "no second close");
    assert!(h.manager.session_snapshot(&com3()).is_some(), "kept until the bridge confirms");

    h.manager.handle_bridge_event(monitor_stopped_event(&com3())).await;
    assert!(h.manager.session_snapshot(&com3()).is_none());
    assert!(h.manager.running_monitors().is_empty());
    assert_eq!(h.manager.runtime_state(&com3()), MonitorRuntimeState::Disconnected);
    assert_eq!(h.manager.client_count(), 0);
}

#[tokio::test]
async fn unplug_and_replug_reopens() {
    let h = harness();
    let participant = h.connect_started("a", &com3()).await;
    h.bridge_started(&com3(), Some("9600")).await;

    h.manager.handle_bridge_event(detected_ports_event(&[])).await;
    let lost = h.session(&com3());
    assert_eq!(lost.status, SessionStatus::Paused);
    assert_eq!(lost.pause_reason, Some(PauseReason::ResourceMissing));
    assert!(!lost.detected);
    assert_eq!(h.manager.runtime_state(&com3()), MonitorRuntimeState::Suspended);
    let physical = participant.count(|n| {
        matches!(n, ClientNotification::PhysicalState(states)
            if states.iter().any(|s| s.port == com3() && !s.detected))
    });
    assert_eq!(physical, 1);

    h.manager.handle_bridge_event(detected_ports_event(&[com3()])).await;
    assert_eq!(h.start_count(), 2);
    let reopened = h.session(&com3());
    assert_eq!(reopened.status, SessionStatus::Opening);
    assert!(reopened.detected);
    assert_eq!(reopened.baudrate.as_deref(), Some("9600"));
}

#[tokio::test]
async fn stop_during_open_then_late_start_closes_and_restart_reopens() {
    let h = harness();
    h.connect_started("a", &com3()).await;
    let attempt = h.last_attempt(&com3());

    h.manager.handle_intent(&client("a"), Intent::Stop, &com3()).await.unwrap();
    assert_eq!(h.stop_count(), 1);
    let stopped = h.session(&com3());
    assert_eq!(stopped.status, SessionStatus::Idle);
    assert_eq!(stopped.desired, Desired::Stopped);

    h.manager
        .handle_bridge_event(monitor_started_event(&com3(), Some("9600"), Some(&attempt)))
        .await;
    assert_eq!(h.stop_count(), 2, "the late monitor is closed again");
    assert_eq!(h.manager.running_monitors().len(), 1);
    assert_eq!(h.session(&com3()).desired, Desired::Stopped);

    h.manager.handle_bridge_event(monitor_stopped_event(&com3())).await;
    assert!(h.manager.running_monitors().is_empty());

    h.manager.handle_intent(&client("a"), Intent::Start, &com3()).await.unwrap();
    assert_eq!(h.start_count(), 2);
    assert_eq!(h.session(&com3()).status, SessionStatus::Opening);
}

#[tokio::test]
async fn restart_right_after_stop_during_open_reopens() {
    let h = harness();
    h.connect_started("a", &com3()).await;

    h.manager.handle_intent(&client("a"), Intent::Stop, &com3()).await.unwrap();
    h.manager.handle_intent(&client("a"), Intent::Start, &com3()).await.unwrap();

    assert_eq!(h.start_count(), 2);
    assert_eq!(h.session(&com3()).status, SessionStatus::Opening);
}

#[tokio::test]
async fn late_start_after_pruned_open_is_closed() {
    let h = harness();
    h.connect_started("a", &com3()).await;
    let attempt = h.last_attempt(&com3());

    h.manager.handle_disconnect_monitor_client(&client("a")).await.unwrap();
    assert_eq!(h.stop_count(), 1);
    assert!(h.manager.session_snapshot(&com3()).is_none());

    h.manager
        .handle_bridge_event(monitor_started_event(&com3(), Some("9600"), Some(&attempt)))
        .await;
    assert_eq!(h.stop_count(), 2);
    assert_eq!(h.manager.running_monitors()[0].port, com3());
}
