// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

async fn running_harness(config: ManagerConfig) -> Harness {
    let h = harness_with(config, RecordingTraceSink::new());
    h.connect_started("a", &com3()).await;
    h.bridge_started(&com3(), Some("9600")).await;
    h
}

#[tokio::test(start_paused = true)]
async fn pause_then_resume_round_trip() {
    let h = running_harness(ManagerConfig::default()).await;

    assert!(h.manager.pause_monitor(&com3()).await.unwrap());
    let paused = h.session(&com3());
    assert_eq!(paused.status, SessionStatus::Paused);
    assert_eq!(paused.pause_reason, Some(PauseReason::Suspended));
    assert_eq!(h.manager.runtime_state(&com3()), MonitorRuntimeState::Suspended);

    assert!(h.manager.resume_monitor(&com3()).await);
    assert_eq!(h.session(&com3()).status, SessionStatus::Running);
    assert_eq!(h.transport.count(|c| matches!(c, TransportCall::Resume(_))), 1);
}

#[tokio::test]
async fn pause_without_monitor_is_a_no_op() {
    let h = harness();
    assert!(!h.manager.pause_monitor(&com3()).await.unwrap());
    assert_eq!(h.transport.count(|c| matches!(c, TransportCall::Pause(_))), 0);
}

#[tokio::test(start_paused = true)]
async fn resume_retries_until_confirmed() {
    let h = running_harness(ManagerConfig::default()).await;
    h.manager.pause_monitor(&com3()).await.unwrap();
    h.transport.ineffective_resumes(2);

    assert!(h.manager.resume_monitor(&com3()).await);
    assert_eq!(h.transport.count(|c| matches!(c, TransportCall::Resume(_))), 3);
}

#[tokio::test(start_paused = true)]
async fn resume_gives_up_without_error() {
    let config = ManagerConfig::default().resume_attempts(3).resume_delay_ms(100);
    let h = running_harness(config).await;
    h.manager.pause_monitor(&com3()).await.unwrap();
    h.transport.ineffective_resumes(u32::MAX);

    let started = tokio::time::Instant::now();
    assert!(!h.manager.resume_monitor(&com3()).await);

    assert_eq!(h.transport.count(|c| matches!(c, TransportCall::Resume(_))), 3);
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(h.session(&com3()).status, SessionStatus::Paused);
}

#[tokio::test]
async fn send_goes_to_the_port() {
    let h = harness();
    h.manager.send_message(&com3(), "reset\n").await.unwrap();
    assert_eq!(
        h.transport.calls(),
        vec![TransportCall::Send { port: com3(), message: "reset\n".to_string() }]
    );
}
