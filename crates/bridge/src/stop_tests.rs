// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::fake::{FakeBridgeControl, FakePlatform};

const GRACE: Duration = Duration::from_millis(300);

#[tokio::test(start_paused = true)]
async fn dead_process_needs_no_signal() {
    let platform = FakePlatform::new(FakeBridgeControl::new());
    assert!(stop_process(&platform, 10, GRACE).await);
    assert!(platform.terminations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn graceful_stop_is_enough() {
    let platform = FakePlatform::new(FakeBridgeControl::new());
    platform.add_process(10, "node bridge.js");

    assert!(stop_process(&platform, 10, GRACE).await);
    assert_eq!(platform.terminations(), vec![(10, TerminateMode::Graceful)]);
}

#[tokio::test(start_paused = true)]
async fn escalates_to_force() {
    let platform = FakePlatform::new(FakeBridgeControl::new());
    platform.add_process(10, "node bridge.js");
    platform.ignore_graceful(10);

    assert!(stop_process(&platform, 10, GRACE).await);
    assert_eq!(
        platform.terminations(),
        vec![(10, TerminateMode::Graceful), (10, TerminateMode::Force)]
    );
    assert!(!platform.alive(10));
}

#[tokio::test(start_paused = true)]
async fn stopping_a_bridge_takes_it_off_the_port() {
    let control = FakeBridgeControl::new();
    let platform = FakePlatform::new(control.clone());
    control.set_owner(crate::control::ServiceReadyInfo::local(10, 55888));
    platform.add_process(10, "node bridge.js");

    assert!(stop_process(&platform, 10, GRACE).await);
    assert!(control.owner(55888).is_none());
}
