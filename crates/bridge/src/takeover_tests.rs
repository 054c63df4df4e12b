// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;

const NOW_MS: u64 = 1_700_000_000_000;

fn host() -> HostIdentity {
    HostIdentity {
        version: Some("2.0.0".to_string()),
        extension_path: Some(PathBuf::from("/ext/boardlab-2.0.0")),
        mode: None,
        commit: None,
    }
}

fn foreign() -> HostIdentity {
    HostIdentity {
        version: Some("1.0.0".to_string()),
        extension_path: Some(PathBuf::from("/ext/boardlab-1.0.0")),
        mode: None,
        commit: None,
    }
}

fn running() -> ServiceReadyInfo {
    ServiceReadyInfo::local(500, 55888).version("1.0.0").extension_path("/ext/boardlab-1.0.0")
}

fn policy() -> TakeoverPolicy {
    TakeoverPolicy::from_config(&BridgeConfig::default())
}

fn input<'a>(
    running: &'a ServiceReadyInfo,
    host: &'a HostIdentity,
    lease: Option<&'a OwnershipLease>,
) -> TakeoverInput<'a> {
    TakeoverInput {
        running,
        host,
        lease,
        now_ms: NOW_MS,
        since_last_takeover: None,
        startup_phase: false,
        startup_retries_used: 0,
        bypass_cooldown: false,
    }
}

#[test]
fn kills_incompatible_bridge_by_default() {
    let (running, host) = (running(), host());
    assert_eq!(policy().decide(&input(&running, &host, None)), TakeoverDecision::Kill);
}

#[test]
fn fresh_foreign_lease_for_the_running_pid_is_respected() {
    let (running, host) = (running(), host());
    let lease = OwnershipLease::new(500, &foreign(), NOW_MS - 1_000, true);
    assert_eq!(
        policy().decide(&input(&running, &host, Some(&lease))),
        TakeoverDecision::Skip(SkipReason::FreshForeignOwner)
    );
}

#[yare::parameterized(
    old_lease   = { 500, 16_000, foreign() },
    other_pid   = { 501, 1_000,  foreign() },
    own_lease   = { 500, 1_000,  host() },
)]
fn lease_does_not_protect(pid: u32, age_ms: u64, writer: HostIdentity) {
    let (running, host) = (running(), host());
    let lease = OwnershipLease::new(pid, &writer, NOW_MS - age_ms, false);
    assert_eq!(policy().decide(&input(&running, &host, Some(&lease))), TakeoverDecision::Kill);
}

#[test]
fn cooldown_skips_outside_startup() {
    let (running, host) = (running(), host());
    let mut input = input(&running, &host, None);
    input.since_last_takeover = Some(Duration::from_secs(5));
    assert_eq!(policy().decide(&input), TakeoverDecision::Skip(SkipReason::Cooldown));
}

#[test]
fn cooldown_during_startup_retries_until_exhausted() {
    let (running, host) = (running(), host());
    let mut input = input(&running, &host, None);
    input.since_last_takeover = Some(Duration::from_secs(5));
    input.startup_phase = true;

    assert_eq!(policy().decide(&input), TakeoverDecision::Retry);
    input.startup_retries_used = 3;
    assert_eq!(policy().decide(&input), TakeoverDecision::Skip(SkipReason::Cooldown));
}

#[test]
fn retry_bypasses_cooldown() {
    let (running, host) = (running(), host());
    let mut input = input(&running, &host, None);
    input.since_last_takeover = Some(Duration::from_secs(5));
    input.bypass_cooldown = true;
    assert_eq!(policy().decide(&input), TakeoverDecision::Kill);
}

#[test]
fn expired_cooldown_kills() {
    let (running, host) = (running(), host());
    let mut input = input(&running, &host, None);
    input.since_last_takeover = Some(Duration::from_secs(31));
    assert_eq!(policy().decide(&input), TakeoverDecision::Kill);
}

#[test]
fn decision_display() {
    assert_eq!(TakeoverDecision::Kill.to_string(), "kill");
    assert_eq!(TakeoverDecision::Retry.to_string(), "retry");
    assert_eq!(TakeoverDecision::Skip(SkipReason::Cooldown).to_string(), "skip(cooldown)");
}

#[test]
fn decision_log_suppresses_repeats_within_window() {
    let start = Instant::now();
    let mut log = DecisionLog::new(Duration::from_secs(60), 8);
    let signature = decision_signature(TakeoverDecision::Kill, &running(), &host());

    assert!(log.should_log(&signature, start));
    assert!(!log.should_log(&signature, start + Duration::from_secs(30)));
    assert!(log.should_log(&signature, start + Duration::from_secs(61)));
}

#[test]
fn decision_log_is_bounded() {
    let start = Instant::now();
    let mut log = DecisionLog::new(Duration::from_secs(60), 2);
    assert!(log.should_log("a", start));
    assert!(log.should_log("b", start));
    assert!(log.should_log("c", start));
    assert_eq!(log.len(), 2);
    // "a" was evicted, so it logs again.
    assert!(log.should_log("a", start));
}

#[test]
fn signatures_distinguish_decisions() {
    let kill = decision_signature(TakeoverDecision::Kill, &running(), &host());
    let skip =
        decision_signature(TakeoverDecision::Skip(SkipReason::Cooldown), &running(), &host());
    assert_ne!(kill, skip);
}
