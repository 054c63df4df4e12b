// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Whether to kill an incompatible bridge, and log de-duplication for the
//! decisions.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::BridgeConfig;
use crate::control::ServiceReadyInfo;
use crate::identity::{HostIdentity, IdentityStrictness};
use crate::lease::OwnershipLease;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another identity claimed the bridge moments ago.
    FreshForeignOwner,
    /// This host already took over recently.
    Cooldown,
}

boardlab_core::simple_display! {
    SkipReason {
        FreshForeignOwner => "fresh-foreign-owner",
        Cooldown => "cooldown",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeoverDecision {
    Kill,
    /// Back off, re-probe, then decide again ignoring the cooldown.
    Retry,
    Skip(SkipReason),
}

impl fmt::Display for TakeoverDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TakeoverDecision::Kill => f.write_str("kill"),
            TakeoverDecision::Retry => f.write_str("retry"),
            TakeoverDecision::Skip(reason) => write!(f, "skip({reason})"),
        }
    }
}

/// Facts the policy decides on.
#[derive(Debug, Clone)]
pub struct TakeoverInput<'a> {
    pub running: &'a ServiceReadyInfo,
    pub host: &'a HostIdentity,
    pub lease: Option<&'a OwnershipLease>,
    pub now_ms: u64,
    pub since_last_takeover: Option<Duration>,
    /// No resolution has succeeded yet for this client.
    pub startup_phase: bool,
    pub startup_retries_used: u32,
    /// Set on the decision that follows a `Retry`.
    pub bypass_cooldown: bool,
}

#[derive(Debug, Clone)]
pub struct TakeoverPolicy {
    pub cooldown: Duration,
    pub fresh_owner_window_ms: u64,
    pub startup_retries: u32,
    pub strictness: IdentityStrictness,
}

impl TakeoverPolicy {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            cooldown: Duration::from_millis(config.takeover_cooldown_ms),
            fresh_owner_window_ms: config.fresh_owner_window_ms,
            startup_retries: config.takeover_startup_retries,
            strictness: config.identity_strictness,
        }
    }

    pub fn decide(&self, input: &TakeoverInput<'_>) -> TakeoverDecision {
        if let Some(lease) = input.lease {
            if lease.owner_pid == input.running.owner_pid
                && !lease.written_by(input.host, self.strictness)
                && lease.age_ms(input.now_ms) < self.fresh_owner_window_ms
            {
                return TakeoverDecision::Skip(SkipReason::FreshForeignOwner);
            }
        }

        let cooling = input.since_last_takeover.is_some_and(|elapsed| elapsed < self.cooldown);
        if cooling && !input.bypass_cooldown {
            if input.startup_phase && input.startup_retries_used < self.startup_retries {
                return TakeoverDecision::Retry;
            }
            return TakeoverDecision::Skip(SkipReason::Cooldown);
        }
        TakeoverDecision::Kill
    }
}

/// Signature identifying a decision for de-duplication.
pub fn decision_signature(
    decision: TakeoverDecision,
    running: &ServiceReadyInfo,
    host: &HostIdentity,
) -> String {
    format!(
        "{}|{}|{}|{}|{}",
        decision,
        running.owner_pid,
        running.version.as_deref().unwrap_or_default(),
        running.extension_path.as_deref().unwrap_or_default(),
        host.describe()
    )
}

/// Bounded, time-windowed set of recently logged decision signatures.
///
/// Only suppresses repeated log lines; it never changes a decision.
#[derive(Debug)]
pub struct DecisionLog {
    window: Duration,
    capacity: usize,
    entries: VecDeque<(String, Instant)>,
}

impl DecisionLog {
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self { window, capacity: capacity.max(1), entries: VecDeque::new() }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            Duration::from_millis(config.decision_dedupe_window_ms),
            config.decision_dedupe_capacity,
        )
    }

    /// True when `signature` was not logged within the window.
    pub fn should_log(&mut self, signature: &str, now: Instant) -> bool {
        let window = self.window;
        self.entries.retain(|(_, at)| now.saturating_duration_since(*at) < window);
        if self.entries.iter().any(|(sig, _)| sig == signature) {
            return false;
        }
        self.entries.push_back((signature.to_string(), now));
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "takeover_tests.rs"]
mod tests;
