// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful-then-forced process termination.

use std::time::Duration;

use crate::platform::{ProcessPlatform, TerminateMode};

const EXIT_POLL: Duration = Duration::from_millis(100);

/// Terminate `pid`, escalating to a forced kill after `grace`.
///
/// Returns true once the process is gone. Failures of individual steps are
/// logged; only the final liveness check decides the result.
pub async fn stop_process(platform: &dyn ProcessPlatform, pid: u32, grace: Duration) -> bool {
    if !platform.is_alive(pid).await {
        return true;
    }

    if let Err(e) = platform.terminate(pid, TerminateMode::Graceful).await {
        tracing::debug!(pid, error = %e, "graceful terminate failed");
    }
    if wait_for_exit(platform, pid, grace).await {
        tracing::info!(pid, "bridge process stopped");
        return true;
    }

    tracing::warn!(pid, grace_ms = grace.as_millis() as u64, "process ignored terminate, forcing");
    if let Err(e) = platform.terminate(pid, TerminateMode::Force).await {
        tracing::warn!(pid, error = %e, "forced terminate failed");
    }
    let stopped = wait_for_exit(platform, pid, grace).await;
    if !stopped {
        tracing::error!(pid, "process survived forced terminate");
    }
    stopped
}

async fn wait_for_exit(platform: &dyn ProcessPlatform, pid: u32, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if !platform.is_alive(pid).await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(EXIT_POLL).await;
    }
}

#[cfg(test)]
#[path = "stop_tests.rs"]
mod tests;
