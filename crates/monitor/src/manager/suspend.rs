// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suspending a port's monitor around uploads, and writing to it.

use boardlab_core::{Clock, PauseReason, PortIdentifier, SessionStatus};

use super::{Effects, MonitorManager};
use crate::error::MonitorError;

impl<K: Clock> MonitorManager<K> {
    /// Pause the monitor on `port` so another task can use the port.
    ///
    /// Returns false when no monitor runs there, in which case there is
    /// nothing to resume afterwards.
    pub async fn pause_monitor(&self, port: &PortIdentifier) -> Result<bool, MonitorError> {
        {
            let state = self.inner.state.lock();
            Self::ensure_live(&state)?;
            let running = state
                .sessions
                .get(port.key().as_str())
                .is_some_and(|s| s.status() == SessionStatus::Running);
            if !running && !state.running.contains(port) {
                tracing::debug!(%port, "pause requested but no monitor is running");
                return Ok(false);
            }
        }

        tracing::info!(%port, "pausing monitor");
        self.transport().pause(port).await?;

        let at_ms = self.now_ms();
        let mut effects = Effects::default();
        {
            let mut state = self.inner.state.lock();
            let key = port.key();
            if let Some(session) = state.sessions.get_mut(&key) {
                session.mark_paused(PauseReason::Suspended);
                state.settle(&key, "monitor-paused", None, at_ms, &mut effects);
            }
        }
        self.complete(effects).await?;
        Ok(true)
    }

    /// Resume the monitor on `port` after [`Self::pause_monitor`].
    ///
    /// Retries until the bridge confirms the monitor runs again. Gives up
    /// after the configured attempts and returns false; never fails.
    pub async fn resume_monitor(&self, port: &PortIdentifier) -> bool {
        if self.is_disposed() {
            return false;
        }
        let attempts = self.inner.config.resume_attempts.max(1);
        let delay = self.inner.config.resume_delay();
        for attempt in 1..=attempts {
            if let Err(err) = self.transport().resume(port).await {
                tracing::debug!(%port, attempt, error = %err, "resume call failed");
            }
            tokio::time::sleep(delay).await;
            match self.transport().state().await {
                Ok(bridge) if bridge.is_running(port) => {
                    self.confirm_resumed(port).await;
                    tracing::info!(%port, attempt, "monitor resumed");
                    return true;
                }
                Ok(_) => tracing::debug!(%port, attempt, "monitor not running yet"),
                Err(err) => tracing::debug!(%port, attempt, error = %err, "bridge state unavailable"),
            }
        }
        tracing::warn!(%port, attempts, "monitor did not resume");
        false
    }

    async fn confirm_resumed(&self, port: &PortIdentifier) {
        let at_ms = self.now_ms();
        let mut effects = Effects::default();
        {
            let mut state = self.inner.state.lock();
            let key = port.key();
            if let Some(session) = state.sessions.get_mut(&key) {
                if session.status() == SessionStatus::Paused {
                    session.mark_resumed();
                    state.settle(&key, "monitor-resumed", None, at_ms, &mut effects);
                }
            }
        }
        if let Err(err) = self.complete(effects).await {
            tracing::debug!(error = %err, "dispatch after resume failed");
        }
    }

    /// Write `message` to the monitor on `port`.
    pub async fn send_message(&self, port: &PortIdentifier, message: &str) -> Result<(), MonitorError> {
        Self::ensure_live(&self.inner.state.lock())?;
        self.transport().send(port, message).await
    }
}
