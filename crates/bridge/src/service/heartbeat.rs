// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Attach-token heartbeat.
//!
//! A rejected token or an unreachable bridge only invalidates the token;
//! the next `get_bridge_info` re-attaches. After dispose the loop is never
//! started again.

use boardlab_core::Clock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{BridgeServiceClient, HeartbeatHandle};
use crate::control::{HeartbeatOutcome, ServiceReadyInfo};

impl<K: Clock> BridgeServiceClient<K> {
    pub(super) fn start_heartbeat(&self, info: &ServiceReadyInfo, token: String) {
        let Some(interval) = self.inner.config.heartbeat_interval() else {
            tracing::debug!("heartbeat disabled");
            return;
        };
        let mut state = self.inner.state.lock();
        if state.disposed {
            return;
        }
        if let Some(previous) = state.heartbeat.take() {
            previous.cancel.cancel();
        }
        let cancel = self.inner.cancel.child_token();
        let task = tokio::spawn(heartbeat_loop(
            self.clone(),
            info.clone(),
            token,
            interval,
            cancel.clone(),
        ));
        state.heartbeat = Some(HeartbeatHandle { cancel, task });
    }

    /// Drop the attach token if it is still `token`.
    fn invalidate_token(&self, token: &str) {
        let mut state = self.inner.state.lock();
        if state.token.as_deref() == Some(token) {
            state.token = None;
        }
    }

    /// Whether a heartbeat loop is currently running.
    pub fn heartbeat_active(&self) -> bool {
        self.inner.state.lock().heartbeat.as_ref().is_some_and(|h| !h.task.is_finished())
    }
}

async fn heartbeat_loop<K: Clock>(
    client: BridgeServiceClient<K>,
    info: ServiceReadyInfo,
    token: String,
    interval: Duration,
    cancel: CancellationToken,
) {
    let log_heartbeat = client.inner.config.log_heartbeat;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return,
            outcome = client.inner.deps.control.heartbeat(&info, &token) => outcome,
        };
        match outcome {
            Ok(HeartbeatOutcome::Alive) => {
                if log_heartbeat {
                    tracing::debug!(pid = info.owner_pid, "heartbeat ok");
                }
            }
            Ok(HeartbeatOutcome::TokenInvalid) => {
                tracing::warn!(pid = info.owner_pid, "bridge no longer knows attach token");
                client.invalidate_token(&token);
                return;
            }
            Err(e) => {
                tracing::warn!(pid = info.owner_pid, error = %e, "heartbeat failed");
                client.invalidate_token(&token);
                return;
            }
        }
    }
}
