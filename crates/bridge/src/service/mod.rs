// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridge Service Client: one handle per host that finds, launches, adopts
//! or takes over the machine-wide monitor bridge, attaches to it and keeps
//! the attachment alive.
//!
//! Concurrent callers share a single in-flight resolution and a single
//! attach (async gates with a re-check after acquiring). Shared state lives
//! behind a `parking_lot` mutex that is never held across an await.

mod heartbeat;
mod resolve;

use boardlab_core::{Clock, EventHub, Subscription, SystemClock};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::BridgeConfig;
use crate::control::{
    BridgeControl, HealthProbe, HttpBridgeControl, LoggingOptions, ServiceReadyInfo,
};
use crate::error::BridgeError;
use crate::identity::{HostIdentity, InstalledIdentityResolver, SiblingInstallResolver};
use crate::launcher::{Launcher, ProcessLauncher};
use crate::lease::LeaseStore;
use crate::platform::{self, ProcessPlatform};
use crate::stop::stop_process;
use crate::takeover::{DecisionLog, TakeoverPolicy};

/// Collaborators of a [`BridgeServiceClient`].
#[derive(Clone)]
pub struct BridgeDeps {
    pub control: Arc<dyn BridgeControl>,
    pub launcher: Arc<dyn Launcher>,
    pub platform: Arc<dyn ProcessPlatform>,
    pub installed: Option<Arc<dyn InstalledIdentityResolver>>,
}

impl BridgeDeps {
    /// Real HTTP control, process launcher and OS platform.
    pub fn native(config: &BridgeConfig) -> Self {
        Self {
            control: Arc::new(HttpBridgeControl::default()),
            launcher: Arc::new(ProcessLauncher),
            platform: platform::native(),
            installed: Some(Arc::new(SiblingInstallResolver::new(config.extension_id.clone()))),
        }
    }
}

/// Emitted when this host turns out to be older than the install on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleHostNotice {
    pub host: HostIdentity,
    pub installed: HostIdentity,
    pub message: String,
}

struct HeartbeatHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct ClientState {
    info: Option<ServiceReadyInfo>,
    token: Option<String>,
    heartbeat: Option<HeartbeatHandle>,
    disposed: bool,
    resolutions: u32,
    resolved_once: bool,
    last_takeover: Option<Instant>,
    startup_retries_used: u32,
    occupancy_reported: bool,
    stale_notified: bool,
    decisions: DecisionLog,
}

struct Inner<K: Clock> {
    config: BridgeConfig,
    host: HostIdentity,
    client_id: String,
    deps: BridgeDeps,
    clock: K,
    policy: TakeoverPolicy,
    lease: LeaseStore,
    state: Mutex<ClientState>,
    resolve_gate: tokio::sync::Mutex<()>,
    attach_gate: tokio::sync::Mutex<()>,
    cancel: CancellationToken,
    stale_hub: EventHub<StaleHostNotice>,
}

/// Handle to the shared monitor bridge. Clones share all state.
pub struct BridgeServiceClient<K: Clock = SystemClock> {
    inner: Arc<Inner<K>>,
}

impl<K: Clock> Clone for BridgeServiceClient<K> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl BridgeServiceClient<SystemClock> {
    pub fn native(config: BridgeConfig, client_id: impl Into<String>) -> Self {
        let deps = BridgeDeps::native(&config);
        Self::new(config, client_id, deps, SystemClock)
    }
}

impl<K: Clock> BridgeServiceClient<K> {
    pub fn new(config: BridgeConfig, client_id: impl Into<String>, deps: BridgeDeps, clock: K) -> Self {
        let state = ClientState {
            info: None,
            token: None,
            heartbeat: None,
            disposed: false,
            resolutions: 0,
            resolved_once: false,
            last_takeover: None,
            startup_retries_used: 0,
            occupancy_reported: false,
            stale_notified: false,
            decisions: DecisionLog::from_config(&config),
        };
        Self {
            inner: Arc::new(Inner {
                host: config.host_identity(),
                policy: TakeoverPolicy::from_config(&config),
                lease: LeaseStore::new(config.lease_path()),
                client_id: client_id.into(),
                config,
                deps,
                clock,
                state: Mutex::new(state),
                resolve_gate: tokio::sync::Mutex::new(()),
                attach_gate: tokio::sync::Mutex::new(()),
                cancel: CancellationToken::new(),
                stale_hub: EventHub::new(),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Live, attached bridge info.
    ///
    /// Reuses the cached info when the bridge still answers with the same
    /// owner pid; otherwise resolves (launching or taking over as needed)
    /// and attaches. The heartbeat starts once attached.
    pub async fn get_bridge_info(&self) -> Result<ServiceReadyInfo, BridgeError> {
        self.ensure_live()?;
        let info = self.ensure_resolved().await?;
        self.ensure_attached(info).await
    }

    /// Best-effort logging update; a no-op without a reachable bridge.
    pub async fn update_logging_options(&self, options: LoggingOptions) {
        let info = {
            let state = self.inner.state.lock();
            if state.disposed {
                return;
            }
            state.info.clone()
        };
        let Some(info) = info else {
            return;
        };
        if let Err(e) = self.inner.deps.control.update_logging(&info, &options).await {
            tracing::debug!(error = %e, "bridge logging update failed");
        }
    }

    /// Cancel in-flight work, stop the heartbeat and detach. Later calls
    /// fail with [`BridgeError::Disposed`].
    pub async fn dispose(&self) {
        let (info, token, heartbeat) = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            (state.info.clone(), state.token.take(), state.heartbeat.take())
        };
        self.inner.cancel.cancel();
        if let Some(heartbeat) = heartbeat {
            heartbeat.cancel.cancel();
            heartbeat.task.abort();
        }
        if let (Some(info), Some(token)) = (info, token) {
            let detach = self.inner.deps.control.detach(&info, &token);
            match tokio::time::timeout(self.inner.config.health_timeout(), detach).await {
                Ok(Ok(())) => tracing::info!(pid = info.owner_pid, "detached from bridge"),
                Ok(Err(e)) => tracing::debug!(error = %e, "bridge detach failed"),
                Err(_) => tracing::debug!("bridge detach timed out"),
            }
        }
        self.inner.stale_hub.clear();
    }

    /// The actionable "port occupied" message, only for the first such
    /// error this client observes.
    pub fn occupancy_notice(&self, err: &BridgeError) -> Option<String> {
        let message = err.occupancy_message()?;
        let mut state = self.inner.state.lock();
        if state.occupancy_reported {
            return None;
        }
        state.occupancy_reported = true;
        Some(message)
    }

    pub fn subscribe_stale_host(
        &self,
        handler: impl Fn(&StaleHostNotice) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.stale_hub.subscribe(handler)
    }

    pub fn cached_info(&self) -> Option<ServiceReadyInfo> {
        self.inner.state.lock().info.clone()
    }

    /// Number of completed resolutions (probe, launch or takeover).
    pub fn resolution_count(&self) -> u32 {
        self.inner.state.lock().resolutions
    }

    pub fn has_token(&self) -> bool {
        self.inner.state.lock().token.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    /// Probe the preferred port without resolving.
    pub async fn probe(&self) -> HealthProbe {
        self.inner
            .deps
            .control
            .health(self.inner.config.preferred_port, self.inner.config.health_timeout())
            .await
    }

    /// Stop whatever bridge answers on the preferred port. Returns the
    /// stopped pid, or `None` when no bridge was running.
    pub async fn shutdown_bridge(&self) -> Result<Option<u32>, BridgeError> {
        match self.probe().await {
            HealthProbe::Healthy(info) => {
                let pid = info.owner_pid;
                let grace = self.inner.config.stop_grace();
                if !stop_process(self.inner.deps.platform.as_ref(), pid, grace).await {
                    return Err(BridgeError::StartupFailed(format!("bridge pid {pid} survived stop")));
                }
                self.clear_cached();
                Ok(Some(pid))
            }
            HealthProbe::Unreachable(_) => Ok(None),
            HealthProbe::Unexpected(detail) => {
                Err(BridgeError::PortOccupied { port: self.inner.config.preferred_port, detail })
            }
        }
    }

    fn ensure_live(&self) -> Result<(), BridgeError> {
        if self.inner.state.lock().disposed || self.inner.cancel.is_cancelled() {
            return Err(BridgeError::Disposed);
        }
        Ok(())
    }

    async fn ensure_resolved(&self) -> Result<ServiceReadyInfo, BridgeError> {
        let cached = self.inner.state.lock().info.clone();
        if let Some(info) = cached {
            if self.is_reachable(&info).await {
                return Ok(info);
            }
            tracing::info!(pid = info.owner_pid, "cached bridge is gone, resolving again");
            self.clear_cached_if(&info);
        }

        let _gate = self.inner.resolve_gate.lock().await;
        self.ensure_live()?;
        // Another caller may have resolved while this one waited.
        if let Some(info) = self.inner.state.lock().info.clone() {
            return Ok(info);
        }

        let info = tokio::select! {
            _ = self.inner.cancel.cancelled() => return Err(BridgeError::Disposed),
            result = self.resolve_service() => result?,
        };

        let mut state = self.inner.state.lock();
        if state.disposed {
            return Err(BridgeError::Disposed);
        }
        state.info = Some(info.clone());
        state.token = None;
        state.resolutions += 1;
        state.resolved_once = true;
        tracing::info!(
            pid = info.owner_pid,
            port = info.port,
            version = info.version.as_deref().unwrap_or("?"),
            "bridge resolved"
        );
        Ok(info)
    }

    async fn ensure_attached(&self, info: ServiceReadyInfo) -> Result<ServiceReadyInfo, BridgeError> {
        if self.inner.state.lock().token.is_some() {
            return self.current_info(info);
        }

        let _gate = self.inner.attach_gate.lock().await;
        self.ensure_live()?;
        if self.inner.state.lock().token.is_some() {
            return self.current_info(info);
        }

        let attach = self.inner.deps.control.attach(&info, &self.inner.client_id);
        let response = tokio::select! {
            _ = self.inner.cancel.cancelled() => return Err(BridgeError::Disposed),
            response = attach => response,
        };
        match response {
            Ok(response) => {
                let attached = {
                    let mut state = self.inner.state.lock();
                    if state.disposed {
                        return Err(BridgeError::Disposed);
                    }
                    let mut attached = state.info.clone().unwrap_or(info);
                    if let Some(ws_url) = response.ws_url {
                        attached.ws_url = ws_url;
                    }
                    if let Some(http_base_url) = response.http_base_url {
                        attached.http_base_url = http_base_url;
                    }
                    state.info = Some(attached.clone());
                    state.token = Some(response.token.clone());
                    attached
                };
                tracing::info!(pid = attached.owner_pid, client_id = %self.inner.client_id, "attached to bridge");
                self.start_heartbeat(&attached, response.token);
                Ok(attached)
            }
            Err(e) => {
                tracing::warn!(pid = info.owner_pid, error = %e, "bridge attach failed");
                self.clear_cached_if(&info);
                Err(BridgeError::AttachFailed(e.to_string()))
            }
        }
    }

    fn current_info(&self, fallback: ServiceReadyInfo) -> Result<ServiceReadyInfo, BridgeError> {
        Ok(self.inner.state.lock().info.clone().unwrap_or(fallback))
    }

    async fn is_reachable(&self, info: &ServiceReadyInfo) -> bool {
        match self.inner.deps.control.health(info.port, self.inner.config.health_timeout()).await {
            HealthProbe::Healthy(live) => live.owner_pid == info.owner_pid,
            _ => false,
        }
    }

    /// Forget cached readiness when it still refers to `info`'s owner.
    fn clear_cached_if(&self, info: &ServiceReadyInfo) {
        let mut state = self.inner.state.lock();
        if state.info.as_ref().is_some_and(|cached| cached.owner_pid == info.owner_pid) {
            state.info = None;
            state.token = None;
        }
    }

    fn clear_cached(&self) {
        let mut state = self.inner.state.lock();
        state.info = None;
        state.token = None;
    }

    fn entry_name(&self) -> String {
        let config = &self.inner.config;
        let path = match &config.entry {
            Some(entry) => entry.clone(),
            None => Path::new(&config.program).to_path_buf(),
        };
        path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "../service_tests/mod.rs"]
mod tests;
