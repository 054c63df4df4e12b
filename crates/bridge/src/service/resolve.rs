// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridge resolution: probe, version policy, launch and recovery.

use boardlab_core::Clock;
use tracing::Instrument;

use super::{BridgeServiceClient, StaleHostNotice};
use crate::control::{HealthProbe, ServiceReadyInfo};
use crate::error::BridgeError;
use crate::identity::{is_stale_host, HostIdentity};
use crate::launcher::{LaunchEvent, LaunchSpec};
use crate::lease::OwnershipLease;
use crate::stale::is_stale_bridge;
use crate::stop::stop_process;
use crate::takeover::{decision_signature, TakeoverDecision, TakeoverInput};

/// What the version policy made of a healthy bridge.
enum PolicyOutcome {
    /// Use this bridge.
    Adopt(ServiceReadyInfo),
    /// The previous owner was stopped; launch our own.
    Launch { takeover: bool },
}

impl<K: Clock> BridgeServiceClient<K> {
    /// Find or start a bridge on the preferred port.
    pub(super) async fn resolve_service(&self) -> Result<ServiceReadyInfo, BridgeError> {
        let port = self.inner.config.preferred_port;
        let span = tracing::info_span!("resolve_bridge", port);
        async move {
            let takeover = match self.probe().await {
                HealthProbe::Healthy(info) => match self.apply_version_policy(info).await? {
                    PolicyOutcome::Adopt(info) => return Ok(info),
                    PolicyOutcome::Launch { takeover } => takeover,
                },
                HealthProbe::Unexpected(detail) => {
                    tracing::warn!(port, %detail, "preferred port answers but is not the bridge");
                    return Err(BridgeError::PortOccupied { port, detail });
                }
                HealthProbe::Unreachable(reason) => {
                    tracing::debug!(port, %reason, "no bridge running");
                    false
                }
            };
            self.launch_with_recovery(takeover).await
        }
        .instrument(span)
        .await
    }

    async fn apply_version_policy(
        &self,
        running: ServiceReadyInfo,
    ) -> Result<PolicyOutcome, BridgeError> {
        let strictness = self.inner.config.identity_strictness;
        let host = &self.inner.host;
        if host.matches_info(&running, strictness) {
            self.write_lease(running.owner_pid, false);
            return Ok(PolicyOutcome::Adopt(running));
        }

        if let Some(installed) = self.installed_identity() {
            if is_stale_host(host, &installed, strictness) {
                return Ok(PolicyOutcome::Adopt(self.defer_to_installed(running, installed).await));
            }
        }

        let mut running = running;
        let mut bypass_cooldown = false;
        loop {
            let decision = self.decide(&running, bypass_cooldown);
            match decision {
                TakeoverDecision::Kill => {
                    self.take_over(&running).await?;
                    return Ok(PolicyOutcome::Launch { takeover: true });
                }
                TakeoverDecision::Retry => {
                    self.inner.state.lock().startup_retries_used += 1;
                    tokio::time::sleep(self.inner.config.retry_backoff()).await;
                    match self.probe().await {
                        HealthProbe::Healthy(info) if host.matches_info(&info, strictness) => {
                            self.write_lease(info.owner_pid, false);
                            return Ok(PolicyOutcome::Adopt(info));
                        }
                        HealthProbe::Healthy(info) => {
                            running = info;
                            bypass_cooldown = true;
                        }
                        HealthProbe::Unreachable(_) => {
                            return Ok(PolicyOutcome::Launch { takeover: false })
                        }
                        HealthProbe::Unexpected(detail) => {
                            let port = self.inner.config.preferred_port;
                            return Err(BridgeError::PortOccupied { port, detail });
                        }
                    }
                }
                TakeoverDecision::Skip(reason) => {
                    tracing::warn!(
                        pid = running.owner_pid,
                        %reason,
                        "using incompatible bridge without takeover"
                    );
                    return Ok(PolicyOutcome::Adopt(running));
                }
            }
        }
    }

    fn decide(&self, running: &ServiceReadyInfo, bypass_cooldown: bool) -> TakeoverDecision {
        let lease = match self.inner.lease.read() {
            Ok(lease) => lease,
            Err(e) => {
                tracing::warn!(path = %self.inner.lease.path().display(), error = %e, "ignoring unreadable ownership lease");
                None
            }
        };
        let now = self.inner.clock.now();
        let mut state = self.inner.state.lock();
        let input = TakeoverInput {
            running,
            host: &self.inner.host,
            lease: lease.as_ref(),
            now_ms: self.inner.clock.epoch_ms(),
            since_last_takeover: state.last_takeover.map(|at| now.saturating_duration_since(at)),
            startup_phase: !state.resolved_once,
            startup_retries_used: state.startup_retries_used,
            bypass_cooldown,
        };
        let decision = self.inner.policy.decide(&input);

        let signature = decision_signature(decision, running, &self.inner.host);
        if state.decisions.should_log(&signature, now) {
            tracing::info!(
                %decision,
                pid = running.owner_pid,
                running_version = running.version.as_deref().unwrap_or("?"),
                host = %self.inner.host.describe(),
                "bridge takeover decision"
            );
        } else {
            tracing::debug!(%decision, pid = running.owner_pid, "bridge takeover decision (repeat)");
        }
        decision
    }

    async fn take_over(&self, running: &ServiceReadyInfo) -> Result<(), BridgeError> {
        let pid = running.owner_pid;
        tracing::warn!(pid, running_version = running.version.as_deref().unwrap_or("?"), "taking over incompatible bridge");
        let grace = self.inner.config.stop_grace();
        if !stop_process(self.inner.deps.platform.as_ref(), pid, grace).await {
            return Err(BridgeError::StartupFailed(format!(
                "incompatible bridge pid {pid} could not be stopped"
            )));
        }
        self.inner.state.lock().last_takeover = Some(self.inner.clock.now());
        Ok(())
    }

    fn installed_identity(&self) -> Option<HostIdentity> {
        self.inner.deps.installed.as_ref()?.installed_identity(&self.inner.host)
    }

    /// This host is older than the install on disk: never take over. Wait
    /// for a bridge owned by the installed identity, else keep the running one.
    async fn defer_to_installed(
        &self,
        running: ServiceReadyInfo,
        installed: HostIdentity,
    ) -> ServiceReadyInfo {
        let strictness = self.inner.config.identity_strictness;
        self.notify_stale_host(&installed);
        if installed.matches_info(&running, strictness) {
            return running;
        }

        let interval = self.inner.config.startup_poll_interval();
        for _ in 0..self.inner.config.stale_host_wait_attempts {
            tokio::time::sleep(interval).await;
            if let HealthProbe::Healthy(info) = self.probe().await {
                if installed.matches_info(&info, strictness) {
                    tracing::info!(pid = info.owner_pid, "adopting bridge of installed version");
                    return info;
                }
            }
        }
        tracing::warn!(
            pid = running.owner_pid,
            installed = %installed.describe(),
            "no bridge for installed version appeared, keeping running bridge"
        );
        running
    }

    fn notify_stale_host(&self, installed: &HostIdentity) {
        {
            let mut state = self.inner.state.lock();
            // Before the first resolution the host is still starting up and
            // the user has nothing to reload yet.
            if !state.resolved_once || state.stale_notified {
                return;
            }
            state.stale_notified = true;
        }
        let notice = StaleHostNotice {
            host: self.inner.host.clone(),
            installed: installed.clone(),
            message: format!(
                "A newer BoardLab ({}) is installed. Reload the window to use it.",
                installed.version.as_deref().unwrap_or("unknown version")
            ),
        };
        tracing::warn!(installed = %installed.describe(), host = %self.inner.host.describe(), "host is stale");
        self.inner.stale_hub.emit(&notice);
    }

    async fn launch_with_recovery(&self, takeover: bool) -> Result<ServiceReadyInfo, BridgeError> {
        let mut exit_retry_used = false;
        let mut address_retry_used = false;
        loop {
            match self.launch_and_wait().await {
                Ok(info) => {
                    if self.inner.host.matches_info(&info, self.inner.config.identity_strictness) {
                        self.write_lease(info.owner_pid, takeover);
                    } else {
                        tracing::info!(pid = info.owner_pid, "another host's bridge won the startup race");
                    }
                    return Ok(info);
                }
                Err(BridgeError::StartupTimeout { exited_before_startup: true, .. })
                    if !exit_retry_used =>
                {
                    exit_retry_used = true;
                    tracing::info!("bridge exited before startup, retrying once");
                    tokio::time::sleep(self.inner.config.retry_backoff()).await;
                    if let Some(info) = self.probe_adoptable().await? {
                        return Ok(info);
                    }
                }
                Err(BridgeError::AddressInUse(port)) if !address_retry_used => {
                    address_retry_used = true;
                    tracing::warn!(port, "bridge port already in use, recovering");
                    if let Some(info) = self.probe_adoptable().await? {
                        return Ok(info);
                    }
                    if !self.recover_stale_process().await {
                        return Err(BridgeError::AddressInUse(port));
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Re-probe after a failed launch; adopt a bridge that appeared.
    async fn probe_adoptable(&self) -> Result<Option<ServiceReadyInfo>, BridgeError> {
        match self.probe().await {
            HealthProbe::Healthy(info) => match self.apply_version_policy(info).await? {
                PolicyOutcome::Adopt(info) => Ok(Some(info)),
                PolicyOutcome::Launch { .. } => Ok(None),
            },
            HealthProbe::Unreachable(_) => Ok(None),
            HealthProbe::Unexpected(detail) => {
                Err(BridgeError::PortOccupied { port: self.inner.config.preferred_port, detail })
            }
        }
    }

    async fn launch_and_wait(&self) -> Result<ServiceReadyInfo, BridgeError> {
        let config = &self.inner.config;
        let port = config.preferred_port;
        let spec = LaunchSpec::from_config(config);
        let mut handle = self.inner.deps.launcher.launch(&spec).await?;
        let launched_pid = handle.pid;
        let started = std::time::Instant::now();

        let mut exited = false;
        for attempt in 0..config.startup_attempts {
            if attempt > 0 {
                tokio::time::sleep(config.startup_poll_interval()).await;
            }
            while let Some(event) = handle.try_event() {
                match event {
                    LaunchEvent::AddressInUse(line) => {
                        tracing::warn!(pid = ?launched_pid, %line, "bridge reported address in use");
                        return Err(BridgeError::AddressInUse(port));
                    }
                    LaunchEvent::Exited { code: Some(code) } if code != 0 => {
                        return Err(BridgeError::StartupFailed(format!(
                            "bridge exited with code {code} before becoming healthy"
                        )));
                    }
                    LaunchEvent::Exited { code } => {
                        // Another host may have won the race for the port.
                        tracing::info!(pid = ?launched_pid, ?code, "bridge exited during startup, still polling");
                        exited = true;
                    }
                }
            }
            if let HealthProbe::Healthy(info) =
                self.inner.deps.control.health(port, config.health_timeout()).await
            {
                tracing::info!(
                    pid = info.owner_pid,
                    launched_pid = ?launched_pid,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "bridge healthy"
                );
                return Ok(info);
            }
        }
        Err(BridgeError::StartupTimeout {
            port,
            attempts: config.startup_attempts,
            exited_before_startup: exited,
        })
    }

    /// Terminate a stale bridge of this product holding the port.
    ///
    /// Returns false only when a stale bridge was found and outlived
    /// termination; relaunching into its port is pointless then.
    async fn recover_stale_process(&self) -> bool {
        let port = self.inner.config.preferred_port;
        let platform = self.inner.deps.platform.as_ref();
        let pid = match platform.find_process_owning_port(port).await {
            Ok(Some(pid)) => pid,
            Ok(None) => {
                tracing::info!(port, "no process found owning the bridge port");
                return true;
            }
            Err(e) => {
                tracing::debug!(port, error = %e, "stale process lookup unavailable");
                return true;
            }
        };
        let command_line = match platform.command_line(pid).await {
            Ok(Some(line)) => line,
            Ok(None) => return true,
            Err(e) => {
                tracing::debug!(pid, error = %e, "cannot read command line of port owner");
                return true;
            }
        };
        if !is_stale_bridge(&command_line, &self.entry_name(), port, &self.inner.host) {
            tracing::info!(pid, port, "port owner is not a stale bridge, leaving it alone");
            return true;
        }
        tracing::warn!(pid, port, "terminating stale bridge process");
        let stopped = stop_process(platform, pid, self.inner.config.stop_grace()).await;
        if !stopped {
            tracing::warn!(pid, port, "stale bridge survived termination");
        }
        stopped
    }

    fn write_lease(&self, owner_pid: u32, takeover: bool) {
        let lease =
            OwnershipLease::new(owner_pid, &self.inner.host, self.inner.clock.epoch_ms(), takeover);
        if let Err(e) = self.inner.lease.write(&lease) {
            tracing::warn!(path = %self.inner.lease.path().display(), error = %e, "failed to write ownership lease");
        }
    }
}
