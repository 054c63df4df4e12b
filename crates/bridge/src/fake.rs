// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory bridge, launcher and platform for tests.
//!
//! The three fakes are wired together the way the real world is: a
//! launched bridge becomes healthy on the fake control surface, and
//! terminating its pid on the fake platform takes it down again.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::control::{
    AttachResponse, BridgeControl, HealthProbe, HeartbeatOutcome, LoggingOptions,
    ServiceReadyInfo,
};
use crate::error::{BridgeError, HttpError, PlatformError};
use crate::identity::{HostIdentity, InstalledIdentityResolver};
use crate::launcher::{LaunchEvent, LaunchHandle, LaunchSpec, Launcher};
use crate::platform::{ProcessPlatform, TerminateMode};

// ── Control ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeBridgeState {
    owners: HashMap<u16, ServiceReadyInfo>,
    unexpected: HashMap<u16, String>,
    tokens: HashSet<String>,
    next_token: u32,
    health_calls: u32,
    attach_calls: u32,
    detached: Vec<String>,
    heartbeats: u32,
    logging: Vec<LoggingOptions>,
    attach_error: Option<HttpError>,
    heartbeat_error: Option<HttpError>,
    attach_urls: (Option<String>, Option<String>),
}

/// Fake bridge control surface keyed by port.
#[derive(Clone, Default)]
pub struct FakeBridgeControl {
    inner: Arc<Mutex<FakeBridgeState>>,
}

impl FakeBridgeControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `info` the healthy owner of its port.
    pub fn set_owner(&self, info: ServiceReadyInfo) {
        let mut state = self.inner.lock();
        state.unexpected.remove(&info.port);
        state.owners.insert(info.port, info);
    }

    pub fn owner(&self, port: u16) -> Option<ServiceReadyInfo> {
        self.inner.lock().owners.get(&port).cloned()
    }

    pub fn remove_owner(&self, port: u16) {
        self.inner.lock().owners.remove(&port);
    }

    /// Drop every port owned by `pid` (the process died).
    pub fn remove_pid(&self, pid: u32) {
        self.inner.lock().owners.retain(|_, info| info.owner_pid != pid);
    }

    /// Something that is not the bridge answers on `port`.
    pub fn set_unexpected(&self, port: u16, detail: &str) {
        let mut state = self.inner.lock();
        state.owners.remove(&port);
        state.unexpected.insert(port, detail.to_string());
    }

    /// Forget all issued tokens, as a restarted bridge would.
    pub fn revoke_tokens(&self) {
        self.inner.lock().tokens.clear();
    }

    pub fn fail_attach(&self, error: Option<HttpError>) {
        self.inner.lock().attach_error = error;
    }

    /// Endpoints reported by attach, as `(ws_url, http_base_url)`.
    pub fn set_attach_urls(&self, ws_url: Option<&str>, http_base_url: Option<&str>) {
        self.inner.lock().attach_urls =
            (ws_url.map(str::to_string), http_base_url.map(str::to_string));
    }

    pub fn fail_heartbeat(&self, error: Option<HttpError>) {
        self.inner.lock().heartbeat_error = error;
    }

    pub fn health_calls(&self) -> u32 {
        self.inner.lock().health_calls
    }

    pub fn attach_calls(&self) -> u32 {
        self.inner.lock().attach_calls
    }

    pub fn detached_tokens(&self) -> Vec<String> {
        self.inner.lock().detached.clone()
    }

    pub fn heartbeats(&self) -> u32 {
        self.inner.lock().heartbeats
    }

    pub fn logging_updates(&self) -> Vec<LoggingOptions> {
        self.inner.lock().logging.clone()
    }

    fn is_owner(&self, info: &ServiceReadyInfo) -> bool {
        self.inner
            .lock()
            .owners
            .get(&info.port)
            .is_some_and(|owner| owner.owner_pid == info.owner_pid)
    }
}

fn refused(info: &ServiceReadyInfo) -> HttpError {
    HttpError::Connect { addr: info.control_addr(), reason: "connection refused".to_string() }
}

#[async_trait]
impl BridgeControl for FakeBridgeControl {
    async fn health(&self, port: u16, _timeout: Duration) -> HealthProbe {
        let mut state = self.inner.lock();
        state.health_calls += 1;
        if let Some(detail) = state.unexpected.get(&port) {
            return HealthProbe::Unexpected(detail.clone());
        }
        match state.owners.get(&port) {
            Some(info) => HealthProbe::Healthy(info.clone()),
            None => HealthProbe::Unreachable("connection refused".to_string()),
        }
    }

    async fn attach(
        &self,
        info: &ServiceReadyInfo,
        _client_id: &str,
    ) -> Result<AttachResponse, HttpError> {
        if !self.is_owner(info) {
            return Err(refused(info));
        }
        let mut state = self.inner.lock();
        state.attach_calls += 1;
        if let Some(error) = state.attach_error.clone() {
            return Err(error);
        }
        state.next_token += 1;
        let token = format!("tok-{}", state.next_token);
        state.tokens.insert(token.clone());
        let (ws_url, http_base_url) = state.attach_urls.clone();
        Ok(AttachResponse { token, ws_url, http_base_url })
    }

    async fn detach(&self, info: &ServiceReadyInfo, token: &str) -> Result<(), HttpError> {
        if !self.is_owner(info) {
            return Err(refused(info));
        }
        let mut state = self.inner.lock();
        state.tokens.remove(token);
        state.detached.push(token.to_string());
        Ok(())
    }

    async fn heartbeat(
        &self,
        info: &ServiceReadyInfo,
        token: &str,
    ) -> Result<HeartbeatOutcome, HttpError> {
        if !self.is_owner(info) {
            return Err(refused(info));
        }
        let mut state = self.inner.lock();
        state.heartbeats += 1;
        if let Some(error) = state.heartbeat_error.clone() {
            return Err(error);
        }
        if state.tokens.contains(token) {
            Ok(HeartbeatOutcome::Alive)
        } else {
            Ok(HeartbeatOutcome::TokenInvalid)
        }
    }

    async fn update_logging(
        &self,
        info: &ServiceReadyInfo,
        options: &LoggingOptions,
    ) -> Result<(), HttpError> {
        if !self.is_owner(info) {
            return Err(refused(info));
        }
        self.inner.lock().logging.push(options.clone());
        Ok(())
    }
}

// ── Launcher ────────────────────────────────────────────────────────────

/// Scripted outcome of one fake launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeLaunch {
    /// Become healthy with the identity from the launch spec. Reports
    /// address-in-use instead when the port already has an owner.
    Serve,
    /// Print the address-in-use signature and exit with code 1.
    AddressInUse,
    /// Exit before becoming healthy.
    Exit(Option<i32>),
    /// Never become healthy.
    Silent,
}

struct FakeLauncherState {
    script: VecDeque<FakeLaunch>,
    launches: Vec<LaunchSpec>,
    next_pid: u32,
}

/// Fake launcher; unscripted launches default to [`FakeLaunch::Serve`].
#[derive(Clone)]
pub struct FakeLauncher {
    control: FakeBridgeControl,
    platform: Option<FakePlatform>,
    inner: Arc<Mutex<FakeLauncherState>>,
}

impl FakeLauncher {
    pub fn new(control: FakeBridgeControl) -> Self {
        Self {
            control,
            platform: None,
            inner: Arc::new(Mutex::new(FakeLauncherState {
                script: VecDeque::new(),
                launches: Vec::new(),
                next_pid: 1000,
            })),
        }
    }

    /// Register launched processes with `platform` so they can be stopped.
    pub fn with_platform(mut self, platform: FakePlatform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn push(&self, launch: FakeLaunch) {
        self.inner.lock().script.push_back(launch);
    }

    pub fn launches(&self) -> Vec<LaunchSpec> {
        self.inner.lock().launches.clone()
    }

    pub fn launch_count(&self) -> usize {
        self.inner.lock().launches.len()
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> Result<LaunchHandle, BridgeError> {
        let (outcome, pid) = {
            let mut state = self.inner.lock();
            state.launches.push(spec.clone());
            state.next_pid += 1;
            (state.script.pop_front().unwrap_or(FakeLaunch::Serve), state.next_pid)
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let port_taken = self.control.owner(spec.port).is_some();
        match outcome {
            FakeLaunch::Serve if !port_taken => {
                let mut info = ServiceReadyInfo::local(pid, spec.port);
                info.version = spec.version.clone();
                info.extension_path = spec.extension_path.as_ref().map(|p| p.display().to_string());
                info.mode = spec.mode.clone();
                if let Some(platform) = &self.platform {
                    let mut command_line = vec![spec.program.clone()];
                    command_line.extend(spec.args());
                    platform.add_process(pid, &command_line.join(" "));
                }
                self.control.set_owner(info);
            }
            FakeLaunch::Serve | FakeLaunch::AddressInUse => {
                let line = format!("Error: listen EADDRINUSE: address already in use 127.0.0.1:{}", spec.port);
                let _ = tx.send(LaunchEvent::AddressInUse(line));
                let _ = tx.send(LaunchEvent::Exited { code: Some(1) });
            }
            FakeLaunch::Exit(code) => {
                let _ = tx.send(LaunchEvent::Exited { code });
            }
            FakeLaunch::Silent => {}
        }
        Ok(LaunchHandle::new(Some(pid), rx))
    }
}

// ── Platform ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct FakeProcess {
    command_line: String,
    ignores_graceful: bool,
    unkillable: bool,
}

#[derive(Default)]
struct FakePlatformState {
    processes: HashMap<u32, FakeProcess>,
    port_owners: HashMap<u16, u32>,
    terminations: Vec<(u32, TerminateMode)>,
    lookup_unsupported: bool,
}

/// Fake process table. Terminating a pid also removes it from the linked
/// [`FakeBridgeControl`].
#[derive(Clone, Default)]
pub struct FakePlatform {
    control: Option<FakeBridgeControl>,
    inner: Arc<Mutex<FakePlatformState>>,
}

impl FakePlatform {
    pub fn new(control: FakeBridgeControl) -> Self {
        Self { control: Some(control), inner: Arc::default() }
    }

    pub fn add_process(&self, pid: u32, command_line: &str) {
        self.inner.lock().processes.insert(
            pid,
            FakeProcess {
                command_line: command_line.to_string(),
                ignores_graceful: false,
                unkillable: false,
            },
        );
    }

    /// The process survives SIGTERM / `taskkill` without `/F`.
    pub fn ignore_graceful(&self, pid: u32) {
        if let Some(process) = self.inner.lock().processes.get_mut(&pid) {
            process.ignores_graceful = true;
        }
    }

    /// The process survives every terminate.
    pub fn make_unkillable(&self, pid: u32) {
        if let Some(process) = self.inner.lock().processes.get_mut(&pid) {
            process.unkillable = true;
        }
    }

    pub fn set_port_owner(&self, port: u16, pid: u32) {
        self.inner.lock().port_owners.insert(port, pid);
    }

    pub fn set_lookup_unsupported(&self, unsupported: bool) {
        self.inner.lock().lookup_unsupported = unsupported;
    }

    pub fn terminations(&self) -> Vec<(u32, TerminateMode)> {
        self.inner.lock().terminations.clone()
    }

    pub fn alive(&self, pid: u32) -> bool {
        self.inner.lock().processes.contains_key(&pid)
    }
}

#[async_trait]
impl ProcessPlatform for FakePlatform {
    async fn find_process_owning_port(&self, port: u16) -> Result<Option<u32>, PlatformError> {
        let state = self.inner.lock();
        if state.lookup_unsupported {
            return Err(PlatformError::Unsupported("port owner lookup"));
        }
        Ok(state.port_owners.get(&port).copied())
    }

    async fn command_line(&self, pid: u32) -> Result<Option<String>, PlatformError> {
        Ok(self.inner.lock().processes.get(&pid).map(|p| p.command_line.clone()))
    }

    async fn terminate(&self, pid: u32, mode: TerminateMode) -> Result<(), PlatformError> {
        let killed = {
            let mut state = self.inner.lock();
            state.terminations.push((pid, mode));
            let Some(process) = state.processes.get(&pid) else {
                return Err(PlatformError::Signal { pid, reason: "no such process".to_string() });
            };
            if process.unkillable || (mode == TerminateMode::Graceful && process.ignores_graceful) {
                false
            } else {
                state.processes.remove(&pid);
                state.port_owners.retain(|_, owner| *owner != pid);
                true
            }
        };
        if killed {
            if let Some(control) = &self.control {
                control.remove_pid(pid);
            }
        }
        Ok(())
    }

    async fn is_alive(&self, pid: u32) -> bool {
        self.alive(pid)
    }
}

// ── Installed identity ─────────────────────────────────────────────────

/// Resolver returning a fixed installed identity.
#[derive(Debug, Clone, Default)]
pub struct StaticInstalledIdentity(pub Option<HostIdentity>);

impl InstalledIdentityResolver for StaticInstalledIdentity {
    fn installed_identity(&self, _host: &HostIdentity) -> Option<HostIdentity> {
        self.0.clone()
    }
}
