// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor manager: the single owner of port sessions.
//!
//! Clients attach to ports and state intents; the bridge reports what
//! actually happened. Every session mutation settles in one critical
//! section: the next action is taken, the snapshot is broadcast (only when
//! it changed), a trace event is produced and the runtime state derived.
//! Deliveries, traces and bridge calls run after the lock is released.

mod bridge_events;
mod clients;
mod suspend;

use boardlab_core::{
    AttemptId, Channel, ClientId, ClientNotification, Clock, DetectedPort, MonitorRuntimeState,
    MonitorSettings, PhysicalStateRegistry, PortIdentifier, PortKey, PortSession,
    RunningMonitor, RuntimeStateChange, RuntimeStateRegistry, SessionAction, SessionSnapshot,
    EventHub, SessionStatus, Subscription, SystemClock, TraceEvent,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use crate::caches::{BaudrateCache, RunningMonitors};
use crate::config::ManagerConfig;
use crate::error::{MonitorError, ParticipantError};
use crate::participant::MonitorParticipant;
use crate::selection::{RequestedSelection, SelectionResolver};
use crate::trace::{self, TraceSink, TracingTraceSink};
use crate::transport::MonitorTransport;

/// Collaborators of a [`MonitorManager`].
#[derive(Clone)]
pub struct ManagerDeps {
    pub transport: Arc<dyn MonitorTransport>,
    pub resolver: Arc<dyn SelectionResolver>,
    pub trace_sink: Arc<dyn TraceSink>,
}

impl ManagerDeps {
    /// Default resolver and a sink that writes to `tracing`.
    pub fn new(transport: Arc<dyn MonitorTransport>) -> Self {
        Self {
            transport,
            resolver: Arc::new(RequestedSelection),
            trace_sink: Arc::new(TracingTraceSink),
        }
    }

    pub fn resolver(mut self, resolver: Arc<dyn SelectionResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace_sink = sink;
        self
    }
}

struct ClientEntry {
    participant: Arc<dyn MonitorParticipant>,
    port: Option<PortIdentifier>,
    channels: BTreeSet<Channel>,
    external: bool,
}

#[derive(Default)]
struct ManagerState {
    sessions: BTreeMap<PortKey, PortSession>,
    /// Last snapshot broadcast per session, for dedupe.
    last_broadcast: BTreeMap<PortKey, SessionSnapshot>,
    clients: BTreeMap<ClientId, ClientEntry>,
    physical: PhysicalStateRegistry,
    runtime: RuntimeStateRegistry,
    running: RunningMonitors,
    baudrates: BaudrateCache,
    settings: BTreeMap<String, MonitorSettings>,
    detected_ports: Vec<DetectedPort>,
    /// Opens still in flight for ports whose session was pruned.
    abandoned: BTreeMap<PortKey, AttemptId>,
    disposed: bool,
}

/// Bridge call decided under the lock, made after it is released.
#[derive(Debug, Clone)]
enum Dispatch {
    Open { port: PortIdentifier, attempt_id: AttemptId, baudrate: Option<String> },
    Resume { port: PortIdentifier },
    Close { port: PortIdentifier },
}

impl Dispatch {
    fn port(&self) -> &PortIdentifier {
        match self {
            Dispatch::Open { port, .. } | Dispatch::Resume { port } | Dispatch::Close { port } => {
                port
            }
        }
    }
}

impl From<SessionAction> for Dispatch {
    fn from(action: SessionAction) -> Self {
        match action {
            SessionAction::Open { port, attempt_id, baudrate } => {
                Dispatch::Open { port, attempt_id, baudrate }
            }
            SessionAction::Resume { port } => Dispatch::Resume { port },
        }
    }
}

struct PendingDispatch {
    dispatch: Dispatch,
    /// Client that caused it; bridge failures are reported to it.
    requester: Option<ClientId>,
}

struct Delivery {
    client_id: ClientId,
    participant: Arc<dyn MonitorParticipant>,
    notification: ClientNotification,
}

/// Side effects collected under the lock.
#[derive(Default)]
struct Effects {
    deliveries: Vec<Delivery>,
    traces: Vec<TraceEvent>,
    running_changed: bool,
    running: Vec<RunningMonitor>,
    runtime_changes: Vec<RuntimeStateChange>,
    dispatches: Vec<PendingDispatch>,
}

impl Effects {
    fn dispatch(&mut self, dispatch: Dispatch, requester: Option<&ClientId>) {
        self.dispatches.push(PendingDispatch { dispatch, requester: requester.cloned() });
    }
}

fn derive_runtime(session: &PortSession) -> MonitorRuntimeState {
    match session.status() {
        SessionStatus::Running => MonitorRuntimeState::Running,
        SessionStatus::Paused => MonitorRuntimeState::Suspended,
        _ if session.client_count() > 0 => MonitorRuntimeState::Connected,
        _ => MonitorRuntimeState::Disconnected,
    }
}

impl ManagerState {
    /// Queue `notification` for every client subscribed to its channel.
    fn broadcast(&self, effects: &mut Effects, notification: ClientNotification) {
        let channel = notification.channel();
        for (client_id, client) in &self.clients {
            if client.channels.contains(&channel) {
                effects.deliveries.push(Delivery {
                    client_id: client_id.clone(),
                    participant: Arc::clone(&client.participant),
                    notification: notification.clone(),
                });
            }
        }
    }

    fn send_to(&self, effects: &mut Effects, client_id: &ClientId, notification: ClientNotification) {
        if let Some(client) = self.clients.get(client_id) {
            effects.deliveries.push(Delivery {
                client_id: client_id.clone(),
                participant: Arc::clone(&client.participant),
                notification,
            });
        }
    }

    fn session_mut(&mut self, port: &PortIdentifier) -> &mut PortSession {
        let detected = self.physical.is_detected(port);
        let key = port.key();
        let abandoned = &mut self.abandoned;
        self.sessions.entry(key).or_insert_with_key(|key| {
            let mut session = PortSession::new(port.clone(), detected);
            if let Some(attempt) = abandoned.remove(key) {
                session.set_abandoned_attempt(attempt);
            }
            session
        })
    }

    /// Finish a mutation of the session at `key`.
    fn settle(
        &mut self,
        key: &PortKey,
        kind: &str,
        client_id: Option<&ClientId>,
        at_ms: u64,
        effects: &mut Effects,
    ) {
        let Some(session) = self.sessions.get_mut(key) else {
            return;
        };
        let action = session.next_action();
        let snapshot = session.snapshot();
        let runtime = derive_runtime(session);
        let prunable = session.is_prunable();
        let abandoned = session.abandoned_attempt_id().cloned();

        if let Some(action) = action {
            let dispatch = Dispatch::from(action);
            tracing::debug!(port = %key, ?dispatch, "session action");
            effects.dispatch(dispatch, client_id);
        }

        let trace = TraceEvent {
            at_ms,
            kind: kind.to_string(),
            port: snapshot.port.clone(),
            client_id: client_id.cloned(),
            session: snapshot.clone(),
        };
        self.broadcast(effects, ClientNotification::Trace(trace.clone()));
        effects.traces.push(trace);

        if self.last_broadcast.get(key) != Some(&snapshot) {
            self.broadcast(effects, ClientNotification::SessionState(snapshot.clone()));
            self.last_broadcast.insert(key.clone(), snapshot.clone());
        }

        if let Some(change) = self.runtime.set(&snapshot.port, runtime) {
            self.broadcast(effects, ClientNotification::RuntimeState(change.clone()));
            effects.runtime_changes.push(change);
        }

        if prunable {
            tracing::debug!(port = %key, "pruning idle session");
            self.sessions.remove(key);
            self.last_broadcast.remove(key);
            if let Some(attempt) = abandoned {
                self.abandoned.insert(key.clone(), attempt);
            }
        }
    }

    /// Point the client at `port`, leaving its previous port if different.
    fn bind_client(
        &mut self,
        client_id: &ClientId,
        port: &PortIdentifier,
        at_ms: u64,
        effects: &mut Effects,
    ) {
        let previous =
            self.clients.get_mut(client_id).and_then(|client| client.port.replace(port.clone()));
        if let Some(previous) = previous.filter(|previous| previous != port) {
            self.release_port(client_id, &previous, at_ms, effects);
        }
        if self.session_mut(port).attach_client(client_id.clone()) {
            self.settle(&port.key(), "client-attached", Some(client_id), at_ms, effects);
        }
    }

    /// Detach the client from the session on `port`.
    fn release_port(
        &mut self,
        client_id: &ClientId,
        port: &PortIdentifier,
        at_ms: u64,
        effects: &mut Effects,
    ) {
        let key = port.key();
        let Some(session) = self.sessions.get_mut(&key) else {
            return;
        };
        if session.detach_client(client_id) {
            effects.dispatch(Dispatch::Close { port: port.clone() }, None);
        }
        self.settle(&key, "client-detached", Some(client_id), at_ms, effects);
    }

    fn mark_running_changed(&mut self, effects: &mut Effects) {
        let running = self.running.list();
        effects.running_changed = true;
        effects.running = running.clone();
        self.broadcast(effects, ClientNotification::RunningMonitors(running));
    }

    fn broadcast_physical(&self, effects: &mut Effects) {
        self.broadcast(effects, ClientNotification::PhysicalState(self.physical.snapshot()));
    }

    /// Baud rate for `port` when the caller has none: cache, then protocol default.
    fn fallback_baudrate(&self, port: &PortIdentifier, config: &ManagerConfig) -> Option<String> {
        self.baudrates
            .get(port)
            .or_else(|| config.default_baudrate(&port.protocol))
            .map(str::to_string)
    }
}

struct Inner<K: Clock> {
    config: ManagerConfig,
    deps: ManagerDeps,
    clock: K,
    state: Mutex<ManagerState>,
    running_hub: EventHub<Vec<RunningMonitor>>,
    runtime_hub: EventHub<RuntimeStateChange>,
}

/// Handle to the monitor manager. Clones share all state.
pub struct MonitorManager<K: Clock = SystemClock> {
    inner: Arc<Inner<K>>,
}

impl<K: Clock> Clone for MonitorManager<K> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<K: Clock> MonitorManager<K> {
    pub fn new(config: ManagerConfig, deps: ManagerDeps, clock: K) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                deps,
                clock,
                state: Mutex::new(ManagerState::default()),
                running_hub: EventHub::new(),
                runtime_hub: EventHub::new(),
            }),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    fn now_ms(&self) -> u64 {
        self.inner.clock.epoch_ms()
    }

    fn transport(&self) -> &Arc<dyn MonitorTransport> {
        &self.inner.deps.transport
    }

    /// Deliver notifications, hand out traces and fire the hubs. Must be
    /// called without the state lock held.
    fn flush(&self, effects: &mut Effects) {
        for delivery in effects.deliveries.drain(..) {
            match delivery.participant.notify(&delivery.notification) {
                Ok(()) => {}
                Err(ParticipantError::Closed) => {
                    tracing::debug!(client_id = %delivery.client_id, "participant closed");
                }
                Err(e) => {
                    tracing::warn!(client_id = %delivery.client_id, error = %e, "notification failed");
                }
            }
        }
        for event in effects.traces.drain(..) {
            trace::dispatch(&self.inner.deps.trace_sink, event);
        }
        if std::mem::take(&mut effects.running_changed) {
            self.inner.running_hub.emit(&effects.running);
        }
        for change in effects.runtime_changes.drain(..) {
            self.inner.runtime_hub.emit(&change);
        }
    }

    /// Flush `effects` and make the queued bridge calls, including any the
    /// failures lead to. Returns the first error.
    async fn complete(&self, mut effects: Effects) -> Result<(), MonitorError> {
        self.flush(&mut effects);
        let mut queue: VecDeque<PendingDispatch> = effects.dispatches.drain(..).collect();
        let mut first_error = None;
        while let Some(pending) = queue.pop_front() {
            let Err(err) = self.run_dispatch(&pending.dispatch).await else {
                continue;
            };
            tracing::warn!(
                port = %pending.dispatch.port(),
                client_id = pending.requester.as_ref().map(|c| c.as_str()),
                error = %err,
                "bridge call failed"
            );
            let mut effects = self.record_failure(&pending, &err);
            self.flush(&mut effects);
            queue.extend(effects.dispatches.drain(..));
            first_error.get_or_insert(err);
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn run_dispatch(&self, dispatch: &Dispatch) -> Result<(), MonitorError> {
        let transport = self.transport();
        match dispatch {
            Dispatch::Open { port, attempt_id, baudrate } => {
                tracing::info!(%port, attempt_id = %attempt_id, baudrate = baudrate.as_deref(), "opening monitor");
                transport.start(port, baudrate.as_deref(), attempt_id).await
            }
            Dispatch::Resume { port } => {
                tracing::info!(%port, "resuming monitor");
                transport.resume(port).await
            }
            Dispatch::Close { port } => {
                tracing::info!(%port, "closing monitor");
                transport.stop(port).await
            }
        }
    }

    /// Apply a failed bridge call to the session and tell the requester.
    fn record_failure(&self, pending: &PendingDispatch, err: &MonitorError) -> Effects {
        let at_ms = self.now_ms();
        let mut effects = Effects::default();
        let mut state = self.inner.state.lock();
        let port = pending.dispatch.port();
        let key = port.key();

        let attempt = match &pending.dispatch {
            Dispatch::Open { attempt_id, .. } => Some(Some(attempt_id)),
            Dispatch::Resume { .. } => Some(None),
            Dispatch::Close { .. } => None,
        };
        if let Some(attempt) = attempt {
            let error = err.to_open_error();
            let missing = error.is_missing_port();
            let applied =
                state.sessions.get_mut(&key).is_some_and(|s| s.mark_open_error(error, attempt));
            if applied {
                if missing && state.physical.record(port, false, at_ms).is_some() {
                    state.broadcast_physical(&mut effects);
                }
                state.settle(&key, "open-error", pending.requester.as_ref(), at_ms, &mut effects);
            }
        }
        if let Some(client_id) = &pending.requester {
            state.send_to(
                &mut effects,
                client_id,
                ClientNotification::Error { port: Some(port.clone()), message: err.to_string() },
            );
        }
        effects
    }

    /// Called with every running-monitors list change.
    pub fn subscribe_running_monitors(
        &self,
        handler: impl Fn(&Vec<RunningMonitor>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.running_hub.subscribe(handler)
    }

    /// Called with every runtime state transition.
    pub fn subscribe_runtime_state(
        &self,
        handler: impl Fn(&RuntimeStateChange) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.runtime_hub.subscribe(handler)
    }

    pub fn session_snapshot(&self, port: &PortIdentifier) -> Option<SessionSnapshot> {
        self.inner.state.lock().sessions.get(port.key().as_str()).map(PortSession::snapshot)
    }

    pub fn sessions(&self) -> Vec<SessionSnapshot> {
        self.inner.state.lock().sessions.values().map(PortSession::snapshot).collect()
    }

    pub fn running_monitors(&self) -> Vec<RunningMonitor> {
        self.inner.state.lock().running.list()
    }

    pub fn cached_baudrate(&self, port: &PortIdentifier) -> Option<String> {
        self.inner.state.lock().baudrates.get(port).map(str::to_string)
    }

    pub fn runtime_state(&self, port: &PortIdentifier) -> MonitorRuntimeState {
        self.inner.state.lock().runtime.get(port)
    }

    pub fn client_count(&self) -> usize {
        self.inner.state.lock().clients.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    /// Drop every client and subscription and release the transport.
    /// Monitors keep running on the bridge; it closes them once this
    /// host's attachment lapses.
    pub async fn dispose(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.clients.clear();
        }
        self.inner.running_hub.clear();
        self.inner.runtime_hub.clear();
        self.transport().dispose().await;
        tracing::info!("monitor manager disposed");
    }

    fn ensure_live(state: &ManagerState) -> Result<(), MonitorError> {
        if state.disposed {
            return Err(MonitorError::Disposed);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../manager_tests/mod.rs"]
mod tests;
