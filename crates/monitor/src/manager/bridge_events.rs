// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridge events: forwarded verbatim to clients, then applied to sessions
//! and caches.

use boardlab_core::{
    BridgeEvent, ClientNotification, Clock, Desired, DetectedPort, MonitorStarted, PauseReason,
    RunningMonitor,
};

use super::{Dispatch, Effects, ManagerState, MonitorManager};

impl<K: Clock> MonitorManager<K> {
    /// Apply an event pushed by the bridge.
    ///
    /// Actions it unblocks (an open after the port reappears) are
    /// dispatched here; their failures are recorded on the session.
    pub async fn handle_bridge_event(&self, event: BridgeEvent) {
        let at_ms = self.now_ms();
        let mut effects = Effects::default();
        {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return;
            }
            tracing::debug!(event = event.name(), port = ?event.port(), "bridge event");
            state.broadcast(&mut effects, ClientNotification::Bridge(event.clone()));
            self.apply_event(&mut state, event, at_ms, &mut effects);
        }
        if let Err(err) = self.complete(effects).await {
            tracing::debug!(error = %err, "dispatch after bridge event failed");
        }
    }

    fn apply_event(
        &self,
        state: &mut ManagerState,
        event: BridgeEvent,
        at_ms: u64,
        effects: &mut Effects,
    ) {
        match event {
            BridgeEvent::DetectedPortsChanged { ports } => {
                self.apply_detected_ports(state, ports, at_ms, effects);
            }
            BridgeEvent::MonitorSettingsChanged { settings } => {
                state.settings.insert(settings.protocol.clone(), settings);
            }
            BridgeEvent::BaudrateChanged { port, baudrate } => {
                state.baudrates.set(&port, baudrate.clone());
                if state.running.set_baudrate(&port, &baudrate) {
                    state.mark_running_changed(effects);
                }
                let key = port.key();
                if let Some(session) = state.sessions.get_mut(&key) {
                    session.set_baudrate(baudrate);
                    state.settle(&key, "baudrate-changed", None, at_ms, effects);
                }
            }
            BridgeEvent::MonitorPaused { port, reason } => {
                let key = port.key();
                if let Some(session) = state.sessions.get_mut(&key) {
                    session.mark_paused(reason.unwrap_or(PauseReason::Suspended));
                    state.settle(&key, "monitor-paused", None, at_ms, effects);
                }
            }
            BridgeEvent::MonitorResumed { port } => {
                let key = port.key();
                if let Some(session) = state.sessions.get_mut(&key) {
                    session.mark_resumed();
                    state.settle(&key, "monitor-resumed", None, at_ms, effects);
                }
            }
            BridgeEvent::MonitorStarted { port, monitor_session_id, baudrate, attempt_id } => {
                let key = port.key();
                let (accepted, unwanted) = match state.sessions.get_mut(&key) {
                    Some(session) => {
                        let accepted = session.mark_monitor_started(MonitorStarted {
                            monitor_session_id: monitor_session_id.clone(),
                            baudrate: baudrate.clone(),
                            attempt_id: attempt_id.clone(),
                        });
                        (accepted, session.desired() == Desired::Stopped)
                    }
                    None => {
                        let abandoned = attempt_id.is_some()
                            && state.abandoned.get(&key) == attempt_id.as_ref();
                        if abandoned {
                            state.abandoned.remove(&key);
                        }
                        (true, abandoned)
                    }
                };
                if !accepted {
                    tracing::debug!(%port, attempt_id = ?attempt_id, "ignoring stale monitor start");
                    return;
                }
                if let Some(baudrate) = &baudrate {
                    state.baudrates.set(&port, baudrate.clone());
                }
                let monitor = RunningMonitor { port: port.clone(), baudrate, monitor_session_id };
                if state.running.upsert(monitor) {
                    state.mark_running_changed(effects);
                }
                if state.physical.record(&port, true, at_ms).is_some() {
                    state.broadcast_physical(effects);
                }
                if unwanted {
                    // Nobody wants it any more; the stop raced the start.
                    effects.dispatch(Dispatch::Close { port: port.clone() }, None);
                }
                state.settle(&key, "monitor-started", None, at_ms, effects);
            }
            BridgeEvent::MonitorStopped { port } => {
                if state.running.remove(&port) {
                    state.mark_running_changed(effects);
                }
                let key = port.key();
                state.abandoned.remove(&key);
                if let Some(session) = state.sessions.get_mut(&key) {
                    session.mark_monitor_stopped();
                    state.settle(&key, "monitor-stopped", None, at_ms, effects);
                }
            }
            BridgeEvent::MonitorError { port, error, attempt_id } => {
                let key = port.key();
                let missing = error.is_missing_port();
                if attempt_id.is_some() && state.abandoned.get(&key) == attempt_id.as_ref() {
                    state.abandoned.remove(&key);
                    return;
                }
                let applied = state
                    .sessions
                    .get_mut(&key)
                    .is_some_and(|s| s.mark_open_error(error, attempt_id.as_ref()));
                if !applied {
                    return;
                }
                if state.running.remove(&port) {
                    state.mark_running_changed(effects);
                }
                if missing && state.physical.record(&port, false, at_ms).is_some() {
                    state.broadcast_physical(effects);
                }
                state.settle(&key, "open-error", None, at_ms, effects);
            }
        }
    }

    /// Apply a full detected-ports list to the physical registry and the
    /// affected sessions.
    pub(super) fn apply_detected_ports(
        &self,
        state: &mut ManagerState,
        ports: Vec<DetectedPort>,
        at_ms: u64,
        effects: &mut Effects,
    ) {
        let transitions =
            state.physical.apply_detected_ports(ports.iter().map(|p| &p.port), at_ms);
        state.detected_ports = ports;
        if transitions.is_empty() {
            return;
        }
        for transition in &transitions {
            let key = transition.port.key();
            let changed = state
                .sessions
                .get_mut(&key)
                .is_some_and(|session| session.mark_detected(transition.detected));
            if changed {
                let kind = if transition.detected { "port-detected" } else { "port-lost" };
                tracing::info!(port = %transition.port, detected = transition.detected, "port detection changed");
                state.settle(&key, kind, None, at_ms, effects);
            }
        }
        state.broadcast_physical(effects);
    }
}
