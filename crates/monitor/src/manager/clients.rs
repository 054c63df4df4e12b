// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client lifecycle and intents.

use boardlab_core::{Channel, ClientId, ClientNotification, Clock, Intent, PortIdentifier};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::Instrument;

use super::{ClientEntry, Dispatch, Effects, ManagerState, MonitorManager};
use crate::error::MonitorError;
use crate::participant::{MonitorParticipant, NullParticipant};
use crate::selection::{ConnectRequest, ConnectSnapshot, ExternalClientOptions, SelectionContext};
use crate::transport::BridgeState;

impl<K: Clock> MonitorManager<K> {
    /// Register a client that has no message channel (a task runner, the
    /// CLI) and bind it to `port`.
    pub async fn register_external_monitor_client(
        &self,
        client_id: ClientId,
        port: PortIdentifier,
        options: ExternalClientOptions,
    ) -> Result<(), MonitorError> {
        let at_ms = self.now_ms();
        let mut effects = Effects::default();
        {
            let mut state = self.inner.state.lock();
            Self::ensure_live(&state)?;
            let baudrate = options
                .baudrate
                .clone()
                .or_else(|| state.fallback_baudrate(&port, &self.inner.config));
            tracing::info!(
                client_id = %client_id,
                %port,
                baudrate = baudrate.as_deref(),
                auto_start = options.auto_start,
                "external monitor client registered"
            );
            state.clients.insert(
                client_id.clone(),
                ClientEntry {
                    participant: Arc::new(NullParticipant),
                    port: None,
                    channels: BTreeSet::from([Channel::Monitor]),
                    external: true,
                },
            );
            Self::apply_baudrate(&mut state, &port, baudrate.as_deref());
            state.bind_client(&client_id, &port, at_ms, &mut effects);
            if options.auto_start {
                state.session_mut(&port).intent_start(client_id.clone());
                state.settle(&port.key(), "intent-start", Some(&client_id), at_ms, &mut effects);
            }
        }
        self.complete(effects).await
    }

    pub async fn unregister_external_monitor_client(
        &self,
        client_id: &ClientId,
    ) -> Result<(), MonitorError> {
        self.handle_disconnect_monitor_client(client_id).await
    }

    /// Connect handshake: register the client, merge what the bridge
    /// reports, resolve the selection and reply with a snapshot.
    pub async fn handle_connect_monitor_client(
        &self,
        client_id: ClientId,
        participant: Arc<dyn MonitorParticipant>,
        request: ConnectRequest,
    ) -> Result<ConnectSnapshot, MonitorError> {
        let span = tracing::info_span!("connect_client", client_id = %client_id);
        async move {
            {
                let mut state = self.inner.state.lock();
                Self::ensure_live(&state)?;
                let channels = request.effective_channels();
                match state.clients.get_mut(&client_id) {
                    Some(client) => {
                        client.participant = participant;
                        client.channels = channels;
                    }
                    None => {
                        state.clients.insert(
                            client_id.clone(),
                            ClientEntry { participant, port: None, channels, external: false },
                        );
                    }
                }
            }

            let bridge = match self.transport().state().await {
                Ok(bridge) => bridge,
                Err(err) => {
                    tracing::warn!(error = %err, "bridge state unavailable");
                    let mut effects = Effects::default();
                    self.inner.state.lock().send_to(
                        &mut effects,
                        &client_id,
                        ClientNotification::Error { port: None, message: err.to_string() },
                    );
                    self.flush(&mut effects);
                    return Err(err);
                }
            };

            let at_ms = self.now_ms();
            let mut effects = Effects::default();
            let snapshot = {
                let mut state = self.inner.state.lock();
                Self::ensure_live(&state)?;
                self.merge_bridge_state(&mut state, bridge, at_ms, &mut effects);

                let running = state.running.list();
                let context = SelectionContext {
                    request: &request,
                    detected_ports: &state.detected_ports,
                    running_monitors: &running,
                };
                let selection = self.inner.deps.resolver.resolve(&context).map(|mut selection| {
                    if selection.baudrate.is_none() {
                        selection.baudrate =
                            state.fallback_baudrate(&selection.port, &self.inner.config);
                    }
                    selection
                });

                if let Some(selection) = &selection {
                    let port = &selection.port;
                    if let Some(baudrate) = selection.baudrate.as_deref() {
                        // The bridge may still report the baud rate it was
                        // started with; the client's choice wins.
                        if state.running.set_baudrate(port, baudrate) {
                            state.mark_running_changed(&mut effects);
                        }
                    }
                    Self::apply_baudrate(&mut state, port, selection.baudrate.as_deref());
                    state.bind_client(&client_id, port, at_ms, &mut effects);
                    if request.auto_start {
                        state.session_mut(port).intent_start(client_id.clone());
                        state.settle(&port.key(), "intent-start", Some(&client_id), at_ms, &mut effects);
                    }
                }

                tracing::info!(
                    port = ?selection.as_ref().map(|s| &s.port),
                    baudrate = selection.as_ref().and_then(|s| s.baudrate.as_deref()),
                    auto_start = request.auto_start,
                    "monitor client connected"
                );
                ConnectSnapshot {
                    detected_ports: state.detected_ports.clone(),
                    settings: state.settings.values().cloned().collect(),
                    running_monitors: state.running.list(),
                    physical_states: state.physical.snapshot(),
                    sessions: state.sessions.values().map(|s| s.snapshot()).collect(),
                    selection,
                }
            };
            // An auto-start failure is recorded on the session and reported
            // to the client; the handshake itself succeeded.
            if let Err(err) = self.complete(effects).await {
                tracing::debug!(error = %err, "auto-start failed during connect");
            }
            Ok(snapshot)
        }
        .instrument(span)
        .await
    }

    /// Remove a client. Unknown clients are ignored.
    pub async fn handle_disconnect_monitor_client(
        &self,
        client_id: &ClientId,
    ) -> Result<(), MonitorError> {
        let at_ms = self.now_ms();
        let mut effects = Effects::default();
        {
            let mut state = self.inner.state.lock();
            let Some(client) = state.clients.remove(client_id) else {
                tracing::debug!(client_id = %client_id, "disconnect for unknown client");
                return Ok(());
            };
            tracing::info!(
                client_id = %client_id,
                external = client.external,
                port = ?client.port,
                "monitor client disconnected"
            );
            if let Some(port) = &client.port {
                state.release_port(client_id, port, at_ms, &mut effects);
            }
        }
        self.complete(effects).await
    }

    /// Apply a client's start, stop or resume intent for `port`.
    ///
    /// Bridge failures are recorded on the session, reported to the client
    /// once and returned.
    pub async fn handle_intent(
        &self,
        client_id: &ClientId,
        intent: Intent,
        port: &PortIdentifier,
    ) -> Result<(), MonitorError> {
        let at_ms = self.now_ms();
        let mut effects = Effects::default();
        {
            let mut state = self.inner.state.lock();
            Self::ensure_live(&state)?;
            if !state.clients.contains_key(client_id) {
                return Err(MonitorError::UnknownClient(client_id.clone()));
            }
            tracing::info!(client_id = %client_id, %port, %intent, "monitor intent");
            state.bind_client(client_id, port, at_ms, &mut effects);
            let session = state.session_mut(port);
            let close = match intent {
                Intent::Start => {
                    session.intent_start(client_id.clone());
                    false
                }
                Intent::Stop => session.intent_stop(client_id),
                Intent::Resume => {
                    session.intent_resume(client_id.clone());
                    false
                }
            };
            if close {
                effects.dispatch(Dispatch::Close { port: port.clone() }, Some(client_id));
            }
            let kind = format!("intent-{intent}");
            state.settle(&port.key(), &kind, Some(client_id), at_ms, &mut effects);
        }
        self.complete(effects).await
    }

    /// Fold a bridge state report into the caches and sessions.
    fn merge_bridge_state(
        &self,
        state: &mut ManagerState,
        bridge: BridgeState,
        at_ms: u64,
        effects: &mut Effects,
    ) {
        for settings in bridge.settings {
            state.settings.insert(settings.protocol.clone(), settings);
        }
        for monitor in &bridge.running_monitors {
            if let Some(baudrate) = &monitor.baudrate {
                state.baudrates.set(&monitor.port, baudrate.clone());
            }
        }
        if state.running.replace_all(bridge.running_monitors) {
            state.mark_running_changed(effects);
        }
        self.apply_detected_ports(state, bridge.detected_ports, at_ms, effects);
    }

    /// Remember `baudrate` for the port and use it for the next open.
    fn apply_baudrate(state: &mut ManagerState, port: &PortIdentifier, baudrate: Option<&str>) {
        let Some(baudrate) = baudrate else {
            return;
        };
        state.baudrates.set(port, baudrate);
        state.session_mut(port).set_baudrate(baudrate);
    }
}
