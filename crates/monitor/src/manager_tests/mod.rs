// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::participant::RecordingParticipant;
use crate::selection::{ConnectRequest, ConnectSnapshot, ExternalClientOptions};
use crate::trace::RecordingTraceSink;
use crate::transport::{FakeTransport, TransportCall};
use boardlab_core::test_support::{
    detected_ports_event, monitor_error_event, monitor_started_event, monitor_stopped_event,
};
use boardlab_core::{BridgeEvent, Desired, FakeClock, Intent, OpenError, PauseReason};

mod bridge_events;
mod clients;
mod scenarios;
mod suspend;
mod traces;

struct Harness {
    manager: MonitorManager<FakeClock>,
    transport: FakeTransport,
    sink: RecordingTraceSink,
}

fn harness() -> Harness {
    harness_with(ManagerConfig::default(), RecordingTraceSink::new())
}

fn harness_with(config: ManagerConfig, sink: RecordingTraceSink) -> Harness {
    let transport = FakeTransport::new();
    let deps = ManagerDeps::new(Arc::new(transport.clone())).trace_sink(Arc::new(sink.clone()));
    let manager = MonitorManager::new(config, deps, FakeClock::new());
    Harness { manager, transport, sink }
}

fn com3() -> PortIdentifier {
    PortIdentifier::serial("COM3")
}

fn com4() -> PortIdentifier {
    PortIdentifier::serial("COM4")
}

fn client(id: &str) -> ClientId {
    ClientId::from_string(id)
}

/// Let spawned trace tasks run.
async fn drain_traces() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

impl Harness {
    /// Connect `id` to `port` through the handshake.
    async fn connect(
        &self,
        id: &str,
        request: ConnectRequest,
    ) -> (RecordingParticipant, ConnectSnapshot) {
        let participant = RecordingParticipant::new();
        let snapshot = self
            .manager
            .handle_connect_monitor_client(client(id), Arc::new(participant.clone()), request)
            .await
            .unwrap();
        (participant, snapshot)
    }

    /// Connect `id` with auto-start on `port`, which the bridge reports as detected.
    async fn connect_started(&self, id: &str, port: &PortIdentifier) -> RecordingParticipant {
        self.transport.set_detected(std::slice::from_ref(port));
        let (participant, _) =
            self.connect(id, ConnectRequest::new().port(port.clone()).auto_start(true)).await;
        participant
    }

    /// Attempt id of the last open dispatched for `port`.
    fn last_attempt(&self, port: &PortIdentifier) -> AttemptId {
        self.transport
            .starts()
            .into_iter()
            .filter(|(p, _, _)| p == port)
            .map(|(_, _, attempt)| attempt)
            .next_back()
            .unwrap()
    }

    /// Acknowledge the pending open on `port` as the bridge would.
    async fn bridge_started(&self, port: &PortIdentifier, baudrate: Option<&str>) {
        let attempt = self.last_attempt(port);
        self.manager.handle_bridge_event(monitor_started_event(port, baudrate, Some(&attempt))).await;
    }

    fn session(&self, port: &PortIdentifier) -> SessionSnapshot {
        self.manager.session_snapshot(port).unwrap()
    }

    fn start_count(&self) -> usize {
        self.transport.count(|c| matches!(c, TransportCall::Start { .. }))
    }

    fn stop_count(&self) -> usize {
        self.transport.count(|c| matches!(c, TransportCall::Stop(_)))
    }
}
