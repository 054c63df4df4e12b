// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor transport: the calls the manager makes on the bridge.
//!
//! The bridge answers synchronously with an acknowledgement only; outcomes
//! (started, error, paused) arrive later as bridge events.

use async_trait::async_trait;
use boardlab_bridge::{http, BridgeServiceClient};
use boardlab_core::{
    AttemptId, Clock, DetectedPort, MonitorSettings, PortIdentifier, RunningMonitor, SystemClock,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::MonitorError;

/// What the bridge reports about its monitors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeState {
    pub detected_ports: Vec<DetectedPort>,
    pub settings: Vec<MonitorSettings>,
    pub running_monitors: Vec<RunningMonitor>,
    /// Running monitors that are currently paused.
    pub paused_monitors: Vec<PortIdentifier>,
}

impl BridgeState {
    /// Running and not paused.
    pub fn is_running(&self, port: &PortIdentifier) -> bool {
        self.running_monitors.iter().any(|m| &m.port == port)
            && !self.paused_monitors.iter().any(|p| p == port)
    }
}

#[async_trait]
pub trait MonitorTransport: Send + Sync + 'static {
    async fn state(&self) -> Result<BridgeState, MonitorError>;
    async fn start(
        &self,
        port: &PortIdentifier,
        baudrate: Option<&str>,
        attempt_id: &AttemptId,
    ) -> Result<(), MonitorError>;
    async fn stop(&self, port: &PortIdentifier) -> Result<(), MonitorError>;
    async fn pause(&self, port: &PortIdentifier) -> Result<(), MonitorError>;
    async fn resume(&self, port: &PortIdentifier) -> Result<(), MonitorError>;
    async fn send(&self, port: &PortIdentifier, message: &str) -> Result<(), MonitorError>;
    /// Release transport resources. Default: nothing to release.
    async fn dispose(&self) {}
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PortRequest<'a> {
    port: &'a PortIdentifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    baudrate: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempt_id: Option<&'a AttemptId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl<'a> PortRequest<'a> {
    fn new(port: &'a PortIdentifier) -> Self {
        Self { port, baudrate: None, attempt_id: None, message: None }
    }
}

/// Transport over the bridge's HTTP monitor endpoints, resolving (and if
/// needed launching) the bridge through the service client on every call.
pub struct HttpMonitorTransport<K: Clock = SystemClock> {
    bridge: BridgeServiceClient<K>,
    timeout: Duration,
}

impl<K: Clock> HttpMonitorTransport<K> {
    pub fn new(bridge: BridgeServiceClient<K>, timeout: Duration) -> Self {
        Self { bridge, timeout }
    }

    pub fn bridge(&self) -> &BridgeServiceClient<K> {
        &self.bridge
    }

    async fn post(&self, path: &str, request: &PortRequest<'_>) -> Result<(), MonitorError> {
        let info = self.bridge.get_bridge_info().await?;
        let body = serde_json::to_string(request)
            .map_err(|e| MonitorError::Protocol(e.to_string()))?;
        http::post(&info.control_addr(), path, &body, self.timeout).await?;
        Ok(())
    }
}

#[async_trait]
impl<K: Clock> MonitorTransport for HttpMonitorTransport<K> {
    async fn state(&self) -> Result<BridgeState, MonitorError> {
        let info = self.bridge.get_bridge_info().await?;
        let response = http::get(&info.control_addr(), "/monitor/state", self.timeout).await?;
        serde_json::from_str(&response.body).map_err(|e| MonitorError::Protocol(e.to_string()))
    }

    async fn start(
        &self,
        port: &PortIdentifier,
        baudrate: Option<&str>,
        attempt_id: &AttemptId,
    ) -> Result<(), MonitorError> {
        let request =
            PortRequest { baudrate, attempt_id: Some(attempt_id), ..PortRequest::new(port) };
        self.post("/monitor/start", &request).await
    }

    async fn stop(&self, port: &PortIdentifier) -> Result<(), MonitorError> {
        self.post("/monitor/stop", &PortRequest::new(port)).await
    }

    async fn pause(&self, port: &PortIdentifier) -> Result<(), MonitorError> {
        self.post("/monitor/pause", &PortRequest::new(port)).await
    }

    async fn resume(&self, port: &PortIdentifier) -> Result<(), MonitorError> {
        self.post("/monitor/resume", &PortRequest::new(port)).await
    }

    async fn send(&self, port: &PortIdentifier, message: &str) -> Result<(), MonitorError> {
        let request = PortRequest { message: Some(message), ..PortRequest::new(port) };
        self.post("/monitor/send", &request).await
    }

    async fn dispose(&self) {
        self.bridge.dispose().await;
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTransport, TransportCall};

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use boardlab_bridge::HttpError;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// A call the manager made on the transport.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TransportCall {
        State,
        Start { port: PortIdentifier, baudrate: Option<String>, attempt_id: AttemptId },
        Stop(PortIdentifier),
        Pause(PortIdentifier),
        Resume(PortIdentifier),
        Send { port: PortIdentifier, message: String },
        Dispose,
    }

    #[derive(Default)]
    struct FakeState {
        bridge: BridgeState,
        calls: Vec<TransportCall>,
        fail_start: Option<HttpError>,
        fail_state: bool,
        /// Resume calls that are acknowledged without taking effect.
        ineffective_resumes: u32,
    }

    /// In-memory bridge. Start/stop/pause/resume update the reported state
    /// immediately; no bridge events are emitted.
    #[derive(Clone, Default)]
    pub struct FakeTransport {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_detected(&self, ports: &[PortIdentifier]) {
            self.inner.lock().bridge.detected_ports = ports
                .iter()
                .map(|port| DetectedPort { port: port.clone(), boards: Vec::new() })
                .collect();
        }

        pub fn set_settings(&self, settings: Vec<MonitorSettings>) {
            self.inner.lock().bridge.settings = settings;
        }

        pub fn set_running(&self, monitors: Vec<RunningMonitor>) {
            self.inner.lock().bridge.running_monitors = monitors;
        }

        /// Make the next start calls fail with `error` (None clears it).
        pub fn fail_start(&self, error: Option<HttpError>) {
            self.inner.lock().fail_start = error;
        }

        pub fn fail_state(&self, fail: bool) {
            self.inner.lock().fail_state = fail;
        }

        /// Acknowledge the next `n` resume calls without resuming.
        pub fn ineffective_resumes(&self, n: u32) {
            self.inner.lock().ineffective_resumes = n;
        }

        pub fn calls(&self) -> Vec<TransportCall> {
            self.inner.lock().calls.clone()
        }

        pub fn starts(&self) -> Vec<(PortIdentifier, Option<String>, AttemptId)> {
            self.inner
                .lock()
                .calls
                .iter()
                .filter_map(|c| match c {
                    TransportCall::Start { port, baudrate, attempt_id } => {
                        Some((port.clone(), baudrate.clone(), attempt_id.clone()))
                    }
                    _ => None,
                })
                .collect()
        }

        pub fn stops(&self) -> Vec<PortIdentifier> {
            self.inner
                .lock()
                .calls
                .iter()
                .filter_map(|c| match c {
                    TransportCall::Stop(port) => Some(port.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn count(&self, predicate: impl Fn(&TransportCall) -> bool) -> usize {
            self.inner.lock().calls.iter().filter(|c| predicate(c)).count()
        }

        pub fn bridge_state(&self) -> BridgeState {
            self.inner.lock().bridge.clone()
        }
    }

    #[async_trait]
    impl MonitorTransport for FakeTransport {
        async fn state(&self) -> Result<BridgeState, MonitorError> {
            let mut inner = self.inner.lock();
            inner.calls.push(TransportCall::State);
            if inner.fail_state {
                return Err(MonitorError::Http(HttpError::Connect {
                    addr: "fake".to_string(),
                    reason: "bridge unavailable".to_string(),
                }));
            }
            Ok(inner.bridge.clone())
        }

        async fn start(
            &self,
            port: &PortIdentifier,
            baudrate: Option<&str>,
            attempt_id: &AttemptId,
        ) -> Result<(), MonitorError> {
            let mut inner = self.inner.lock();
            inner.calls.push(TransportCall::Start {
                port: port.clone(),
                baudrate: baudrate.map(str::to_string),
                attempt_id: attempt_id.clone(),
            });
            if let Some(error) = inner.fail_start.clone() {
                return Err(MonitorError::Http(error));
            }
            inner.bridge.running_monitors.retain(|m| &m.port != port);
            inner.bridge.running_monitors.push(RunningMonitor {
                port: port.clone(),
                baudrate: baudrate.map(str::to_string),
                monitor_session_id: Some(format!("mon-{}", port.address)),
            });
            Ok(())
        }

        async fn stop(&self, port: &PortIdentifier) -> Result<(), MonitorError> {
            let mut inner = self.inner.lock();
            inner.calls.push(TransportCall::Stop(port.clone()));
            inner.bridge.running_monitors.retain(|m| &m.port != port);
            inner.bridge.paused_monitors.retain(|p| p != port);
            Ok(())
        }

        async fn pause(&self, port: &PortIdentifier) -> Result<(), MonitorError> {
            let mut inner = self.inner.lock();
            inner.calls.push(TransportCall::Pause(port.clone()));
            if !inner.bridge.paused_monitors.contains(port) {
                inner.bridge.paused_monitors.push(port.clone());
            }
            Ok(())
        }

        async fn resume(&self, port: &PortIdentifier) -> Result<(), MonitorError> {
            let mut inner = self.inner.lock();
            inner.calls.push(TransportCall::Resume(port.clone()));
            if inner.ineffective_resumes > 0 {
                inner.ineffective_resumes -= 1;
                return Ok(());
            }
            inner.bridge.paused_monitors.retain(|p| p != port);
            Ok(())
        }

        async fn send(&self, port: &PortIdentifier, message: &str) -> Result<(), MonitorError> {
            self.inner.lock().calls.push(TransportCall::Send {
                port: port.clone(),
                message: message.to_string(),
            });
            Ok(())
        }

        async fn dispose(&self) {
            self.inner.lock().calls.push(TransportCall::Dispose);
        }
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
