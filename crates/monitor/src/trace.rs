// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trace sinks: where session trace events go besides the trace channel.

use async_trait::async_trait;
use boardlab_core::TraceEvent;
use std::sync::Arc;

use crate::error::TraceError;

/// Records trace events. Called from a spawned task; failures are logged
/// by the manager and never reach a client.
#[async_trait]
pub trait TraceSink: Send + Sync + 'static {
    async fn record(&self, event: TraceEvent) -> Result<(), TraceError>;
}

/// Writes trace events to the `boardlab::trace` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTraceSink;

#[async_trait]
impl TraceSink for TracingTraceSink {
    async fn record(&self, event: TraceEvent) -> Result<(), TraceError> {
        tracing::debug!(
            target: "boardlab::trace",
            kind = %event.kind,
            port = %event.port,
            client_id = event.client_id.as_ref().map(|c| c.as_str()),
            status = %event.session.status,
            desired = %event.session.desired,
            detected = event.session.detected,
            "session trace"
        );
        Ok(())
    }
}

/// Hand an event to `sink` without waiting for it.
pub(crate) fn dispatch(sink: &Arc<dyn TraceSink>, event: TraceEvent) {
    let sink = Arc::clone(sink);
    tokio::spawn(async move {
        let kind = event.kind.clone();
        if let Err(e) = sink.record(event).await {
            tracing::warn!(kind = %kind, error = %e, "trace sink failed");
        }
    });
}

#[cfg(any(test, feature = "test-support"))]
pub use recording::RecordingTraceSink;

#[cfg(any(test, feature = "test-support"))]
mod recording {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct SinkState {
        events: Vec<TraceEvent>,
        failing: bool,
    }

    /// Sink that keeps events in memory, or fails every write when told to.
    #[derive(Clone, Default)]
    pub struct RecordingTraceSink {
        inner: Arc<Mutex<SinkState>>,
    }

    impl RecordingTraceSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            let sink = Self::default();
            sink.inner.lock().failing = true;
            sink
        }

        pub fn events(&self) -> Vec<TraceEvent> {
            self.inner.lock().events.clone()
        }

        pub fn kinds(&self) -> Vec<String> {
            self.inner.lock().events.iter().map(|e| e.kind.clone()).collect()
        }
    }

    #[async_trait]
    impl TraceSink for RecordingTraceSink {
        async fn record(&self, event: TraceEvent) -> Result<(), TraceError> {
            let mut state = self.inner.lock();
            if state.failing {
                return Err(TraceError::Write("sink unavailable".to_string()));
            }
            state.events.push(event);
            Ok(())
        }
    }
}
