// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! boardlab-monitor: the per-host monitor manager.
//!
//! Owns one [`boardlab_core::PortSession`] per port, arbitrates between the
//! clients attached to it and drives the shared bridge through a
//! [`MonitorTransport`].

pub mod caches;
pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod participant;
pub mod selection;
pub mod trace;
pub mod transport;

pub use caches::{BaudrateCache, RunningMonitors};
pub use config::ManagerConfig;
pub use error::{MonitorError, ParticipantError, TraceError};
pub use events::{parse_bridge_event, spawn_event_pump};
pub use manager::{ManagerDeps, MonitorManager};
pub use participant::{ChannelParticipant, MonitorParticipant, NullParticipant};
pub use selection::{
    ConnectRequest, ConnectSnapshot, ExternalClientOptions, RequestedSelection, Selection,
    SelectionContext, SelectionResolver,
};
pub use trace::{TraceSink, TracingTraceSink};
pub use transport::{BridgeState, HttpMonitorTransport, MonitorTransport};

#[cfg(any(test, feature = "test-support"))]
pub use participant::RecordingParticipant;
#[cfg(any(test, feature = "test-support"))]
pub use trace::RecordingTraceSink;
#[cfg(any(test, feature = "test-support"))]
pub use transport::{FakeTransport, TransportCall};
