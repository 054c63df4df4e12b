// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! boardlab-core: port sessions, state registries and message types shared
//! by the bridge client and the monitor manager.

pub mod macros;

pub mod clock;
pub mod id;
pub mod message;
pub mod port;
pub mod pubsub;
pub mod registry;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{AttemptId, ClientId};
pub use message::{
    BoardRef, BridgeEvent, Channel, ClientNotification, DetectedPort, Intent, MonitorSettings,
    RunningMonitor, TraceEvent,
};
pub use port::{port_key, PortIdentifier, PortKey};
pub use pubsub::{EventHub, Subscription};
pub use registry::{
    DetectionTransition, MonitorRuntimeState, PhysicalState, PhysicalStateRegistry,
    RuntimeStateChange, RuntimeStateRegistry,
};
pub use session::{
    Desired, MonitorStarted, OpenError, PauseReason, PortSession, SessionAction, SessionSnapshot,
    SessionStatus,
};
