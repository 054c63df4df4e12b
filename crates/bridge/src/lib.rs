// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! boardlab-bridge: ownership of the machine-wide monitor bridge process.
//!
//! One bridge serves every editor window on the machine. This crate finds
//! it, launches it, takes it over from incompatible hosts, attaches to it
//! and keeps the attachment alive.

pub mod config;
pub mod control;
pub mod env;
pub mod error;
pub mod http;
pub mod identity;
pub mod launcher;
pub mod lease;
pub mod platform;
pub mod service;
pub mod stale;
pub mod stop;
pub mod takeover;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use config::{BridgeConfig, DEFAULT_BRIDGE_PORT};
pub use control::{
    BridgeControl, HealthProbe, HeartbeatOutcome, HttpBridgeControl, LoggingOptions,
    ServiceReadyInfo,
};
pub use error::{BridgeError, HttpError, LeaseError, PlatformError};
pub use identity::{HostIdentity, IdentityStrictness, InstalledIdentityResolver};
pub use launcher::{LaunchEvent, LaunchHandle, LaunchSpec, Launcher, ProcessLauncher};
pub use lease::{LeaseStore, OwnershipLease};
pub use platform::{ProcessPlatform, TerminateMode};
pub use service::{BridgeDeps, BridgeServiceClient, StaleHostNotice};
pub use takeover::{TakeoverDecision, TakeoverPolicy};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeBridgeControl, FakeLaunch, FakeLauncher, FakePlatform, StaticInstalledIdentity};
