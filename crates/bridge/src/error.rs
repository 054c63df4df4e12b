// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for bridge resolution and control.

use thiserror::Error;

/// Errors from the raw HTTP client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    #[error("connect to {addr} failed: {reason}")]
    Connect { addr: String, reason: String },
    #[error("HTTP request timed out after {0}ms")]
    Timeout(u64),
    #[error("HTTP I/O failed: {0}")]
    Io(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl HttpError {
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the peer could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, HttpError::Connect { .. } | HttpError::Timeout(_) | HttpError::Io(_))
    }
}

/// Errors from OS process inspection and termination.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("not supported on this platform: {0}")]
    Unsupported(&'static str),
    #[error("{command} failed: {reason}")]
    Command { command: String, reason: String },
    #[error("signal to pid {pid} failed: {reason}")]
    Signal { pid: u32, reason: String },
}

/// Errors from the ownership lease store.
#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("lease I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("lease file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Errors surfaced by [`crate::BridgeServiceClient`].
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Something that is not the monitor bridge answers on the port.
    #[error("port {port} is occupied by another application: {detail}")]
    PortOccupied { port: u16, detail: String },
    #[error("bridge failed to start: {0}")]
    StartupFailed(String),
    #[error("bridge did not become healthy on port {port} after {attempts} probes")]
    StartupTimeout { port: u16, attempts: u32, exited_before_startup: bool },
    #[error("port {0} is already in use")]
    AddressInUse(u16),
    #[error("attach failed: {0}")]
    AttachFailed(String),
    #[error("failed to spawn bridge: {0}")]
    Spawn(String),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("bridge client disposed")]
    Disposed,
    #[error(transparent)]
    Lease(#[from] LeaseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BridgeError {
    pub fn is_port_occupied(&self) -> bool {
        matches!(self, BridgeError::PortOccupied { .. })
    }

    /// Actionable text for the user when the preferred port is taken.
    pub fn occupancy_message(&self) -> Option<String> {
        match self {
            BridgeError::PortOccupied { port, .. } => Some(format!(
                "Port {port} is used by another application. Stop it or set \
                 BOARDLAB_BRIDGE_PORT to a free port, then reload."
            )),
            _ => None,
        }
    }
}
