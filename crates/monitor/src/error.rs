// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the monitor manager and its collaborators.

use boardlab_bridge::{BridgeError, HttpError};
use boardlab_core::{ClientId, OpenError};
use thiserror::Error;

/// Errors surfaced by [`crate::MonitorManager`] and [`crate::MonitorTransport`].
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("bridge request failed: {0}")]
    Http(#[from] HttpError),
    #[error("malformed bridge response: {0}")]
    Protocol(String),
    #[error("unknown client: {0}")]
    UnknownClient(ClientId),
    #[error("no monitor session for {0}")]
    UnknownPort(String),
    #[error("monitor manager disposed")]
    Disposed,
}

impl MonitorError {
    /// The error as the session records it.
    ///
    /// Bridge error responses carry a JSON [`OpenError`] body when they can;
    /// otherwise the status and body text are kept.
    pub fn to_open_error(&self) -> OpenError {
        match self {
            MonitorError::Http(HttpError::Status { status, body }) => {
                match serde_json::from_str::<OpenError>(body) {
                    Ok(mut error) => {
                        error.status.get_or_insert(*status);
                        error
                    }
                    Err(_) => OpenError::new(body.clone()).status(*status),
                }
            }
            other => OpenError::new(other.to_string()),
        }
    }
}

/// Delivery to a participant failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParticipantError {
    /// The participant went away; it will receive nothing more.
    #[error("participant closed")]
    Closed,
    #[error("participant rejected notification: {0}")]
    Rejected(String),
}

/// A trace sink failed to record an event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("trace sink closed")]
    Closed,
    #[error("trace write failed: {0}")]
    Write(String),
}
