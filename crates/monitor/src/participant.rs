// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Participants: whatever receives notifications for a connected client
//! (a webview message port, an external process, the CLI).

use boardlab_core::ClientNotification;
use tokio::sync::mpsc;

use crate::error::ParticipantError;

/// Receives notifications for one client.
///
/// Called without any manager lock held; implementations must not block.
pub trait MonitorParticipant: Send + Sync + 'static {
    fn notify(&self, notification: &ClientNotification) -> Result<(), ParticipantError>;
}

/// Participant backed by an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelParticipant {
    tx: mpsc::UnboundedSender<ClientNotification>,
}

impl ChannelParticipant {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MonitorParticipant for ChannelParticipant {
    fn notify(&self, notification: &ClientNotification) -> Result<(), ParticipantError> {
        self.tx.send(notification.clone()).map_err(|_| ParticipantError::Closed)
    }
}

/// Participant for clients that only drive intents and read state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullParticipant;

impl MonitorParticipant for NullParticipant {
    fn notify(&self, _notification: &ClientNotification) -> Result<(), ParticipantError> {
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use recording::RecordingParticipant;

#[cfg(any(test, feature = "test-support"))]
mod recording {
    use super::*;
    use boardlab_core::{BridgeEvent, PortIdentifier, SessionSnapshot};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingState {
        received: Vec<ClientNotification>,
        closed: bool,
    }

    /// Participant that records everything it receives.
    #[derive(Clone, Default)]
    pub struct RecordingParticipant {
        inner: Arc<Mutex<RecordingState>>,
    }

    impl RecordingParticipant {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn received(&self) -> Vec<ClientNotification> {
            self.inner.lock().received.clone()
        }

        pub fn clear(&self) {
            self.inner.lock().received.clear();
        }

        /// Make further deliveries fail with [`ParticipantError::Closed`].
        pub fn close(&self) {
            self.inner.lock().closed = true;
        }

        /// Session snapshots received for `port`, in order.
        pub fn session_states(&self, port: &PortIdentifier) -> Vec<SessionSnapshot> {
            self.inner
                .lock()
                .received
                .iter()
                .filter_map(|n| match n {
                    ClientNotification::SessionState(s) if &s.port == port => Some(s.clone()),
                    _ => None,
                })
                .collect()
        }

        /// Bridge events forwarded verbatim.
        pub fn bridge_events(&self) -> Vec<BridgeEvent> {
            self.inner
                .lock()
                .received
                .iter()
                .filter_map(|n| match n {
                    ClientNotification::Bridge(event) => Some(event.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn errors(&self) -> Vec<String> {
            self.inner
                .lock()
                .received
                .iter()
                .filter_map(|n| match n {
                    ClientNotification::Error { message, .. } => Some(message.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn count(&self, predicate: impl Fn(&ClientNotification) -> bool) -> usize {
            self.inner.lock().received.iter().filter(|n| predicate(n)).count()
        }
    }

    impl MonitorParticipant for RecordingParticipant {
        fn notify(&self, notification: &ClientNotification) -> Result<(), ParticipantError> {
            let mut state = self.inner.lock();
            if state.closed {
                return Err(ParticipantError::Closed);
            }
            state.received.push(notification.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "participant_tests.rs"]
mod tests;
