// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use boardlab_core::PortIdentifier;

fn error(message: &str) -> ClientNotification {
    ClientNotification::Error { port: Some(PortIdentifier::serial("COM3")), message: message.into() }
}

#[test]
fn channel_participant_forwards_until_receiver_drops() {
    let (participant, mut rx) = ChannelParticipant::new();
    participant.notify(&error("one")).unwrap();
    assert_eq!(rx.try_recv().unwrap(), error("one"));

    drop(rx);
    assert_eq!(participant.notify(&error("two")), Err(ParticipantError::Closed));
}

#[test]
fn recording_participant_filters() {
    let participant = RecordingParticipant::new();
    participant.notify(&error("boom")).unwrap();
    assert_eq!(participant.errors(), vec!["boom".to_string()]);
    assert!(participant.bridge_events().is_empty());

    participant.close();
    assert_eq!(participant.notify(&error("late")), Err(ParticipantError::Closed));
    assert_eq!(participant.received().len(), 1);
}
