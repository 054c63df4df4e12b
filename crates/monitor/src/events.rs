// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event pump: subscribes to the bridge WebSocket and feeds every bridge
//! event into the manager.

use boardlab_core::{BridgeEvent, Clock};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::manager::MonitorManager;

const CONNECT_ATTEMPTS: u32 = 10;
const CONNECT_RETRY: Duration = Duration::from_millis(500);

/// Parse one text frame. Frames that are not bridge events are skipped.
pub fn parse_bridge_event(text: &str) -> Option<BridgeEvent> {
    match serde_json::from_str(text) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unrecognized bridge frame");
            None
        }
    }
}

/// Run the pump until the bridge closes the stream or `cancel` fires.
pub fn spawn_event_pump<K: Clock>(
    ws_url: String,
    manager: MonitorManager<K>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(stream) = connect_ws(&ws_url, &cancel).await else {
            tracing::warn!(%ws_url, "event pump: connection failed");
            return;
        };
        tracing::info!(%ws_url, "event pump connected");
        let (_, mut read) = stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(event) = parse_bridge_event(&text) {
                                manager.handle_bridge_event(event).await;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "event pump: received close frame");
                            break;
                        }
                        None => {
                            tracing::info!("event pump: stream ended");
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "event pump: error");
                            break;
                        }
                        _ => {} // Ping/Pong/Binary
                    }
                }
                _ = cancel.cancelled() => {
                    break;
                }
            }
        }
    })
}

/// Connect, retrying while the bridge starts up.
async fn connect_ws(
    ws_url: &str,
    cancel: &CancellationToken,
) -> Option<WebSocketStream<MaybeTlsStream<TcpStream>>> {
    for attempt in 0..CONNECT_ATTEMPTS {
        if attempt > 0 {
            tokio::select! {
                _ = tokio::time::sleep(CONNECT_RETRY) => {}
                _ = cancel.cancelled() => return None,
            }
        }
        match tokio_tungstenite::connect_async(ws_url).await {
            Ok((stream, _)) => return Some(stream),
            Err(e) => tracing::debug!(attempt, error = %e, "event pump: connect failed"),
        }
    }
    None
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
