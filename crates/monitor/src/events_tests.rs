// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::ManagerConfig;
use crate::manager::ManagerDeps;
use crate::transport::FakeTransport;
use boardlab_core::test_support::{detected_ports_event, monitor_started_event};
use boardlab_core::{FakeClock, PortIdentifier};
use futures_util::SinkExt;
use std::sync::Arc;
use tokio::net::TcpListener;

#[yare::parameterized(
    started = { r#"{"type":"monitorStarted","port":{"protocol":"serial","address":"COM3"},"baudrate":"9600"}"#, true },
    stopped = { r#"{"type":"monitorStopped","port":{"protocol":"serial","address":"COM3"}}"#, true },
    unknown = { r#"{"type":"heartbeat"}"#, false },
    garbage = { "not json", false },
)]
fn frames(text: &str, parses: bool) {
    assert_eq!(parse_bridge_event(text).is_some(), parses);
}

fn manager() -> MonitorManager<FakeClock> {
    let deps = ManagerDeps::new(Arc::new(FakeTransport::new()));
    MonitorManager::new(ManagerConfig::default(), deps, FakeClock::new())
}

/// Accept one client, send `frames`, then close.
async fn ws_server(frames: Vec<String>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/events", listener.local_addr().unwrap());
    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for frame in frames {
            ws.send(Message::text(frame)).await.unwrap();
        }
        ws.close(None).await.unwrap();
    });
    (url, task)
}

#[tokio::test]
async fn pump_feeds_events_until_close() {
    let port = PortIdentifier::serial("COM3");
    let frames = vec![
        serde_json::to_string(&detected_ports_event(std::slice::from_ref(&port))).unwrap(),
        "ignored".to_string(),
        serde_json::to_string(&monitor_started_event(&port, Some("115200"), None)).unwrap(),
    ];
    let (url, server) = ws_server(frames).await;
    let manager = manager();

    let pump = spawn_event_pump(url, manager.clone(), CancellationToken::new());
    tokio::time::timeout(Duration::from_secs(5), pump).await.unwrap().unwrap();
    server.await.unwrap();

    let running = manager.running_monitors();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].port, port);
    assert_eq!(manager.cached_baudrate(&port).as_deref(), Some("115200"));
}

#[tokio::test]
async fn cancel_stops_a_pump_that_cannot_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/events", listener.local_addr().unwrap());
    drop(listener);

    let cancel = CancellationToken::new();
    let pump = spawn_event_pump(url, manager(), cancel.clone());
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), pump).await.unwrap().unwrap();
}
