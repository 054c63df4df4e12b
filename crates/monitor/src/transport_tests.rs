// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use boardlab_bridge::{
    BridgeConfig, BridgeDeps, FakeBridgeControl, FakeLauncher, FakePlatform, ServiceReadyInfo,
};
use boardlab_core::FakeClock;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve one canned response per connection and return the requests.
async fn canned_server(
    listener: TcpListener,
    responses: Vec<String>,
) -> tokio::task::JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut requests = Vec::new();
        for response in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = stream.read(&mut buf).await.unwrap();
            requests.push(String::from_utf8_lossy(&buf[..n]).into_owned());
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
        requests
    })
}

fn reply(status: &str, body: &str) -> String {
    format!("HTTP/1.1 {status}\r\nContent-Length: {}\r\n\r\n{body}", body.len())
}

/// Transport whose bridge already runs on `port` with a matching identity.
fn transport_for(port: u16, dir: &tempfile::TempDir) -> HttpMonitorTransport<FakeClock> {
    let config = BridgeConfig {
        state_dir: dir.path().to_path_buf(),
        preferred_port: port,
        heartbeat_interval_ms: 0,
        ..BridgeConfig::default()
    }
    .version("1.0.0")
    .extension_path("/ext/boardlab-1.0.0");
    let control = FakeBridgeControl::new();
    let platform = FakePlatform::new(control.clone());
    platform.add_process(4242, "node /ext/boardlab-1.0.0/dist/bridge.js");
    control.set_owner(
        ServiceReadyInfo::local(4242, port).version("1.0.0").extension_path("/ext/boardlab-1.0.0"),
    );
    let launcher = FakeLauncher::new(control.clone()).with_platform(platform.clone());
    let deps = BridgeDeps {
        control: Arc::new(control),
        launcher: Arc::new(launcher),
        platform: Arc::new(platform),
        installed: None,
    };
    let bridge = BridgeServiceClient::new(config, "window-1", deps, FakeClock::new());
    HttpMonitorTransport::new(bridge, Duration::from_secs(2))
}

#[tokio::test]
async fn start_posts_port_baud_and_attempt() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = canned_server(listener, vec![reply("200 OK", "{}")]).await;
    let dir = tempfile::tempdir().unwrap();
    let transport = transport_for(port, &dir);

    let attempt = AttemptId::from_string("att-1");
    transport.start(&PortIdentifier::serial("COM3"), Some("9600"), &attempt).await.unwrap();

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("POST /monitor/start HTTP/1.1"));
    assert!(requests[0].contains(
        r#"{"port":{"protocol":"serial","address":"COM3"},"baudrate":"9600","attemptId":"att-1"}"#
    ));
}

#[tokio::test]
async fn state_parses_bridge_report() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let body = r#"{"runningMonitors":[{"port":{"protocol":"serial","address":"COM3"},"baudrate":"115200"}]}"#;
    let server = canned_server(listener, vec![reply("200 OK", body)]).await;
    let dir = tempfile::tempdir().unwrap();
    let transport = transport_for(port, &dir);

    let state = transport.state().await.unwrap();
    assert!(state.detected_ports.is_empty());
    assert_eq!(state.running_monitors.len(), 1);
    assert_eq!(state.running_monitors[0].baudrate.as_deref(), Some("115200"));
    assert!(state.is_running(&PortIdentifier::serial("COM3")));

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("GET /monitor/state HTTP/1.1"));
}

#[tokio::test]
async fn error_status_keeps_open_error_body() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let body = r#"{"code":"ENOENT","message":"no such file"}"#;
    let server = canned_server(listener, vec![reply("500 Internal Server Error", body)]).await;
    let dir = tempfile::tempdir().unwrap();
    let transport = transport_for(port, &dir);

    let err = transport.stop(&PortIdentifier::serial("COM3")).await.unwrap_err();
    let open_error = err.to_open_error();
    assert_eq!(open_error.code.as_deref(), Some("ENOENT"));
    assert_eq!(open_error.status, Some(500));
    assert!(open_error.is_missing_port());
    server.await.unwrap();
}

#[test]
fn paused_monitor_is_not_running() {
    let port = PortIdentifier::serial("COM3");
    let state = BridgeState {
        running_monitors: vec![RunningMonitor {
            port: port.clone(),
            baudrate: None,
            monitor_session_id: None,
        }],
        paused_monitors: vec![port.clone()],
        ..BridgeState::default()
    };
    assert!(!state.is_running(&port));
}

#[tokio::test]
async fn fake_tracks_pause_and_ineffective_resumes() {
    let fake = FakeTransport::new();
    let port = PortIdentifier::serial("COM3");
    fake.start(&port, Some("9600"), &AttemptId::new()).await.unwrap();
    fake.pause(&port).await.unwrap();
    assert!(!fake.bridge_state().is_running(&port));

    fake.ineffective_resumes(1);
    fake.resume(&port).await.unwrap();
    assert!(!fake.bridge_state().is_running(&port));
    fake.resume(&port).await.unwrap();
    assert!(fake.bridge_state().is_running(&port));
    assert_eq!(fake.count(|c| matches!(c, TransportCall::Resume(_))), 2);
}
