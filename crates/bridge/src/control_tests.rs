// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::http::HttpResponse;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn ok(body: &str) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse { status: 200, body: body.to_string() })
}

#[test]
fn healthy_payload_becomes_info() {
    let body = r#"{"status":"ok","pid":4242,"version":"1.2.0","extensionPath":"/ext/boardlab-1.2.0","wsPath":"/ws"}"#;
    let HealthProbe::Healthy(info) = parse_health(55888, ok(body)) else {
        panic!("expected healthy");
    };
    assert_eq!(info.owner_pid, 4242);
    assert_eq!(info.port, 55888);
    assert_eq!(info.http_base_url, "http://127.0.0.1:55888");
    assert_eq!(info.ws_url, "ws://127.0.0.1:55888/ws");
    assert_eq!(info.version.as_deref(), Some("1.2.0"));
    assert_eq!(info.extension_path.as_deref(), Some("/ext/boardlab-1.2.0"));
}

#[yare::parameterized(
    not_json    = { "<html>hello</html>" },
    wrong_shape = { r#"{"hello":"world"}"# },
    not_ok      = { r#"{"status":"starting","pid":12}"# },
    zero_pid    = { r#"{"status":"ok","pid":0}"# },
)]
fn foreign_answers_are_unexpected(body: &str) {
    assert!(matches!(parse_health(55888, ok(body)), HealthProbe::Unexpected(_)));
}

#[test]
fn transport_failure_is_unreachable() {
    let refused = HttpError::Connect { addr: "127.0.0.1:1".into(), reason: "refused".into() };
    assert!(matches!(parse_health(1, Err(refused)), HealthProbe::Unreachable(_)));
    assert!(matches!(parse_health(1, Err(HttpError::Timeout(1500))), HealthProbe::Unreachable(_)));
}

#[test]
fn http_error_status_is_unexpected() {
    let status = HttpError::Status { status: 404, body: "Not Found".into() };
    assert!(matches!(parse_health(1, Err(status)), HealthProbe::Unexpected(_)));
}

#[test]
fn info_serializes_camel_case() {
    let info = ServiceReadyInfo::local(7, 55888).version("1.0.0");
    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["ownerPid"], 7);
    assert_eq!(json["wsUrl"], "ws://127.0.0.1:55888/events");
    assert_eq!(json["version"], "1.0.0");
    assert!(json.get("commit").is_none());
}

/// Serve one canned response per connection and return the request heads.
async fn canned_server(responses: Vec<&'static str>) -> (u16, tokio::task::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let task = tokio::spawn(async move {
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
    });
    (port, task)
}

#[tokio::test]
async fn heartbeat_maps_404_to_token_invalid() {
    let (port, server) = canned_server(vec![
        "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n{}",
        "HTTP/1.1 404 Not Found\r\nContent-Length: 13\r\n\r\nunknown token",
        "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\n\r\noops",
    ])
    .await;
    let control = HttpBridgeControl::default();
    let info = ServiceReadyInfo::local(1, port);

    assert_eq!(control.heartbeat(&info, "tok").await.unwrap(), HeartbeatOutcome::Alive);
    assert_eq!(control.heartbeat(&info, "tok").await.unwrap(), HeartbeatOutcome::TokenInvalid);
    assert_eq!(control.heartbeat(&info, "tok").await.unwrap_err().status(), Some(500));

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("POST /control/heartbeat HTTP/1.1"));
    assert!(requests[0].contains(r#"{"token":"tok"}"#));
}

#[tokio::test]
async fn attach_returns_token() {
    let (port, server) = canned_server(vec![
        "HTTP/1.1 200 OK\r\nContent-Length: 16\r\n\r\n{\"token\":\"abc1\"}",
    ])
    .await;
    let control = HttpBridgeControl::default();
    let info = ServiceReadyInfo::local(1, port);

    let response = control.attach(&info, "window-1").await.unwrap();
    assert_eq!(
        response,
        AttachResponse { token: "abc1".to_string(), ws_url: None, http_base_url: None }
    );
    let requests = server.await.unwrap();
    assert!(requests[0].contains(r#""clientId":"window-1""#));
}

#[test]
fn attach_response_reads_endpoint_overrides() {
    let response: AttachResponse = serde_json::from_str(
        r#"{"token":"t","wsUrl":"ws://127.0.0.1:9/ws","httpBaseUrl":"http://127.0.0.1:9"}"#,
    )
    .unwrap();
    assert_eq!(response.ws_url.as_deref(), Some("ws://127.0.0.1:9/ws"));
    assert_eq!(response.http_base_url.as_deref(), Some("http://127.0.0.1:9"));
}

#[tokio::test]
async fn health_against_closed_port_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let probe = HttpBridgeControl::default().health(port, Duration::from_millis(500)).await;
    assert!(matches!(probe, HealthProbe::Unreachable(_)), "{probe:?}");
}
