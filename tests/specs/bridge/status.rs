// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `boardlab bridge status` specs

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn healthy_bridge_is_described() {
    let (port, server) = control_server(1, "200 OK", &health_body(4242));
    cli()
        .bridge_port(port)
        .args(&["bridge", "status"])
        .passes()
        .stdout_has(&format!("bridge pid 4242 on 127.0.0.1:{port}"))
        .stdout_has("version: 1.2.0");

    let requests = server.join().unwrap();
    assert!(requests[0].starts_with("POST /control/health"), "{}", requests[0]);
}

#[test]
fn healthy_bridge_as_json() {
    let (port, _server) = control_server(1, "200 OK", &health_body(4242));
    let output = cli().bridge_port(port).args(&["-o", "json", "bridge", "status"]).passes();

    let info: serde_json::Value = serde_json::from_str(output.stdout().trim()).unwrap();
    assert_eq!(info["ownerPid"], 4242);
    assert_eq!(info["port"], port);
    assert_eq!(info["mode"], "production");
}

#[test]
fn nothing_listening_exits_three() {
    cli()
        .bridge_port(closed_port())
        .args(&["bridge", "status"])
        .exits_with(3)
        .stderr_has("bridge not running");
}

#[test]
fn foreign_server_exits_two() {
    let (port, _server) = control_server(1, "404 Not Found", "nope");
    cli().bridge_port(port).args(&["bridge", "status"]).exits_with(2).stderr_has("occupied");
}
