// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `boardlab bridge stop` specs

use crate::prelude::*;

#[test]
fn stop_without_bridge_is_a_no_op() {
    cli().bridge_port(closed_port()).args(&["bridge", "stop"]).passes().stdout_has("no bridge running");
}

#[test]
fn stop_without_bridge_as_json() {
    let output = cli().bridge_port(closed_port()).args(&["-o", "json", "bridge", "stop"]).passes();
    let report: serde_json::Value = serde_json::from_str(output.stdout().trim()).unwrap();
    assert_eq!(report["stopped"], false);
    assert!(report.get("pid").is_none());
}
