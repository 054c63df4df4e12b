// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI help output specs

use crate::prelude::*;

#[test]
fn help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn bridge_help_shows_subcommands() {
    cli()
        .args(&["bridge", "--help"])
        .passes()
        .stdout_has("status")
        .stdout_has("ensure")
        .stdout_has("stop");
}

#[test]
fn monitor_help_shows_options() {
    cli().args(&["monitor", "--help"]).passes().stdout_has("--port").stdout_has("--baud");
}

#[test]
fn version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has(env!("CARGO_PKG_VERSION"));
}

#[test]
fn bad_port_argument_is_rejected() {
    cli().args(&["monitor", "--port", "://COM3"]).exits_with(2).stderr_has("invalid port key");
}
