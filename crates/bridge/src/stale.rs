// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recognizing a stale bridge process from its command line.
//!
//! A process is only killed when it is this bridge's launcher invocation,
//! for the same port, from a different install or version. Anything else
//! holding the port is left alone.

use std::path::Path;

use crate::identity::{normalize_path, HostIdentity};
use crate::platform::tokenize_command_line;

/// Fields parsed from a bridge command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeInvocation {
    pub port: Option<u16>,
    pub version: Option<String>,
    pub extension_path: Option<String>,
}

/// Parse `command_line` if it launches the bridge entry `entry_name`.
pub fn parse_invocation(command_line: &str, entry_name: &str) -> Option<BridgeInvocation> {
    let tokens = tokenize_command_line(command_line);
    let entry = entry_name.to_ascii_lowercase();
    let is_bridge = tokens.iter().any(|token| {
        let name = Path::new(&token.replace('\\', "/"))
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        name == entry
    });
    if !is_bridge {
        return None;
    }

    let mut invocation = BridgeInvocation::default();
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        let (flag, inline) = match token.split_once('=') {
            Some((flag, value)) => (flag, Some(value.to_string())),
            None => (token.as_str(), None),
        };
        let mut value = || inline.clone().or_else(|| iter.next().cloned());
        match flag {
            "--port" => invocation.port = value().and_then(|v| v.parse().ok()),
            "--boardlab-version" => invocation.version = value(),
            "--extension-path" => invocation.extension_path = value(),
            _ => {}
        }
    }
    Some(invocation)
}

/// Whether the process behind `command_line` is a stale bridge for `port`
/// that this host may terminate.
pub fn is_stale_bridge(
    command_line: &str,
    entry_name: &str,
    port: u16,
    host: &HostIdentity,
) -> bool {
    let Some(invocation) = parse_invocation(command_line, entry_name) else {
        return false;
    };
    if invocation.port != Some(port) {
        return false;
    }
    let version_differs = match (&invocation.version, &host.version) {
        (Some(theirs), Some(ours)) => theirs != ours,
        _ => false,
    };
    let path_differs = match (&invocation.extension_path, &host.extension_path) {
        (Some(theirs), Some(ours)) => {
            normalize_path(theirs) != normalize_path(&ours.to_string_lossy())
        }
        _ => false,
    };
    version_differs || path_differs
}

#[cfg(test)]
#[path = "stale_tests.rs"]
mod tests;
