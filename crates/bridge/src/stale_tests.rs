// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;

fn host() -> HostIdentity {
    HostIdentity {
        version: Some("2.0.0".to_string()),
        extension_path: Some(PathBuf::from("/ext/boardlab-2.0.0")),
        mode: None,
        commit: None,
    }
}

#[test]
fn parses_bridge_invocation() {
    let line = "node /ext/boardlab-1.0.0/dist/bridge.js --cli-path arduino-cli --port 55888 \
                --boardlab-version 1.0.0 --extension-path /ext/boardlab-1.0.0";
    assert_eq!(
        parse_invocation(line, "bridge.js"),
        Some(BridgeInvocation {
            port: Some(55888),
            version: Some("1.0.0".to_string()),
            extension_path: Some("/ext/boardlab-1.0.0".to_string()),
        })
    );
}

#[test]
fn parses_inline_values_and_quoted_windows_paths() {
    let line = r#""C:\Program Files\nodejs\node.exe" "C:\Users\me\.vscode\extensions\boardlab-1.0.0\dist\Bridge.JS" --port=55888 --boardlab-version=1.0.0"#;
    let invocation = parse_invocation(line, "bridge.js").unwrap();
    assert_eq!(invocation.port, Some(55888));
    assert_eq!(invocation.version.as_deref(), Some("1.0.0"));
}

#[test]
fn other_programs_are_not_bridges() {
    assert_eq!(parse_invocation("python -m http.server 55888", "bridge.js"), None);
    assert_eq!(parse_invocation("node /srv/app/server.js --port 55888", "bridge.js"), None);
}

#[yare::parameterized(
    older_version = { "node /x/bridge.js --port 55888 --boardlab-version 1.0.0 --extension-path /ext/boardlab-2.0.0", true },
    other_install = { "node /x/bridge.js --port 55888 --boardlab-version 2.0.0 --extension-path /ext/dev/boardlab", true },
    same_identity = { "node /x/bridge.js --port 55888 --boardlab-version 2.0.0 --extension-path /ext/boardlab-2.0.0/", false },
    other_port    = { "node /x/bridge.js --port 55999 --boardlab-version 1.0.0", false },
    no_identity   = { "node /x/bridge.js --port 55888", false },
    not_bridge    = { "node /x/server.js --port 55888 --boardlab-version 1.0.0", false },
)]
fn stale_bridge_detection(line: &str, expected: bool) {
    assert_eq!(is_stale_bridge(line, "bridge.js", 55888, &host()), expected);
}
