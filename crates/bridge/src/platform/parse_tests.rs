// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const NETSTAT: &str = "
Active Connections

  Proto  Local Address          Foreign Address        State           PID
  TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       1104
  TCP    127.0.0.1:55888        127.0.0.1:61234        ESTABLISHED     4412
  TCP    127.0.0.1:55888        0.0.0.0:0              LISTENING       4412
  TCP    127.0.0.1:558880       0.0.0.0:0              LISTENING       9999
  TCP    [::1]:55889            [::]:0                 LISTENING       5120
  UDP    0.0.0.0:55888          *:*                                    7777
";

#[yare::parameterized(
    ipv4_listener  = { 55888, Some(4412) },
    ipv6_listener  = { 55889, Some(5120) },
    no_listener    = { 55890, None },
    system_port    = { 135, Some(1104) },
)]
fn netstat_listener(port: u16, expected: Option<u32>) {
    assert_eq!(parse_netstat_listener(NETSTAT, port), expected);
}

#[test]
fn tasklist_lookup() {
    let output = "\"node.exe\",\"4412\",\"Console\",\"1\",\"52,140 K\"\r\n";
    assert!(parse_tasklist_has_pid(output, 4412));
    assert!(!parse_tasklist_has_pid(output, 441));
    assert!(!parse_tasklist_has_pid(
        "INFO: No tasks are running which match the specified criteria.",
        4412
    ));
}

#[yare::parameterized(
    plain        = { "node bridge.js --port 55888", &["node", "bridge.js", "--port", "55888"] },
    quoted_path  = { "\"C:\\Program Files\\node.exe\" \"C:\\ext dir\\bridge.js\"", &["C:\\Program Files\\node.exe", "C:\\ext dir\\bridge.js"] },
    empty_quotes = { "node \"\" x", &["node", "", "x"] },
    extra_space  = { "  a   b  ", &["a", "b"] },
)]
fn tokenize(line: &str, expected: &[&str]) {
    assert_eq!(tokenize_command_line(line), expected);
}
