// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers: a CLI runner with an isolated state dir and canned
//! bridge control servers.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;

use assert_cmd::Command;
use tempfile::TempDir;

pub struct Cli {
    cmd: Command,
    _state: TempDir,
}

/// `boardlab` with its state dir pointed at a fresh temp dir.
pub fn cli() -> Cli {
    let state = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("boardlab").unwrap();
    cmd.env("BOARDLAB_STATE_DIR", state.path())
        .env("NO_COLOR", "1")
        .env_remove("COLOR")
        .env_remove("BOARDLAB_BRIDGE_PORT")
        .env_remove("BOARDLAB_LOG");
    Cli { cmd, _state: state }
}

impl Cli {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn bridge_port(self, port: u16) -> Self {
        let port = port.to_string();
        self.args(&["--bridge-port", &port])
    }

    pub fn passes(mut self) -> Output {
        let output = self.cmd.output().unwrap();
        assert!(output.status.success(), "expected success, got {:?}\n{}", output.status, stderr(&output));
        Output(output)
    }

    pub fn exits_with(mut self, code: i32) -> Output {
        let output = self.cmd.output().unwrap();
        assert_eq!(output.status.code(), Some(code), "stderr: {}", stderr(&output));
        Output(output)
    }
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub struct Output(std::process::Output);

impl Output {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.0.stdout).into_owned()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(needle), "stdout missing {needle:?}:\n{stdout}");
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        let stderr = stderr(&self.0);
        assert!(stderr.contains(needle), "stderr missing {needle:?}:\n{stderr}");
        self
    }
}

/// Loopback server answering `count` requests with `status` and `body`.
pub fn control_server(count: usize, status: &str, body: &str) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let handle = std::thread::spawn(move || {
        let mut requests = Vec::new();
        for _ in 0..count {
            let Ok((mut stream, _)) = listener.accept() else { break };
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).unwrap_or(0);
            requests.push(String::from_utf8_lossy(&buf[..n]).into_owned());
            let _ = stream.write_all(response.as_bytes());
        }
        requests
    });
    (port, handle)
}

/// Health answer of a bridge owned by `pid`.
pub fn health_body(pid: u32) -> String {
    format!(r#"{{"status":"ok","pid":{pid},"version":"1.2.0","mode":"production"}}"#)
}

/// A loopback port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
