// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridge subprocess launch.
//!
//! The bridge outlives the host that spawned it, so the child is never
//! killed on drop. Its stdout and stderr are scanned line by line for the
//! address-in-use signature, and a reaper task reports the exit.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::BridgeConfig;
use crate::error::BridgeError;

const SCANNER_DRAIN: Duration = Duration::from_millis(500);

/// Command line of one bridge launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub entry: Option<PathBuf>,
    pub cli_path: String,
    pub port: u16,
    pub heartbeat_timeout_ms: i64,
    pub version: Option<String>,
    pub extension_path: Option<PathBuf>,
    pub mode: Option<String>,
    pub commit: Option<String>,
    pub log_heartbeat: bool,
}

impl LaunchSpec {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            program: config.program.clone(),
            entry: config.entry.clone(),
            cli_path: config.cli_path.clone(),
            port: config.preferred_port,
            heartbeat_timeout_ms: config.heartbeat_timeout_ms,
            version: config.version.clone(),
            extension_path: config.extension_path.clone(),
            mode: config.mode.clone(),
            commit: config.commit.clone(),
            log_heartbeat: config.log_heartbeat,
        }
    }

    /// Arguments after the program name.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(entry) = &self.entry {
            args.push(entry.display().to_string());
        }
        args.extend([
            "--cli-path".to_string(),
            self.cli_path.clone(),
            "--port".to_string(),
            self.port.to_string(),
            "--heartbeat-timeout-ms".to_string(),
            self.heartbeat_timeout_ms.to_string(),
        ]);
        if let Some(version) = &self.version {
            args.extend(["--boardlab-version".to_string(), version.clone()]);
        }
        if let Some(path) = &self.extension_path {
            args.extend(["--extension-path".to_string(), path.display().to_string()]);
        }
        if let Some(mode) = &self.mode {
            args.extend(["--bridge-mode".to_string(), mode.clone()]);
        }
        if let Some(commit) = &self.commit {
            args.extend(["--boardlab-commit".to_string(), commit.clone()]);
        }
        if self.log_heartbeat {
            args.push("--log-heartbeat".to_string());
        }
        args
    }
}

/// Something observed about a launched bridge before it became healthy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchEvent {
    /// Output line reporting the port is already bound.
    AddressInUse(String),
    /// The process exited; `None` when killed by a signal.
    Exited { code: Option<i32> },
}

/// A launched bridge process.
#[derive(Debug)]
pub struct LaunchHandle {
    pub pid: Option<u32>,
    events: mpsc::UnboundedReceiver<LaunchEvent>,
}

impl LaunchHandle {
    pub fn new(pid: Option<u32>, events: mpsc::UnboundedReceiver<LaunchEvent>) -> Self {
        Self { pid, events }
    }

    /// Next event reported so far, without waiting.
    pub fn try_event(&mut self) -> Option<LaunchEvent> {
        self.events.try_recv().ok()
    }
}

/// Starts bridge processes.
#[async_trait]
pub trait Launcher: Send + Sync + 'static {
    async fn launch(&self, spec: &LaunchSpec) -> Result<LaunchHandle, BridgeError>;
}

/// True for the EADDRINUSE signatures Node and the bridge print.
pub fn is_address_in_use(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.contains("address already in use") || lower.contains("eaddrinuse")
}

/// [`Launcher`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> Result<LaunchHandle, BridgeError> {
        let mut command = tokio::process::Command::new(&spec.program);
        command
            .args(spec.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);

        let mut child = command
            .spawn()
            .map_err(|e| BridgeError::Spawn(format!("{}: {}", spec.program, e)))?;
        let pid = child.id();
        tracing::info!(pid = ?pid, port = spec.port, program = %spec.program, "bridge process spawned");

        let (tx, rx) = mpsc::unbounded_channel();
        let mut scanners = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            scanners.push(tokio::spawn(scan_output(stdout, "stdout", tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            scanners.push(tokio::spawn(scan_output(stderr, "stderr", tx.clone())));
        }

        // Reaper task to prevent zombie processes
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => {
                    tracing::info!(pid = ?pid, %status, "bridge process exited");
                    // Output lines precede the exit event. Grandchildren may
                    // keep the pipes open, so the wait is bounded.
                    let drain = futures_util::future::join_all(scanners);
                    let _ = tokio::time::timeout(SCANNER_DRAIN, drain).await;
                    let _ = tx.send(LaunchEvent::Exited { code: status.code() });
                }
                Err(e) => {
                    tracing::error!(pid = ?pid, error = %e, "failed to wait on bridge process");
                }
            }
        });

        Ok(LaunchHandle::new(pid, rx))
    }
}

async fn scan_output<R: AsyncRead + Unpin>(
    stream: R,
    name: &'static str,
    tx: mpsc::UnboundedSender<LaunchEvent>,
) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(stream = name, %line, "bridge output");
        if is_address_in_use(&line) {
            let _ = tx.send(LaunchEvent::AddressInUse(line));
        }
    }
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
