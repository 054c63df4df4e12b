// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Windows process control via netstat, PowerShell and taskkill.

use async_trait::async_trait;
use std::process::Output;

use super::{parse_netstat_listener, parse_tasklist_has_pid, ProcessPlatform, TerminateMode};
use crate::error::PlatformError;

#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsPlatform;

async fn run(program: &str, args: &[&str]) -> Result<Output, PlatformError> {
    tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| PlatformError::Command { command: program.to_string(), reason: e.to_string() })
}

fn require_success(program: &str, output: &Output) -> Result<(), PlatformError> {
    if output.status.success() {
        return Ok(());
    }
    Err(PlatformError::Command {
        command: program.to_string(),
        reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

#[async_trait]
impl ProcessPlatform for WindowsPlatform {
    async fn find_process_owning_port(&self, port: u16) -> Result<Option<u32>, PlatformError> {
        let output = run("netstat", &["-ano", "-p", "TCP"]).await?;
        require_success("netstat", &output)?;
        Ok(parse_netstat_listener(&String::from_utf8_lossy(&output.stdout), port))
    }

    async fn command_line(&self, pid: u32) -> Result<Option<String>, PlatformError> {
        let query = format!(
            "(Get-CimInstance Win32_Process -Filter \"ProcessId={pid}\").CommandLine"
        );
        let output = run("powershell", &["-NoProfile", "-NonInteractive", "-Command", &query]).await?;
        require_success("powershell", &output)?;
        let line = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if line.is_empty() { None } else { Some(line) })
    }

    async fn terminate(&self, pid: u32, mode: TerminateMode) -> Result<(), PlatformError> {
        let pid_arg = pid.to_string();
        match mode {
            TerminateMode::Graceful => {
                let output = run("taskkill", &["/PID", &pid_arg, "/T"]).await?;
                require_success("taskkill", &output)
            }
            TerminateMode::Force => {
                let output = run("taskkill", &["/PID", &pid_arg, "/T", "/F"]).await?;
                if require_success("taskkill", &output).is_ok() {
                    return Ok(());
                }
                tracing::debug!(pid, "taskkill /F failed, falling back to Stop-Process");
                let command = format!("Stop-Process -Id {pid} -Force");
                let output =
                    run("powershell", &["-NoProfile", "-NonInteractive", "-Command", &command])
                        .await?;
                require_success("powershell", &output)
            }
        }
    }

    async fn is_alive(&self, pid: u32) -> bool {
        let filter = format!("PID eq {pid}");
        match run("tasklist", &["/FI", &filter, "/FO", "CSV", "/NH"]).await {
            Ok(output) => parse_tasklist_has_pid(&String::from_utf8_lossy(&output.stdout), pid),
            Err(_) => false,
        }
    }
}
