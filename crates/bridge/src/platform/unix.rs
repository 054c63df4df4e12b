// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix process control via signals.

use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use super::{ProcessPlatform, TerminateMode};
use crate::error::PlatformError;

#[derive(Debug, Clone, Copy, Default)]
pub struct UnixPlatform;

#[async_trait]
impl ProcessPlatform for UnixPlatform {
    async fn find_process_owning_port(&self, _port: u16) -> Result<Option<u32>, PlatformError> {
        Err(PlatformError::Unsupported("port owner lookup"))
    }

    async fn command_line(&self, pid: u32) -> Result<Option<String>, PlatformError> {
        let path = format!("/proc/{pid}/cmdline");
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let line = bytes
                    .split(|b| *b == 0)
                    .filter(|arg| !arg.is_empty())
                    .map(|arg| String::from_utf8_lossy(arg).into_owned())
                    .collect::<Vec<_>>()
                    .join(" ");
                Ok(Some(line))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PlatformError::Command { command: path, reason: e.to_string() }),
        }
    }

    async fn terminate(&self, pid: u32, mode: TerminateMode) -> Result<(), PlatformError> {
        let signal = match mode {
            TerminateMode::Graceful => Signal::SIGTERM,
            TerminateMode::Force => Signal::SIGKILL,
        };
        kill(to_pid(pid)?, signal)
            .map_err(|e| PlatformError::Signal { pid, reason: e.to_string() })
    }

    async fn is_alive(&self, pid: u32) -> bool {
        match to_pid(pid) {
            Ok(pid) => kill(pid, None).is_ok(),
            Err(_) => false,
        }
    }
}

fn to_pid(pid: u32) -> Result<Pid, PlatformError> {
    let raw = i32::try_from(pid)
        .ok()
        .filter(|raw| *raw > 0)
        .ok_or(PlatformError::Signal { pid, reason: "invalid pid".to_string() })?;
    Ok(Pid::from_raw(raw))
}
