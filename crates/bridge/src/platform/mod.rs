// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OS process inspection and termination.

mod parse;
#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

pub use parse::{parse_netstat_listener, parse_tasklist_has_pid, tokenize_command_line};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::PlatformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateMode {
    /// SIGTERM / `taskkill /T`.
    Graceful,
    /// SIGKILL / `taskkill /T /F`, then `Stop-Process -Force`.
    Force,
}

#[async_trait]
pub trait ProcessPlatform: Send + Sync + 'static {
    /// PID listening on loopback `port`, if it can be determined.
    async fn find_process_owning_port(&self, port: u16) -> Result<Option<u32>, PlatformError>;

    /// Full command line of `pid`, if it is still running.
    async fn command_line(&self, pid: u32) -> Result<Option<String>, PlatformError>;

    async fn terminate(&self, pid: u32, mode: TerminateMode) -> Result<(), PlatformError>;

    async fn is_alive(&self, pid: u32) -> bool;
}

/// Platform implementation for the current OS.
pub fn native() -> Arc<dyn ProcessPlatform> {
    #[cfg(unix)]
    {
        Arc::new(unix::UnixPlatform)
    }
    #[cfg(windows)]
    {
        Arc::new(windows::WindowsPlatform)
    }
    #[cfg(not(any(unix, windows)))]
    {
        Arc::new(UnsupportedPlatform)
    }
}

/// Platform without process control; every lookup fails as unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedPlatform;

#[async_trait]
impl ProcessPlatform for UnsupportedPlatform {
    async fn find_process_owning_port(&self, _port: u16) -> Result<Option<u32>, PlatformError> {
        Err(PlatformError::Unsupported("port owner lookup"))
    }

    async fn command_line(&self, _pid: u32) -> Result<Option<String>, PlatformError> {
        Err(PlatformError::Unsupported("command line lookup"))
    }

    async fn terminate(&self, _pid: u32, _mode: TerminateMode) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("process termination"))
    }

    async fn is_alive(&self, _pid: u32) -> bool {
        false
    }
}
