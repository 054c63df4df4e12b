// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error carrying a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! so `main()` decides how the process ends.

use std::fmt;

/// Exit codes beyond the generic failure (1).
pub mod codes {
    /// The preferred port answers, but not as a bridge.
    pub const PORT_OCCUPIED: i32 = 2;
    /// No bridge is running.
    pub const NOT_RUNNING: i32 = 3;
}

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Exit with `code` without printing anything more.
    pub fn silent(code: i32) -> Self {
        Self::new(code, "")
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}
