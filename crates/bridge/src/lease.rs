// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ownership lease: who last claimed the bridge, shared between hosts
//! through the state directory.
//!
//! Readers take a shared lock and writers an exclusive one on a sibling
//! `.lock` file, so a lease is never observed half-written.

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::LeaseError;
use crate::identity::{same_path, HostIdentity, IdentityStrictness};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipLease {
    pub owner_pid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_path: Option<String>,
    pub written_at_ms: u64,
    /// Written right after this host killed the previous owner.
    #[serde(default)]
    pub takeover: bool,
}

impl OwnershipLease {
    pub fn new(owner_pid: u32, identity: &HostIdentity, written_at_ms: u64, takeover: bool) -> Self {
        Self {
            owner_pid,
            version: identity.version.clone(),
            extension_path: identity.extension_path.as_ref().map(|p| p.display().to_string()),
            written_at_ms,
            takeover,
        }
    }

    /// Whether the lease was written by a host with `identity`.
    pub fn written_by(&self, identity: &HostIdentity, strictness: IdentityStrictness) -> bool {
        let version_ok = match (&self.version, &identity.version) {
            (Some(a), Some(b)) => a == b,
            _ => strictness == IdentityStrictness::Lenient,
        };
        let path_ok = match (&self.extension_path, &identity.extension_path) {
            (Some(a), Some(b)) => same_path(Path::new(a), b),
            _ => strictness == IdentityStrictness::Lenient,
        };
        version_ok && path_ok
    }

    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.written_at_ms)
    }
}

#[derive(Debug, Clone)]
pub struct LeaseStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl LeaseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_path = path.clone().into_os_string();
        lock_path.push(".lock");
        Self { path, lock_path: PathBuf::from(lock_path) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current lease, or `None` when no host has written one.
    pub fn read(&self) -> Result<Option<OwnershipLease>, LeaseError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let lock = self.open_lock()?;
        lock.lock_shared()?;
        let result = match std::fs::read_to_string(&self.path) {
            Ok(text) => serde_json::from_str(&text).map(Some).map_err(LeaseError::from),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        };
        let _ = lock.unlock();
        result
    }

    /// Replace the lease atomically (write to a temp file, then rename).
    pub fn write(&self, lease: &OwnershipLease) -> Result<(), LeaseError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;
        let result = self.write_locked(lease);
        let _ = lock.unlock();
        result
    }

    fn write_locked(&self, lease: &OwnershipLease) -> Result<(), LeaseError> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        let mut file = File::create(&tmp)?;
        file.write_all(serde_json::to_string_pretty(lease)?.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn open_lock(&self) -> Result<File, LeaseError> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(OpenOptions::new().read(true).write(true).create(true).truncate(false).open(&self.lock_path)?)
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
