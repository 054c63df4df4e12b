// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host identity (version + install path) and compatibility rules.
//!
//! Two hosts are compatible when they run the same version from the same
//! install path. An editor window that keeps running after its extension
//! was upgraded on disk is *stale*: it must not take the bridge away from
//! the upgraded install.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::control::ServiceReadyInfo;
use crate::error::BridgeError;

/// How identity fields missing on one side are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStrictness {
    /// Compare only the fields both sides report.
    #[default]
    Lenient,
    /// Both version and install path must be reported and equal.
    Strict,
}

boardlab_core::simple_display! {
    IdentityStrictness {
        Lenient => "lenient",
        Strict => "strict",
    }
}

impl FromStr for IdentityStrictness {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" | "" => Ok(IdentityStrictness::Lenient),
            "strict" => Ok(IdentityStrictness::Strict),
            other => Err(BridgeError::Config(format!(
                "identity strictness must be lenient or strict, got {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostIdentity {
    pub version: Option<String>,
    pub extension_path: Option<PathBuf>,
    pub mode: Option<String>,
    pub commit: Option<String>,
}

impl HostIdentity {
    /// Whether the bridge described by `info` belongs to this identity.
    pub fn matches_info(&self, info: &ServiceReadyInfo, strictness: IdentityStrictness) -> bool {
        let info_path = info.extension_path.as_deref().map(Path::new);
        field_matches(self.version.as_deref(), info.version.as_deref(), strictness)
            && path_matches(self.extension_path.as_deref(), info_path, strictness)
    }

    pub fn matches(&self, other: &HostIdentity, strictness: IdentityStrictness) -> bool {
        field_matches(self.version.as_deref(), other.version.as_deref(), strictness)
            && path_matches(
                self.extension_path.as_deref(),
                other.extension_path.as_deref(),
                strictness,
            )
    }

    /// `version@path` for log lines.
    pub fn describe(&self) -> String {
        format!(
            "{}@{}",
            self.version.as_deref().unwrap_or("?"),
            self.extension_path.as_deref().map(|p| p.display().to_string()).unwrap_or_default()
        )
    }
}

fn field_matches(ours: Option<&str>, theirs: Option<&str>, strictness: IdentityStrictness) -> bool {
    match (ours, theirs) {
        (Some(a), Some(b)) => a == b,
        _ => strictness == IdentityStrictness::Lenient,
    }
}

fn path_matches(ours: Option<&Path>, theirs: Option<&Path>, strictness: IdentityStrictness) -> bool {
    match (ours, theirs) {
        (Some(a), Some(b)) => same_path(a, b),
        _ => strictness == IdentityStrictness::Lenient,
    }
}

pub fn same_path(a: &Path, b: &Path) -> bool {
    normalize_path(&a.to_string_lossy()) == normalize_path(&b.to_string_lossy())
}

/// Canonical form for comparing install paths reported by different
/// processes: forward slashes, no trailing separator, case-folded on Windows.
pub fn normalize_path(path: &str) -> String {
    normalize_path_with(path, cfg!(windows))
}

pub(crate) fn normalize_path_with(path: &str, case_insensitive: bool) -> String {
    let mut normalized = path.trim().replace('\\', "/");
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    if case_insensitive {
        normalized = normalized.to_lowercase();
    }
    normalized
}

/// Compare dotted version strings numerically where possible.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split(['.', '-', '+']);
    let mut right = b.split(['.', '-', '+']);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Finds the identity actually installed on disk for this host.
pub trait InstalledIdentityResolver: Send + Sync + 'static {
    fn installed_identity(&self, host: &HostIdentity) -> Option<HostIdentity>;
}

/// Looks for sibling `<extension-id>-<version>` directories next to the
/// host's install path and picks the highest version that has a
/// `package.json`.
#[derive(Debug, Clone)]
pub struct SiblingInstallResolver {
    extension_id: String,
}

impl SiblingInstallResolver {
    pub fn new(extension_id: impl Into<String>) -> Self {
        Self { extension_id: extension_id.into() }
    }

    fn candidate(&self, dir: &Path) -> Option<HostIdentity> {
        let name = dir.file_name()?.to_string_lossy().into_owned();
        let suffix = name.strip_prefix(&self.extension_id)?.strip_prefix('-')?;
        let dir_version = suffix.split('-').next().filter(|v| v.starts_with(|c: char| c.is_ascii_digit()))?;
        let manifest = std::fs::read_to_string(dir.join("package.json")).ok()?;
        let manifest_version = serde_json::from_str::<serde_json::Value>(&manifest)
            .ok()
            .and_then(|json| json.get("version").and_then(|v| v.as_str()).map(str::to_string));
        Some(HostIdentity {
            version: Some(manifest_version.unwrap_or_else(|| dir_version.to_string())),
            extension_path: Some(dir.to_path_buf()),
            mode: None,
            commit: None,
        })
    }
}

impl InstalledIdentityResolver for SiblingInstallResolver {
    fn installed_identity(&self, host: &HostIdentity) -> Option<HostIdentity> {
        let parent = host.extension_path.as_deref()?.parent()?;
        let entries = match std::fs::read_dir(parent) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %parent.display(), error = %e, "cannot scan install directory");
                return None;
            }
        };
        entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter_map(|path| self.candidate(&path))
            .max_by(|a, b| {
                compare_versions(
                    a.version.as_deref().unwrap_or_default(),
                    b.version.as_deref().unwrap_or_default(),
                )
            })
    }
}

/// True when a newer (or different) install than `host` is on disk.
pub fn is_stale_host(
    host: &HostIdentity,
    installed: &HostIdentity,
    strictness: IdentityStrictness,
) -> bool {
    !installed.matches(host, strictness)
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
