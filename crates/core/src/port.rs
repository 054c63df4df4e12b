// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Port identity: the `(protocol, address)` pair every session, cache and
//! notification is keyed by.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between protocol and address in a port key.
pub const PORT_KEY_SEPARATOR: &str = "://";

/// Identifies a serial or network port as reported by the bridge.
///
/// Immutable value. Two identifiers are the same port iff their keys match
/// (case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortIdentifier {
    pub protocol: String,
    pub address: String,
}

impl PortIdentifier {
    pub fn new(protocol: impl Into<String>, address: impl Into<String>) -> Self {
        Self { protocol: protocol.into(), address: address.into() }
    }

    /// Shorthand for a `serial` port.
    pub fn serial(address: impl Into<String>) -> Self {
        Self::new("serial", address)
    }

    /// Canonical lookup key: `protocol://address`.
    pub fn key(&self) -> PortKey {
        PortKey(format!("{}{}{}", self.protocol, PORT_KEY_SEPARATOR, self.address))
    }

    /// Parse a key produced by [`PortIdentifier::key`].
    ///
    /// Splits at the first separator, so addresses may themselves contain
    /// `://` (network ports do).
    pub fn from_key(key: &str) -> Option<Self> {
        let (protocol, address) = key.split_once(PORT_KEY_SEPARATOR)?;
        if protocol.is_empty() {
            return None;
        }
        Some(Self::new(protocol, address))
    }
}

impl fmt::Display for PortIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.protocol, PORT_KEY_SEPARATOR, self.address)
    }
}

/// String form of a [`PortIdentifier`], used as the map key everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortKey(String);

impl PortKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_port(&self) -> Option<PortIdentifier> {
        PortIdentifier::from_key(&self.0)
    }
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&PortIdentifier> for PortKey {
    fn from(port: &PortIdentifier) -> Self {
        port.key()
    }
}

impl std::borrow::Borrow<str> for PortKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PortKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PortKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Free-function form of [`PortIdentifier::key`].
pub fn port_key(port: &PortIdentifier) -> PortKey {
    port.key()
}

#[cfg(test)]
#[path = "port_tests.rs"]
mod tests;
