// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn host(version: &str, path: &str) -> HostIdentity {
    HostIdentity {
        version: Some(version.to_string()),
        extension_path: Some(PathBuf::from(path)),
        mode: None,
        commit: None,
    }
}

#[test]
fn missing_lease_reads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = LeaseStore::new(dir.path().join("bridge-owner.json"));
    assert_eq!(store.read().unwrap(), None);
}

#[test]
fn write_then_read() {
    let dir = tempfile::tempdir().unwrap();
    let store = LeaseStore::new(dir.path().join("nested/bridge-owner.json"));
    let lease = OwnershipLease::new(4242, &host("1.0.0", "/ext/a"), 1_000, true);

    store.write(&lease).unwrap();
    assert_eq!(store.read().unwrap(), Some(lease.clone()));

    let replaced = OwnershipLease::new(5151, &host("1.1.0", "/ext/b"), 2_000, false);
    store.write(&replaced).unwrap();
    assert_eq!(store.read().unwrap(), Some(replaced));
    assert!(!dir.path().join("nested/bridge-owner.json.tmp").exists());
}

#[test]
fn lease_file_is_camel_case_json() {
    let dir = tempfile::tempdir().unwrap();
    let store = LeaseStore::new(dir.path().join("bridge-owner.json"));
    store.write(&OwnershipLease::new(7, &host("1.0.0", "/ext/a"), 99, false)).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(json["ownerPid"], 7);
    assert_eq!(json["writtenAtMs"], 99);
    assert_eq!(json["extensionPath"], "/ext/a");
}

#[test]
fn corrupt_lease_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge-owner.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(LeaseStore::new(path).read(), Err(LeaseError::Corrupt(_))));
}

#[yare::parameterized(
    same_host     = { "1.0.0", "/ext/a",  IdentityStrictness::Lenient, true },
    slash_variant = { "1.0.0", "/ext/a/", IdentityStrictness::Strict,  true },
    other_version = { "1.1.0", "/ext/a",  IdentityStrictness::Lenient, false },
    other_path    = { "1.0.0", "/ext/b",  IdentityStrictness::Lenient, false },
)]
fn written_by(version: &str, path: &str, strictness: IdentityStrictness, expected: bool) {
    let lease = OwnershipLease::new(1, &host("1.0.0", "/ext/a"), 0, false);
    assert_eq!(lease.written_by(&host(version, path), strictness), expected);
}

#[test]
fn unknown_writer_only_matches_leniently() {
    let lease = OwnershipLease::new(1, &HostIdentity::default(), 0, false);
    assert!(lease.written_by(&host("1.0.0", "/ext/a"), IdentityStrictness::Lenient));
    assert!(!lease.written_by(&host("1.0.0", "/ext/a"), IdentityStrictness::Strict));
}

#[test]
fn age_saturates() {
    let lease = OwnershipLease::new(1, &HostIdentity::default(), 5_000, false);
    assert_eq!(lease.age_ms(7_500), 2_500);
    assert_eq!(lease.age_ms(1_000), 0);
}
