// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn identity(version: Option<&str>, path: Option<&str>) -> HostIdentity {
    HostIdentity {
        version: version.map(str::to_string),
        extension_path: path.map(PathBuf::from),
        mode: None,
        commit: None,
    }
}

fn info(version: Option<&str>, path: Option<&str>) -> ServiceReadyInfo {
    let mut info = ServiceReadyInfo::local(42, 55888);
    info.version = version.map(str::to_string);
    info.extension_path = path.map(str::to_string);
    info
}

#[yare::parameterized(
    identical          = { Some("1.0.0"), Some("/ext/a"), Some("1.0.0"), Some("/ext/a"), true },
    trailing_slash     = { Some("1.0.0"), Some("/ext/a"), Some("1.0.0"), Some("/ext/a/"), true },
    other_version      = { Some("1.0.0"), Some("/ext/a"), Some("1.1.0"), Some("/ext/a"), false },
    other_path         = { Some("1.0.0"), Some("/ext/a"), Some("1.0.0"), Some("/ext/b"), false },
    bridge_no_version  = { Some("1.0.0"), Some("/ext/a"), None,          Some("/ext/a"), true },
    host_unknown       = { None,          None,           Some("1.0.0"), Some("/ext/a"), true },
)]
fn lenient_matching(
    host_version: Option<&str>,
    host_path: Option<&str>,
    bridge_version: Option<&str>,
    bridge_path: Option<&str>,
    expected: bool,
) {
    let host = identity(host_version, host_path);
    let running = info(bridge_version, bridge_path);
    assert_eq!(host.matches_info(&running, IdentityStrictness::Lenient), expected);
}

#[test]
fn strict_requires_both_fields() {
    let host = identity(Some("1.0.0"), Some("/ext/a"));
    assert!(host.matches_info(&info(Some("1.0.0"), Some("/ext/a")), IdentityStrictness::Strict));
    assert!(!host.matches_info(&info(None, Some("/ext/a")), IdentityStrictness::Strict));
    assert!(!host.matches_info(&info(Some("1.0.0"), None), IdentityStrictness::Strict));
}

#[test]
fn windows_paths_fold_case_and_separators() {
    assert_eq!(
        normalize_path_with("C:\\Users\\Me\\.vscode\\ext\\", true),
        normalize_path_with("c:/users/me/.vscode/ext", true)
    );
    assert_ne!(normalize_path_with("/Ext/A", false), normalize_path_with("/ext/a", false));
    assert_eq!(normalize_path_with("/", false), "/");
}

#[yare::parameterized(
    equal       = { "1.2.3", "1.2.3", Ordering::Equal },
    numeric     = { "1.10.0", "1.9.9", Ordering::Greater },
    shorter     = { "1.2", "1.2.1", Ordering::Less },
    text_suffix = { "1.0.0-rc1", "1.0.0-rc2", Ordering::Less },
)]
fn version_ordering(a: &str, b: &str, expected: Ordering) {
    assert_eq!(compare_versions(a, b), expected);
}

#[test]
fn strictness_parses_and_displays() {
    assert_eq!("STRICT".parse::<IdentityStrictness>().unwrap(), IdentityStrictness::Strict);
    assert_eq!("".parse::<IdentityStrictness>().unwrap(), IdentityStrictness::Lenient);
    assert!("paranoid".parse::<IdentityStrictness>().is_err());
    assert_eq!(IdentityStrictness::Strict.to_string(), "strict");
}

#[test]
fn stale_host_when_installed_differs() {
    let host = identity(Some("1.0.0"), Some("/ext/boardlab-1.0.0"));
    let same = identity(Some("1.0.0"), Some("/ext/boardlab-1.0.0"));
    let newer = identity(Some("1.1.0"), Some("/ext/boardlab-1.1.0"));
    assert!(!is_stale_host(&host, &same, IdentityStrictness::Lenient));
    assert!(is_stale_host(&host, &newer, IdentityStrictness::Lenient));
}

fn install(parent: &Path, dir: &str, manifest_version: Option<&str>) {
    let path = parent.join(dir);
    std::fs::create_dir_all(&path).unwrap();
    let manifest = match manifest_version {
        Some(version) => format!("{{\"name\":\"boardlab\",\"version\":\"{version}\"}}"),
        None => "{}".to_string(),
    };
    std::fs::write(path.join("package.json"), manifest).unwrap();
}

#[test]
fn sibling_resolver_picks_highest_install() {
    let root = tempfile::tempdir().unwrap();
    install(root.path(), "boardlab-1.0.0", Some("1.0.0"));
    install(root.path(), "boardlab-1.10.0-linux-x64", Some("1.10.0"));
    install(root.path(), "boardlab-1.9.0", None);
    install(root.path(), "otherext-9.9.9", Some("9.9.9"));
    std::fs::create_dir_all(root.path().join("boardlab-2.0.0")).unwrap();

    let host = identity(Some("1.0.0"), root.path().join("boardlab-1.0.0").to_str());
    let installed = SiblingInstallResolver::new("boardlab").installed_identity(&host).unwrap();

    assert_eq!(installed.version.as_deref(), Some("1.10.0"));
    assert_eq!(installed.extension_path, Some(root.path().join("boardlab-1.10.0-linux-x64")));
}

#[test]
fn sibling_resolver_falls_back_to_directory_version() {
    let root = tempfile::tempdir().unwrap();
    install(root.path(), "boardlab-0.4.2", None);
    let host = identity(None, root.path().join("boardlab-0.4.2").to_str());
    let installed = SiblingInstallResolver::new("boardlab").installed_identity(&host).unwrap();
    assert_eq!(installed.version.as_deref(), Some("0.4.2"));
}

#[test]
fn sibling_resolver_needs_an_install_path() {
    let host = identity(Some("1.0.0"), None);
    assert!(SiblingInstallResolver::new("boardlab").installed_identity(&host).is_none());
}

proptest::proptest! {
    #[test]
    fn version_ordering_is_antisymmetric(a in "[0-9]{1,3}(\\.[0-9]{1,3}){0,3}", b in "[0-9]{1,3}(\\.[0-9]{1,3}){0,3}") {
        proptest::prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
        proptest::prop_assert_eq!(compare_versions(&a, &a), Ordering::Equal);
    }
}
