// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::control::ServiceReadyInfo;
use crate::error::HttpError;
use crate::fake::{FakeBridgeControl, FakeLaunch, FakeLauncher, FakePlatform, StaticInstalledIdentity};
use crate::lease::OwnershipLease;
use crate::platform::TerminateMode;
use boardlab_core::FakeClock;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

mod heartbeat;
mod lifecycle;
mod recovery;
mod takeover;

const PORT: u16 = 55888;
const HOST_VERSION: &str = "2.0.0";
const HOST_PATH: &str = "/ext/boardlab-2.0.0";

struct Harness {
    client: BridgeServiceClient<FakeClock>,
    control: FakeBridgeControl,
    launcher: FakeLauncher,
    platform: FakePlatform,
    clock: FakeClock,
    _dir: TempDir,
}

fn base_config(dir: &TempDir) -> BridgeConfig {
    BridgeConfig {
        state_dir: dir.path().to_path_buf(),
        entry: Some(PathBuf::from(format!("{HOST_PATH}/dist/bridge.js"))),
        stop_grace_ms: 200,
        ..BridgeConfig::default()
    }
    .version(HOST_VERSION)
    .extension_path(HOST_PATH)
}

fn harness() -> Harness {
    harness_with(|config| config, None)
}

fn harness_with(
    tweak: impl FnOnce(BridgeConfig) -> BridgeConfig,
    installed: Option<HostIdentity>,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = tweak(base_config(&dir));
    let control = FakeBridgeControl::new();
    let platform = FakePlatform::new(control.clone());
    let launcher = FakeLauncher::new(control.clone()).with_platform(platform.clone());
    let installed = installed.map(|identity| {
        Arc::new(StaticInstalledIdentity(Some(identity))) as Arc<dyn InstalledIdentityResolver>
    });
    let deps = BridgeDeps {
        control: Arc::new(control.clone()),
        launcher: Arc::new(launcher.clone()),
        platform: Arc::new(platform.clone()),
        installed,
    };
    let clock = FakeClock::new();
    let client = BridgeServiceClient::new(config, "window-1", deps, clock.clone());
    Harness { client, control, launcher, platform, clock, _dir: dir }
}

fn identity(version: &str, path: &str) -> HostIdentity {
    HostIdentity {
        version: Some(version.to_string()),
        extension_path: Some(PathBuf::from(path)),
        mode: None,
        commit: None,
    }
}

impl Harness {
    /// A healthy bridge started by a host with `version` installed at `path`.
    fn run_bridge(&self, pid: u32, version: &str, path: &str) -> ServiceReadyInfo {
        let info = ServiceReadyInfo::local(pid, PORT).version(version).extension_path(path);
        self.platform.add_process(
            pid,
            &format!(
                "node {path}/dist/bridge.js --port {PORT} --boardlab-version {version} --extension-path {path}"
            ),
        );
        self.control.set_owner(info.clone());
        info
    }

    fn lease(&self) -> Option<OwnershipLease> {
        LeaseStore::new(self.client.config().lease_path()).read().unwrap()
    }

    fn write_lease(&self, lease: &OwnershipLease) {
        LeaseStore::new(self.client.config().lease_path()).write(lease).unwrap();
    }

    fn owner_pid(&self) -> Option<u32> {
        self.control.owner(PORT).map(|info| info.owner_pid)
    }
}
