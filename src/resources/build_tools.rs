//! Compiler toolchain resource (Xcode Command Line Tools, build-essential,
//! base-devel).
use std::time::Duration;

use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;
use crate::platform::PackageManager;

/// How long to wait for the Command Line Tools installer dialog by default.
const XCODE_POLL_INTERVAL: Duration = Duration::from_secs(5);
const XCODE_POLL_ATTEMPTS: u32 = 120;

/// Platform compiler toolchain.
#[derive(Debug)]
pub struct BuildToolsResource<'a> {
    manager: PackageManager,
    executor: &'a dyn Executor,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl<'a> BuildToolsResource<'a> {
    /// Create the toolchain resource for `manager`'s platform.
    #[must_use]
    pub const fn new(manager: PackageManager, executor: &'a dyn Executor) -> Self {
        Self {
            manager,
            executor,
            poll_interval: XCODE_POLL_INTERVAL,
            poll_attempts: XCODE_POLL_ATTEMPTS,
        }
    }

    /// Override how the macOS installer is awaited.
    #[must_use]
    pub const fn with_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.poll_interval = interval;
        self.poll_attempts = attempts;
        self
    }

    /// Name of the toolchain for this platform.
    #[must_use]
    pub const fn toolchain(&self) -> &'static str {
        match self.manager {
            PackageManager::Brew => "Xcode Command Line Tools",
            PackageManager::Apt => "build-essential",
            PackageManager::Pacman => "base-devel",
        }
    }

    fn xcode_installed(&self) -> Result<bool> {
        Ok(self.executor.run_unchecked("xcode-select", &["-p"])?.success)
    }

    /// `xcode-select --install` only opens a dialog; wait for it to finish.
    fn install_xcode(&self) -> Result<()> {
        self.executor
            .run_interactive("xcode-select", &["--install"], &[])?;
        for attempt in 0..self.poll_attempts {
            if self.xcode_installed()? {
                return Ok(());
            }
            if attempt + 1 < self.poll_attempts {
                std::thread::sleep(self.poll_interval);
            }
        }
        anyhow::bail!("Command Line Tools installation did not complete")
    }
}

impl Applicable for BuildToolsResource<'_> {
    fn description(&self) -> String {
        self.toolchain().to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        match self.manager {
            PackageManager::Brew => self.install_xcode()?,
            PackageManager::Apt => {
                self.executor.run("sudo", &["apt-get", "update", "-q"])?;
                self.executor.run(
                    "sudo",
                    &[
                        "DEBIAN_FRONTEND=noninteractive",
                        "apt-get",
                        "install",
                        "-y",
                        "-q",
                        "build-essential",
                    ],
                )?;
            }
            PackageManager::Pacman => {
                self.executor.run(
                    "sudo",
                    &["pacman", "-S", "--needed", "--noconfirm", "base-devel"],
                )?;
            }
        }
        Ok(ResourceChange::Applied)
    }
}

impl Resource for BuildToolsResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let present = match self.manager {
            PackageManager::Brew => self.xcode_installed()?,
            PackageManager::Apt => {
                let result = self
                    .executor
                    .run_unchecked("dpkg", &["-s", "build-essential"])?;
                result.success && result.stdout.contains("Status: install ok installed")
            }
            PackageManager::Pacman => {
                self.executor
                    .run_unchecked("pacman", &["-Q", "base-devel"])?
                    .success
            }
        };
        Ok(if present {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resources::test_helpers::MockExecutor;

    #[test]
    fn apt_state_requires_installed_status() {
        let executor = MockExecutor::ok("Package: build-essential\nStatus: install ok installed\n");
        let resource = BuildToolsResource::new(PackageManager::Apt, &executor);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);

        let executor = MockExecutor::ok("Package: build-essential\nStatus: deinstall ok config-files\n");
        let resource = BuildToolsResource::new(PackageManager::Apt, &executor);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
    }

    #[test]
    fn pacman_state_uses_package_query() {
        let executor = MockExecutor::fail();
        let resource = BuildToolsResource::new(PackageManager::Pacman, &executor);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
        assert_eq!(executor.calls(), vec!["pacman -Q base-devel"]);
    }

    #[test]
    fn apt_apply_refreshes_then_installs() {
        let executor = MockExecutor::with_responses(vec![(true, String::new()), (true, String::new())]);
        let resource = BuildToolsResource::new(PackageManager::Apt, &executor);
        assert_eq!(resource.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(
            executor.calls(),
            vec![
                "sudo apt-get update -q",
                "sudo DEBIAN_FRONTEND=noninteractive apt-get install -y -q build-essential",
            ]
        );
    }

    #[test]
    fn xcode_install_waits_for_completion() {
        let executor = MockExecutor::with_responses(vec![
            (true, String::new()),
            (false, String::new()),
            (true, "/Library/Developer/CommandLineTools".to_string()),
        ]);
        let resource = BuildToolsResource::new(PackageManager::Brew, &executor)
            .with_polling(Duration::ZERO, 5);
        assert_eq!(resource.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(
            executor.calls(),
            vec!["xcode-select --install", "xcode-select -p", "xcode-select -p"]
        );
    }

    #[test]
    fn xcode_install_gives_up_after_attempts() {
        let executor = MockExecutor::with_responses(vec![
            (true, String::new()),
            (false, String::new()),
            (false, String::new()),
        ]);
        let resource = BuildToolsResource::new(PackageManager::Brew, &executor)
            .with_polling(Duration::ZERO, 2);
        let err = resource.apply().unwrap_err();
        assert!(err.to_string().contains("did not complete"));
    }

    #[test]
    fn pacman_install_failure_propagates() {
        let executor = MockExecutor::fail();
        let resource = BuildToolsResource::new(PackageManager::Pacman, &executor);
        assert!(resource.apply().is_err());
    }
}
