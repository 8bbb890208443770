//! System package installation resource.
use std::collections::HashSet;

use anyhow::Result;

use super::{Applicable, ResourceChange, ResourceState};
use crate::exec::Executor;
use crate::platform::PackageManager;

/// Package manager bound to an executor and the program used to reach it.
#[derive(Debug, Clone, Copy)]
pub struct PackageTool<'a> {
    /// Which package manager to drive.
    pub manager: PackageManager,
    /// Program used for Homebrew (absolute path under the prefix, or
    /// `brew` when found on `PATH`). Unused for apt and pacman.
    pub brew: &'a str,
    executor: &'a dyn Executor,
}

impl<'a> PackageTool<'a> {
    /// Bind `manager` to `executor`.
    #[must_use]
    pub const fn new(manager: PackageManager, brew: &'a str, executor: &'a dyn Executor) -> Self {
        Self {
            manager,
            brew,
            executor,
        }
    }

    /// Query the full set of installed package names with a single command.
    ///
    /// A failing query yields an empty set; every package is then treated as
    /// missing and the idempotent installers sort it out.
    ///
    /// # Errors
    ///
    /// Returns an error if the query program cannot be spawned.
    pub fn installed(&self) -> Result<HashSet<String>> {
        let result = match self.manager {
            PackageManager::Brew => self.executor.run_unchecked(self.brew, &["list", "-1"])?,
            PackageManager::Apt => self.executor.run_unchecked(
                "dpkg-query",
                &["-W", "-f=${db:Status-Abbrev}|${Package}\n"],
            )?,
            PackageManager::Pacman => self.executor.run_unchecked("pacman", &["-Qq"])?,
        };
        if !result.success {
            return Ok(HashSet::new());
        }
        Ok(match self.manager {
            PackageManager::Apt => parse_dpkg_status(&result.stdout),
            PackageManager::Brew | PackageManager::Pacman => result
                .stdout
                .lines()
                .filter_map(|line| line.split_whitespace().next())
                .map(String::from)
                .collect(),
        })
    }

    /// Refresh the package index where the manager needs it (apt only).
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh command fails.
    pub fn refresh_index(&self) -> Result<()> {
        if self.manager == PackageManager::Apt {
            self.executor.run("sudo", &["apt-get", "update", "-q"])?;
        }
        Ok(())
    }

    /// Install one package.
    ///
    /// # Errors
    ///
    /// Returns an error if the install command fails.
    pub fn install(&self, name: &str) -> Result<()> {
        match self.manager {
            PackageManager::Brew => {
                self.executor.run(self.brew, &["install", name])?;
            }
            PackageManager::Apt => {
                self.executor.run(
                    "sudo",
                    &[
                        "DEBIAN_FRONTEND=noninteractive",
                        "apt-get",
                        "install",
                        "-y",
                        "-q",
                        name,
                    ],
                )?;
            }
            PackageManager::Pacman => {
                self.executor
                    .run("sudo", &["pacman", "-S", "--needed", "--noconfirm", name])?;
            }
        }
        Ok(())
    }
}

/// Names of fully installed packages from `dpkg-query` output lines of the
/// form `ii |name`.
fn parse_dpkg_status(output: &str) -> HashSet<String> {
    output
        .lines()
        .filter_map(|line| line.split_once('|'))
        .filter(|(status, _)| status.trim_end() == "ii")
        .map(|(_, name)| name.trim().to_string())
        .collect()
}

/// A system package that can be checked against a bulk query and installed.
#[derive(Debug)]
pub struct PackageResource<'a> {
    /// Package name.
    pub name: String,
    tool: PackageTool<'a>,
}

impl<'a> PackageResource<'a> {
    /// Create a new package resource.
    #[must_use]
    pub const fn new(name: String, tool: PackageTool<'a>) -> Self {
        Self { name, tool }
    }

    /// Determine the resource state from a pre-fetched set of installed names.
    #[must_use]
    pub fn state_from_installed(&self, installed: &HashSet<String>) -> ResourceState {
        if installed.contains(&self.name) {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        }
    }
}

impl Applicable for PackageResource<'_> {
    fn description(&self) -> String {
        format!("{} ({})", self.name, self.tool.manager)
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.tool.install(&self.name)?;
        Ok(ResourceChange::Applied)
    }
}
