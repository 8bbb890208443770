//! Make the platform package manager available.
use anyhow::{Context as _, Result};

use super::{Context, Task, TaskResult, task_deps};
use crate::error::ResourceError;
use crate::platform::PackageManager;

/// Official Homebrew installer script.
pub const HOMEBREW_INSTALLER_URL: &str =
    "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh";

/// Make the platform package manager available.
///
/// Homebrew is installed when absent. apt and pacman ship with their
/// distributions and cannot be bootstrapped, so their absence is fatal.
#[derive(Debug)]
pub struct InstallPackageManager;

impl InstallPackageManager {
    fn brew_available(ctx: &Context) -> bool {
        ctx.fs_ops.exists(&ctx.profile.prefixed_bin("brew")) || ctx.executor.which("brew")
    }

    fn install_homebrew(ctx: &Context) -> Result<TaskResult> {
        if ctx.dry_run() {
            ctx.log.dry_run(&format!(
                "would download and run the Homebrew installer from {HOMEBREW_INSTALLER_URL}"
            ));
            return Ok(TaskResult::DryRun);
        }
        let script = ctx
            .downloader
            .fetch_text(HOMEBREW_INSTALLER_URL)
            .context("fetching the Homebrew installer")?;
        ctx.executor
            .run_interactive("/bin/bash", &["-c", &script], &[("NONINTERACTIVE", "1")])
            .context("running the Homebrew installer")?;
        if !Self::brew_available(ctx) {
            anyhow::bail!(
                "Homebrew installer finished but {} is missing",
                ctx.profile.prefixed_bin("brew").display()
            );
        }
        ctx.log.info("installed Homebrew");
        Ok(TaskResult::Ok)
    }
}

impl Task for InstallPackageManager {
    fn name(&self) -> &'static str {
        "Install package manager"
    }

    task_deps![super::build_tools::InstallBuildTools];

    fn fatal(&self) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let program = match ctx.profile.package_manager {
            PackageManager::Brew => {
                if Self::brew_available(ctx) {
                    ctx.log.info("Homebrew already installed");
                    return Ok(TaskResult::Skipped("already installed".to_string()));
                }
                return Self::install_homebrew(ctx);
            }
            PackageManager::Apt => "apt-get",
            PackageManager::Pacman => "pacman",
        };
        if ctx.executor.which(program) {
            ctx.log.debug(&format!("{program} found on PATH"));
            Ok(TaskResult::Skipped("already installed".to_string()))
        } else {
            Err(ResourceError::MissingPrerequisite(program.to_string()).into())
        }
    }
}
