//! Install the minimal package set needed by later phases.
use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;

use super::{
    Context, ProcessOpts, Task, TaskResult, TaskStats, process_resource_states, task_deps,
};
use crate::config::package_list::{load_with, parse_package_list};
use crate::platform::PackageManager;
use crate::resources::ResourceState;
use crate::resources::package::{PackageResource, PackageTool};

/// Install `names` one by one, skipping those already installed.
///
/// Individual failures are warnings. With `refresh` set, the package index
/// is refreshed once before the first install.
fn install_packages(ctx: &Context, names: &[String], refresh: bool) -> Result<TaskStats> {
    let brew = ctx.brew_program();
    let tool = PackageTool::new(ctx.profile.package_manager, &brew, ctx.executor.as_ref());
    let installed = tool.installed().unwrap_or_else(|e| {
        ctx.log
            .debug(&format!("cannot query installed packages: {e:#}"));
        HashSet::new()
    });

    let resources: Vec<_> = names
        .iter()
        .map(|name| {
            let resource = PackageResource::new(name.clone(), tool);
            let state = resource.state_from_installed(&installed);
            (resource, state)
        })
        .collect();

    let any_missing = resources
        .iter()
        .any(|(_, state)| *state == ResourceState::Missing);
    if refresh && any_missing && !ctx.dry_run() {
        if let Err(e) = tool.refresh_index() {
            ctx.log
                .warn(&format!("package index refresh failed: {e:#}"));
        }
    }

    process_resource_states(ctx, resources, &ProcessOpts::install_missing("install"))
}

/// Install the small package set needed by every later phase.
#[derive(Debug)]
pub struct InstallMinimalPackages;

impl Task for InstallMinimalPackages {
    fn name(&self) -> &'static str {
        "Install minimal packages"
    }

    task_deps![super::package_manager::InstallPackageManager];

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let packages = &ctx.settings.packages;
        let names = match ctx.profile.package_manager {
            PackageManager::Brew => &packages.brew,
            PackageManager::Apt => &packages.apt,
            PackageManager::Pacman => &packages.pacman,
        };
        if names.is_empty() {
            return Ok(TaskResult::Skipped("no packages configured".to_string()));
        }
        let stats = install_packages(ctx, names, true)?;
        Ok(stats.finish(ctx))
    }
}

/// Install the full platform package list from the dotfiles checkout, then
/// run its optional extras script.
#[derive(Debug)]
pub struct InstallPlatformPackages;

impl InstallPlatformPackages {
    fn list_path(ctx: &Context) -> PathBuf {
        ctx.dotfiles_dir()
            .join("packages")
            .join(format!("{}.txt", ctx.profile.distro))
    }

    fn extras_path(ctx: &Context) -> PathBuf {
        ctx.dotfiles_dir()
            .join("packages")
            .join(format!("{}-extras.sh", ctx.profile.distro))
    }

    /// The extras script is idempotent and runs on every invocation; a
    /// successful run is not a change.
    fn run_extras(ctx: &Context) -> TaskStats {
        let script = Self::extras_path(ctx);
        let mut stats = TaskStats::new();
        if !ctx.fs_ops.is_file(&script) {
            return stats;
        }
        let script = script.to_string_lossy();
        if ctx.dry_run() {
            ctx.log.dry_run(&format!("would run {script}"));
            stats.already_ok += 1;
            return stats;
        }
        match ctx.executor.run_interactive("bash", &[&*script], &[]) {
            Ok(_) => {
                ctx.log.info(&format!("ran {script}"));
                stats.already_ok += 1;
            }
            Err(e) => {
                ctx.log.warn(&format!("{script} failed: {e:#}"));
                stats.failed += 1;
            }
        }
        stats
    }
}

impl Task for InstallPlatformPackages {
    fn name(&self) -> &'static str {
        "Install platform packages"
    }

    task_deps![
        super::repository::CloneRepository,
        super::package_manager::InstallPackageManager,
    ];

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if ctx.run.skip_packages {
            return Ok(TaskResult::Skipped("--skip-packages".to_string()));
        }
        let path = Self::list_path(ctx);
        let Some(names) = load_with(ctx.fs_ops.as_ref(), &path, parse_package_list)? else {
            ctx.log
                .warn(&format!("package list not found: {}", path.display()));
            return Ok(TaskResult::Skipped("no package list".to_string()));
        };
        ctx.log.debug(&format!(
            "{} packages listed in {}",
            names.len(),
            path.display()
        ));

        let mut stats = install_packages(ctx, &names, true)?;
        stats += Self::run_extras(ctx);
        Ok(stats.finish(ctx))
    }
}
