//! Install gems and global npm packages from the secondary manifests.
use std::collections::HashSet;

use anyhow::Result;

use super::{
    Context, ProcessOpts, Task, TaskResult, TaskStats, process_resource_states, task_deps,
};
use crate::config::package_list::{load_with, parse_line_manifest};
use crate::resources::language_package::{Ecosystem, LanguagePackageResource, LanguageTool};
use crate::resources::version_manager::VersionManager;

/// Install gems and global npm packages from the secondary manifests.
#[derive(Debug)]
pub struct InstallLanguagePackages;

impl InstallLanguagePackages {
    /// Prefer the version manager's shim; fall back to `PATH`.
    fn program(ctx: &Context, vm: &VersionManager<'_>, ecosystem: Ecosystem) -> Option<String> {
        let shim = vm.shims_dir().join(ecosystem.program());
        if ctx.fs_ops.exists(&shim) {
            Some(shim.to_string_lossy().into_owned())
        } else if ctx.executor.which(ecosystem.program()) {
            Some(ecosystem.program().to_string())
        } else {
            None
        }
    }

    fn install_ecosystem(
        ctx: &Context,
        vm: &VersionManager<'_>,
        ecosystem: Ecosystem,
        specs: Vec<String>,
    ) -> Result<TaskStats> {
        let Some(program) = Self::program(ctx, vm, ecosystem) else {
            let mut stats = TaskStats::new();
            if ctx.dry_run() {
                for spec in &specs {
                    ctx.log
                        .dry_run(&format!("would install: {spec} ({ecosystem})"));
                }
                stats.changed += u32::try_from(specs.len()).unwrap_or(u32::MAX);
            } else {
                ctx.log.warn(&format!(
                    "{ecosystem} not found; skipping {} package(s)",
                    specs.len()
                ));
                stats.skipped += u32::try_from(specs.len()).unwrap_or(u32::MAX);
            }
            return Ok(stats);
        };

        let tool = LanguageTool::new(ecosystem, program, vm.env(), ctx.executor.as_ref());
        let installed = tool.installed().unwrap_or_else(|e| {
            ctx.log
                .warn(&format!("cannot list installed {ecosystem} packages: {e:#}"));
            HashSet::new()
        });
        let resources: Vec<_> = specs
            .into_iter()
            .map(|spec| {
                let resource = LanguagePackageResource::new(spec, &tool);
                let state = resource.state_from_installed(&installed);
                (resource, state)
            })
            .collect();
        process_resource_states(ctx, resources, &ProcessOpts::install_missing("install"))
    }
}

impl Task for InstallLanguagePackages {
    fn name(&self) -> &'static str {
        "Install language packages"
    }

    task_deps![super::runtimes::InstallRuntimes];

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if ctx.run.skip_runtimes {
            return Ok(TaskResult::Skipped("--skip-runtimes".to_string()));
        }
        let manifests = &ctx.settings.language_packages;
        let vm = VersionManager::new(ctx.version_manager_dir(), ctx.executor.as_ref());
        let dotfiles = ctx.dotfiles_dir();

        let mut stats = TaskStats::new();
        let mut found = false;
        for (ecosystem, file) in [
            (Ecosystem::Gem, &manifests.gems),
            (Ecosystem::Npm, &manifests.npm),
        ] {
            let path = dotfiles.join(file);
            let Some(specs) = load_with(ctx.fs_ops.as_ref(), &path, parse_line_manifest)? else {
                ctx.log.warn(&format!(
                    "{ecosystem} manifest not found: {}",
                    path.display()
                ));
                continue;
            };
            found = true;
            if specs.is_empty() {
                continue;
            }
            stats += Self::install_ecosystem(ctx, &vm, ecosystem, specs)?;
        }

        if !found {
            return Ok(TaskResult::Skipped("no manifests found".to_string()));
        }
        Ok(stats.finish(ctx))
    }
}
