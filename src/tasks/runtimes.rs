//! Install the runtime version manager, its plugins and tool versions.
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::Result;

use super::{
    Context, ProcessOpts, Task, TaskResult, TaskStats, process_resource_states, process_single,
    task_deps,
};
use crate::config::tool_versions::{self, ToolVersionSpec};
use crate::resources::repository::GitCheckoutResource;
use crate::resources::version_manager::{PluginResource, ToolVersionResource, VersionManager};
use crate::resources::ResourceState;

/// Install the runtime version manager, its plugins, and every tool version
/// declared in the version manifest.
#[derive(Debug)]
pub struct InstallRuntimes;

impl Task for InstallRuntimes {
    fn name(&self) -> &'static str {
        "Install language runtimes"
    }

    task_deps![
        super::build_tools::InstallBuildTools,
        super::repository::CloneRepository,
    ];

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if ctx.run.skip_runtimes {
            return Ok(TaskResult::Skipped("--skip-runtimes".to_string()));
        }
        let settings = &ctx.settings.version_manager;
        let mut stats = TaskStats::new();

        // Any existing directory counts as installed: a checkout of the
        // shell implementation or the data directory of a packaged asdf.
        let root = ctx.version_manager_dir();
        let existed = ctx.fs_ops.exists(&root);
        if !existed {
            let checkout = GitCheckoutResource::new(
                settings.url.clone(),
                settings.reference.clone(),
                root.clone(),
                ctx.fs_ops.as_ref(),
                ctx.executor.as_ref(),
            );
            let opts = ProcessOpts::apply_all("install");
            stats += process_single(ctx, &checkout, ResourceState::Missing, &opts)?;
        }
        // Until the manager exists there is nothing to query.
        let present = existed || !ctx.dry_run();
        let vm = locate_manager(ctx, root, existed)?;

        let manifest = ctx.dotfiles_dir().join(&settings.manifest);
        let specs = tool_versions::load(ctx.fs_ops.as_ref(), &manifest)?.unwrap_or_else(|| {
            ctx.log
                .warn(&format!("version manifest not found: {}", manifest.display()));
            Vec::new()
        });

        let mut plugins = tool_versions::tools(&specs);
        for extra in &settings.plugins {
            if !plugins.contains(extra) {
                plugins.push(extra.clone());
            }
        }

        stats += ensure_plugins(ctx, &vm, &plugins, present)?;
        stats += ensure_versions(ctx, &vm, &specs, present)?;
        Ok(stats.finish(ctx))
    }
}

/// Pick the asdf entry point for `root`.
///
/// A fresh clone always has `<root>/bin/asdf`. An existing directory
/// without one (the data directory of a packaged asdf) falls back to
/// `asdf` on `PATH`.
fn locate_manager(ctx: &Context, root: PathBuf, existed: bool) -> Result<VersionManager<'_>> {
    let vm = VersionManager::new(root, ctx.executor.as_ref());
    if !existed || ctx.fs_ops.is_file(vm.program()) {
        return Ok(vm);
    }
    if ctx.executor.which("asdf") {
        ctx.log.debug(&format!(
            "no bin/asdf under {}; using asdf from PATH",
            vm.root().display()
        ));
        return Ok(vm.with_program("asdf"));
    }
    anyhow::bail!(
        "{} has no bin/asdf and asdf is not on PATH",
        vm.root().display()
    )
}

/// Add missing plugins; update the ones already present.
fn ensure_plugins(
    ctx: &Context,
    vm: &VersionManager<'_>,
    plugins: &[String],
    present: bool,
) -> Result<TaskStats> {
    let installed = if present {
        vm.plugins()?
    } else {
        HashSet::new()
    };
    let mut stats = TaskStats::new();
    for name in plugins {
        let plugin = PluginResource::new(name.clone(), vm);
        match plugin.state_from_installed(&installed) {
            ResourceState::Correct => stats += update_plugin(ctx, vm, name),
            state => {
                stats += process_single(ctx, &plugin, state, &ProcessOpts::install_missing("add"))?;
            }
        }
    }
    Ok(stats)
}

/// Plugin updates are not counted as changes; a failed update is a warning.
fn update_plugin(ctx: &Context, vm: &VersionManager<'_>, name: &str) -> TaskStats {
    let mut stats = TaskStats::new();
    if ctx.dry_run() {
        ctx.log.dry_run(&format!("would update asdf plugin {name}"));
        stats.already_ok += 1;
        return stats;
    }
    match vm.update_plugin(name) {
        Ok(()) => {
            ctx.log.debug(&format!("updated asdf plugin {name}"));
            stats.already_ok += 1;
        }
        Err(e) => {
            ctx.log
                .warn(&format!("failed to update asdf plugin {name}: {e:#}"));
            stats.failed += 1;
        }
    }
    stats
}

/// Install every declared version not already present, in manifest order.
fn ensure_versions(
    ctx: &Context,
    vm: &VersionManager<'_>,
    specs: &[ToolVersionSpec],
    present: bool,
) -> Result<TaskStats> {
    let mut installed: HashMap<String, HashSet<String>> = HashMap::new();
    let mut resources = Vec::with_capacity(specs.len());
    for spec in specs {
        if !installed.contains_key(&spec.tool) {
            let versions = if present {
                vm.installed_versions(&spec.tool)?
            } else {
                HashSet::new()
            };
            installed.insert(spec.tool.clone(), versions);
        }
        let resource = ToolVersionResource::new(spec.clone(), vm);
        let state = installed
            .get(&spec.tool)
            .map_or(ResourceState::Missing, |versions| {
                resource.state_from_installed(versions)
            });
        resources.push((resource, state));
    }
    process_resource_states(ctx, resources, &ProcessOpts::install_missing("install"))
}
