//! Register the target shell and make it the login shell.
use std::path::PathBuf;

use anyhow::Result;

use super::{Context, ProcessOpts, Task, TaskResult, process_resources, task_deps};
use crate::error::ResourceError;
use crate::resources::shell::{DefaultShellResource, ShellRegistryResource};

/// Register the target shell and make it the login shell.
#[derive(Debug)]
pub struct ConfigureShell;

impl ConfigureShell {
    /// Absolute path of the target shell: under the platform prefix first,
    /// then the standard system locations.
    fn shell_path(ctx: &Context) -> Option<PathBuf> {
        let name = &ctx.settings.shell.name;
        [
            ctx.profile.prefixed_bin(name),
            PathBuf::from("/bin").join(name),
            PathBuf::from("/usr/bin").join(name),
        ]
        .into_iter()
        .find(|path| ctx.fs_ops.exists(path))
    }
}

impl Task for ConfigureShell {
    fn name(&self) -> &'static str {
        "Configure default shell"
    }

    task_deps![super::packages::InstallMinimalPackages];

    fn should_run(&self, ctx: &Context) -> bool {
        // chsh needs a password prompt
        !ctx.host.ci
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let shell = match Self::shell_path(ctx) {
            Some(path) => path,
            // A preview on a fresh host has not installed the shell yet.
            None if ctx.dry_run() => ctx.profile.prefixed_bin(&ctx.settings.shell.name),
            None => {
                return Err(
                    ResourceError::MissingPrerequisite(ctx.settings.shell.name.clone()).into(),
                );
            }
        };

        let registry =
            ShellRegistryResource::new(shell.clone(), ctx.fs_ops.as_ref(), ctx.executor.as_ref());
        let mut stats = process_resources(
            ctx,
            std::iter::once(registry),
            &ProcessOpts::apply_all("register").no_bail(),
        )?;

        let login = DefaultShellResource::new(
            shell,
            ctx.host.user.clone(),
            ctx.profile.os,
            ctx.host.login_shell.clone(),
            ctx.executor.as_ref(),
        );
        stats += process_resources(
            ctx,
            std::iter::once(login),
            &ProcessOpts::apply_all("change").no_bail(),
        )?;
        Ok(stats.finish(ctx))
    }
}
