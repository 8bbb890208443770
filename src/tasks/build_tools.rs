//! Install the platform compiler toolchain.
use anyhow::Result;

use super::{Context, ProcessOpts, Task, TaskResult, process_single};
use crate::resources::build_tools::BuildToolsResource;
use crate::resources::{Resource, ResourceState};

/// Install the platform compiler toolchain.
#[derive(Debug)]
pub struct InstallBuildTools;

impl Task for InstallBuildTools {
    fn name(&self) -> &'static str {
        "Install build tools"
    }

    fn fatal(&self) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let resource = BuildToolsResource::new(ctx.profile.package_manager, ctx.executor.as_ref());
        if !resource.needs_change()? {
            ctx.log
                .info(&format!("{} already installed", resource.toolchain()));
            return Ok(TaskResult::Skipped("already installed".to_string()));
        }
        let stats = process_single(
            ctx,
            &resource,
            ResourceState::Missing,
            &ProcessOpts::apply_all("install"),
        )?;
        Ok(stats.finish(ctx))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resources::test_helpers::MockExecutor;
    use crate::tasks::test_helpers::{arch, make_context, macos, ubuntu};
    use std::sync::Arc;

    #[test]
    fn present_toolchain_is_skipped() {
        let executor = Arc::new(MockExecutor::ok("Status: install ok installed\n"));
        let ctx = make_context(ubuntu(), executor.clone());
        assert_eq!(
            InstallBuildTools.run(&ctx).unwrap(),
            TaskResult::Skipped("already installed".to_string())
        );
        assert_eq!(executor.calls(), vec!["dpkg -s build-essential"]);
    }

    #[test]
    fn missing_toolchain_is_installed_on_arch() {
        let executor = Arc::new(MockExecutor::with_responses(vec![
            (false, String::new()),
            (true, String::new()),
        ]));
        let ctx = make_context(arch(), executor.clone());
        assert_eq!(InstallBuildTools.run(&ctx).unwrap(), TaskResult::Ok);
        assert_eq!(
            executor.calls(),
            vec![
                "pacman -Q base-devel",
                "sudo pacman -S --needed --noconfirm base-devel",
            ]
        );
    }

    #[test]
    fn dry_run_only_probes() {
        let executor = Arc::new(MockExecutor::fail());
        let mut ctx = make_context(macos(), executor.clone());
        ctx.run.dry_run = true;
        assert_eq!(InstallBuildTools.run(&ctx).unwrap(), TaskResult::DryRun);
        assert_eq!(executor.calls(), vec!["xcode-select -p"]);
    }

    #[test]
    fn install_failure_is_an_error() {
        let executor = Arc::new(MockExecutor::with_responses(vec![
            (false, String::new()),
            (false, "E: Could not get lock".to_string()),
        ]));
        let ctx = make_context(ubuntu(), executor);
        let err = InstallBuildTools.run(&ctx).unwrap_err();
        assert!(format!("{err:#}").contains("E: Could not get lock"));
    }
}
