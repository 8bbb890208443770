//! User-local customization extension point.
//!
//! Extensions run late in the bootstrap with the full [`Context`]: the
//! platform profile, the run options, and the executor. They are expected
//! to be idempotent; a failing extension is logged and the next one runs.
use anyhow::Result;

use super::{Context, Task, TaskResult, TaskStats, task_deps};

/// A named, optional customization step.
#[cfg_attr(test, mockall::automock)]
pub trait Extension: Send + Sync + std::fmt::Debug {
    /// Name shown in log output.
    fn name(&self) -> String;

    /// Perform the customization.
    ///
    /// # Errors
    ///
    /// Returns an error if the customization fails; the phase logs it and
    /// continues.
    fn apply(&self, ctx: &Context) -> Result<TaskResult>;
}

/// Environment handed to the local script.
#[must_use]
pub fn script_env(ctx: &Context) -> Vec<(&'static str, String)> {
    vec![
        ("BOOTSTRAP_OS", ctx.profile.os.to_string()),
        ("BOOTSTRAP_DISTRO", ctx.profile.distro.to_string()),
        (
            "BOOTSTRAP_PACKAGE_MANAGER",
            ctx.profile.package_manager.to_string(),
        ),
        (
            "BOOTSTRAP_PREFIX",
            ctx.profile.arch_prefix.to_string_lossy().into_owned(),
        ),
        (
            "BOOTSTRAP_DOTFILES_DIR",
            ctx.dotfiles_dir().to_string_lossy().into_owned(),
        ),
        (
            "BOOTSTRAP_DRY_RUN",
            if ctx.dry_run() { "1" } else { "0" }.to_string(),
        ),
    ]
}

/// Runs the configured local script (default `~/.bootstrap.local`) with
/// `bash` when it exists.
#[derive(Debug)]
pub struct LocalScript;

impl Extension for LocalScript {
    fn name(&self) -> String {
        "local script".to_string()
    }

    fn apply(&self, ctx: &Context) -> Result<TaskResult> {
        let script = ctx.extension_script();
        if !ctx.fs_ops.is_file(&script) {
            ctx.log
                .debug(&format!("no local script at {}", script.display()));
            return Ok(TaskResult::Skipped(format!("no {}", script.display())));
        }
        let script = script.to_string_lossy();
        if ctx.dry_run() {
            ctx.log.dry_run(&format!("would run {script}"));
            return Ok(TaskResult::DryRun);
        }
        let env = script_env(ctx);
        let env: Vec<(&str, &str)> = env.iter().map(|(k, v)| (*k, v.as_str())).collect();
        ctx.executor.run_interactive("bash", &[&*script], &env)?;
        Ok(TaskResult::Ok)
    }
}

/// Run every registered [`Extension`] in order.
#[derive(Debug)]
pub struct RunLocalCustomizations {
    extensions: Vec<Box<dyn Extension>>,
}

impl RunLocalCustomizations {
    /// Create the phase with its extensions.
    #[must_use]
    pub fn new(extensions: Vec<Box<dyn Extension>>) -> Self {
        Self { extensions }
    }
}

impl Task for RunLocalCustomizations {
    fn name(&self) -> &'static str {
        "Run local customizations"
    }

    task_deps![super::repository::CloneRepository];

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let mut stats = TaskStats::new();
        for extension in &self.extensions {
            let name = extension.name();
            match extension.apply(ctx) {
                Ok(TaskResult::Ok | TaskResult::DryRun) => stats.changed += 1,
                Ok(TaskResult::Skipped(reason)) => {
                    ctx.log.debug(&format!("{name}: {reason}"));
                }
                Err(e) => {
                    ctx.log.warn(&format!("{name} failed: {e:#}"));
                    stats.failed += 1;
                }
            }
        }
        if stats.changed == 0 && stats.failed == 0 {
            return Ok(TaskResult::Skipped("nothing to run".to_string()));
        }
        Ok(stats.finish(ctx))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::operations::MockFileSystemOps;
    use crate::resources::test_helpers::MockExecutor;
    use crate::tasks::test_helpers::{make_context_with_log, macos, ubuntu};
    use std::sync::Arc;

    fn with_script() -> Arc<MockFileSystemOps> {
        Arc::new(MockFileSystemOps::new().with_file("/home/me/.bootstrap.local", "brew tap x\n"))
    }

    fn mock_extension(name: &'static str, result: fn() -> Result<TaskResult>) -> MockExtension {
        let mut ext = MockExtension::new();
        ext.expect_name().return_const(name.to_string());
        ext.expect_apply().times(1).returning(move |_| result());
        ext
    }

    #[test]
    fn script_env_describes_platform_and_run() {
        let executor = Arc::new(MockExecutor::with_responses(vec![]));
        let (mut ctx, _log) = make_context_with_log(macos(), executor);
        ctx.run.dry_run = true;
        let env = script_env(&ctx);
        assert_eq!(env[0], ("BOOTSTRAP_OS", "macos".to_string()));
        assert_eq!(env[2], ("BOOTSTRAP_PACKAGE_MANAGER", "brew".to_string()));
        assert_eq!(env[3], ("BOOTSTRAP_PREFIX", "/opt/homebrew".to_string()));
        assert_eq!(
            env[4],
            ("BOOTSTRAP_DOTFILES_DIR", "/home/me/.dotfiles".to_string())
        );
        assert_eq!(env[5], ("BOOTSTRAP_DRY_RUN", "1".to_string()));
    }

    #[test]
    fn local_script_absent_is_skipped() {
        let executor = Arc::new(MockExecutor::with_responses(vec![]));
        let (ctx, _log) = make_context_with_log(ubuntu(), executor.clone());
        assert!(matches!(
            LocalScript.apply(&ctx).unwrap(),
            TaskResult::Skipped(_)
        ));
        assert_eq!(executor.call_count(), 0);
    }

    #[test]
    fn local_script_runs_with_bash() {
        let executor = Arc::new(MockExecutor::ok(""));
        let (ctx, _log) = make_context_with_log(ubuntu(), executor.clone());
        let ctx = ctx.with_fs_ops(with_script());
        assert_eq!(LocalScript.apply(&ctx).unwrap(), TaskResult::Ok);
        assert_eq!(executor.calls(), vec!["bash /home/me/.bootstrap.local"]);
    }

    #[test]
    fn local_script_dry_run_does_not_execute() {
        let executor = Arc::new(MockExecutor::with_responses(vec![]));
        let (mut ctx, _log) = make_context_with_log(ubuntu(), executor.clone());
        ctx.run.dry_run = true;
        let ctx = ctx.with_fs_ops(with_script());
        assert_eq!(LocalScript.apply(&ctx).unwrap(), TaskResult::DryRun);
        assert_eq!(executor.call_count(), 0);
    }

    #[test]
    fn failing_extension_does_not_stop_the_next() {
        let executor = Arc::new(MockExecutor::with_responses(vec![]));
        let (ctx, log) = make_context_with_log(ubuntu(), executor);
        let phase = RunLocalCustomizations::new(vec![
            Box::new(mock_extension("fonts", || Err(anyhow::anyhow!("fc-cache failed")))),
            Box::new(mock_extension("work vpn", || Ok(TaskResult::Ok))),
        ]);
        assert_eq!(phase.run(&ctx).unwrap(), TaskResult::Ok);
        assert_eq!(log.warning_count(), 1);
    }

    #[test]
    fn only_skipping_extensions_skip_the_phase() {
        let executor = Arc::new(MockExecutor::with_responses(vec![]));
        let (ctx, _log) = make_context_with_log(ubuntu(), executor);
        let phase = RunLocalCustomizations::new(vec![Box::new(mock_extension("fonts", || {
            Ok(TaskResult::Skipped("already installed".to_string()))
        }))]);
        assert_eq!(
            phase.run(&ctx).unwrap(),
            TaskResult::Skipped("nothing to run".to_string())
        );
    }
}
