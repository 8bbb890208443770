//! Invoke the checkout's own setup script.
use std::path::PathBuf;

use anyhow::Result;

use super::{Context, Task, TaskResult, task_deps};

/// Setup script at the root of the dotfiles checkout.
pub const SETUP_SCRIPT: &str = "setup.sh";

/// Invoke the checkout's own setup script (symlinks, config files).
///
/// The script is idempotent on its own; it receives `--dry-run` when the
/// run is a preview. A non-zero exit is a warning.
#[derive(Debug)]
pub struct RunSetup;

impl RunSetup {
    fn script(ctx: &Context) -> PathBuf {
        ctx.dotfiles_dir().join(SETUP_SCRIPT)
    }
}

impl Task for RunSetup {
    fn name(&self) -> &'static str {
        "Run setup"
    }

    task_deps![super::repository::CloneRepository];

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let script = Self::script(ctx);
        if !ctx.fs_ops.is_file(&script) {
            ctx.log.info(&format!("{} not found", script.display()));
            return Ok(TaskResult::Skipped(format!("no {SETUP_SCRIPT}")));
        }

        let script = script.to_string_lossy();
        let mut args = vec![&*script];
        if ctx.dry_run() {
            args.push("--dry-run");
        }
        if let Err(e) = ctx.executor.run_interactive("bash", &args, &[]) {
            ctx.log.warn(&format!("{SETUP_SCRIPT} reported an error: {e:#}"));
        }
        Ok(if ctx.dry_run() {
            TaskResult::DryRun
        } else {
            TaskResult::Ok
        })
    }
}
