//! Print the manual follow-up steps the bootstrap does not automate.
use anyhow::Result;

use super::{Context, Task, TaskResult, task_deps};

/// Print the manual follow-up steps the bootstrap does not automate.
#[derive(Debug)]
pub struct ShowNextSteps;

impl Task for ShowNextSteps {
    fn name(&self) -> &'static str {
        "Next steps"
    }

    task_deps![super::shell::ConfigureShell];

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let steps = &ctx.settings.next_steps;
        if steps.is_empty() {
            return Ok(TaskResult::Skipped("no manual steps".to_string()));
        }
        if ctx.dry_run() {
            ctx.log.info("dry run: nothing was changed");
        }
        for (n, step) in steps.iter().enumerate() {
            ctx.log.info(&format!("  {}. {step}", n + 1));
        }
        Ok(TaskResult::Ok)
    }
}
