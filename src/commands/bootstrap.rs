//! The `bootstrap` command: run every phase and report.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::CommandSetup;
use crate::cli::Cli;
use crate::error::BootstrapError;
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger};
use crate::tasks::{self, Context, RunReport, Task};

/// Run the bootstrap command and return the process exit code.
///
/// # Errors
///
/// Returns an error if the platform is unsupported, the settings cannot be
/// loaded, `HOME` is unset, or the phase list is inconsistent.
pub fn run(cli: &Cli, log: &Arc<Logger>) -> Result<i32> {
    log.info(&format!("bootstrap {}", crate::VERSION));
    if cli.dry_run {
        log.dry_run("previewing; no changes will be made");
    }

    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .context("HOME environment variable is not set")?;
    let setup = CommandSetup::init(cli, &home, &**log)?;

    let ctx = Context::new(
        Arc::new(setup.settings),
        Arc::new(setup.profile),
        cli.run_config(),
        Arc::clone(log) as Arc<dyn Log>,
        Arc::new(SystemExecutor),
    )?;

    let report = run_phases(&tasks::all_phases(), &ctx, log)?;
    Ok(report.exit_code())
}

/// Validate `phases`, run them in order and print the summary.
///
/// # Errors
///
/// Returns [`BootstrapError::Task`] without running anything if a phase
/// declares a predecessor that is absent or listed after it.
pub fn run_phases(
    phases: &[Box<dyn Task>],
    ctx: &Context,
    log: &Logger,
) -> Result<RunReport, BootstrapError> {
    tasks::validate_order(phases)?;
    let report = tasks::run_all(phases, ctx);
    log.print_summary(report.fatal_failures());
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::tasks::PhaseState;
    use crate::tasks::build_tools::InstallBuildTools;
    use crate::tasks::next_steps::ShowNextSteps;
    use crate::tasks::package_manager::InstallPackageManager;
    use crate::tasks::test_helpers::{make_static_context, ubuntu};

    #[test]
    fn inconsistent_list_runs_nothing() {
        let (ctx, log) = make_static_context(ubuntu());
        let phases: Vec<Box<dyn Task>> = vec![Box::new(ShowNextSteps)];
        let err = run_phases(&phases, &ctx, &log).unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::Task(TaskError::MissingDependency { .. })
        ));
        assert!(log.task_entries().is_empty());
    }

    #[test]
    fn fatal_failure_maps_to_exit_one() {
        let (ctx, log) = make_static_context(ubuntu());
        let phases: Vec<Box<dyn Task>> =
            vec![Box::new(InstallBuildTools), Box::new(InstallPackageManager)];
        let report = run_phases(&phases, &ctx, &log).unwrap();
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.fatal_failures(), 1);
        assert_eq!(report.results[0].state, PhaseState::Failed);
        assert_eq!(report.results[1].state, PhaseState::NotRun);
        assert_eq!(log.task_entries().len(), 2);
    }

    #[test]
    fn full_phase_list_is_consistent() {
        assert!(tasks::validate_order(&tasks::all_phases()).is_ok());
    }
}
