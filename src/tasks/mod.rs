//! Named, ordered phases that orchestrate resource changes.
pub mod build_tools;
mod context;
pub mod extension;
pub mod language_packages;
pub mod next_steps;
pub mod package_manager;
pub mod packages;
mod processing;
pub mod repository;
pub mod runtimes;
pub mod setup;
pub mod shell;

/// Implement [`Task::dependencies`] by expanding to the required
/// `fn dependencies(&self) -> &[TypeId]` method body.
///
/// The `const DEPS` intermediate gives the slice the `'static` lifetime the
/// return type requires.
///
/// # Examples
///
/// ```ignore
/// task_deps![super::repository::CloneRepository, super::build_tools::InstallBuildTools]
/// // expands to:
/// //   fn dependencies(&self) -> &[std::any::TypeId] {
/// //       const DEPS: &[std::any::TypeId] = &[
/// //           std::any::TypeId::of::<super::repository::CloneRepository>(),
/// //           std::any::TypeId::of::<super::build_tools::InstallBuildTools>(),
/// //       ];
/// //       DEPS
/// //   }
/// ```
macro_rules! task_deps {
    [$($dep:ty),+ $(,)?] => {
        fn dependencies(&self) -> &[std::any::TypeId] {
            const DEPS: &[std::any::TypeId] = &[$(std::any::TypeId::of::<$dep>()),+];
            DEPS
        }
    };
}

pub(crate) use task_deps;

pub use context::{Context, HostEnv};
pub use processing::{
    ProcessOpts, TaskResult, TaskStats, apply_resource, process_resource_states,
    process_resources, process_single,
};

use std::any::TypeId;

use anyhow::Result;

use crate::error::TaskError;
use crate::logging::TaskStatus;

/// A named, executable phase.
///
/// The `'static` bound gives each phase struct a stable [`TypeId`], which
/// is how predecessors are declared (see [`Task::dependencies`]).
pub trait Task: Send + Sync + 'static {
    /// Human-readable phase name.
    fn name(&self) -> &str;

    /// The concrete `TypeId` of this phase, used as a dependency identifier.
    fn task_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    /// Phases that must appear earlier in the list.
    ///
    /// Each phase may rely on the side effects of these predecessors
    /// (a package manager on `PATH`, a cloned checkout). The default
    /// implementation declares none.
    fn dependencies(&self) -> &[TypeId] {
        &[]
    }

    /// Whether a failure of this phase halts the run.
    fn fatal(&self) -> bool {
        false
    }

    /// Whether this phase applies to the current platform and host.
    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    /// Execute the phase.
    ///
    /// # Errors
    ///
    /// Returns an error if the phase cannot reach its desired state, such
    /// as when a system command fails or a manifest is malformed.
    fn run(&self, ctx: &Context) -> Result<TaskResult>;
}

/// Lifecycle state of one phase within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    /// Not started yet.
    Pending,
    /// Currently executing.
    Running,
    /// Completed; changes were applied or attempted.
    Ok,
    /// Nothing to do, not applicable, or skipped on request.
    Skipped,
    /// Would have mutated state; suppressed by dry-run. A skip that the
    /// summary reports as "skipped, dry run".
    DryRun,
    /// Returned an error.
    Failed,
    /// Never started because an earlier fatal phase failed.
    NotRun,
}

impl PhaseState {
    /// Whether the phase has reached a final state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    const fn status(self) -> TaskStatus {
        match self {
            Self::Ok => TaskStatus::Ok,
            Self::DryRun => TaskStatus::DryRun,
            Self::Failed => TaskStatus::Failed,
            Self::Pending | Self::Running | Self::NotRun => TaskStatus::NotRun,
            Self::Skipped => TaskStatus::Skipped,
        }
    }
}

/// Outcome of one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseResult {
    /// Phase name.
    pub name: String,
    /// Final (or, before the run, initial) state.
    pub state: PhaseState,
    /// Skip reason or error description.
    pub message: Option<String>,
    /// Whether the phase is fatal.
    pub fatal: bool,
}

impl PhaseResult {
    fn pending(task: &dyn Task) -> Self {
        Self {
            name: task.name().to_string(),
            state: PhaseState::Pending,
            message: None,
            fatal: task.fatal(),
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug)]
pub struct RunReport {
    /// One entry per phase, in declaration order.
    pub results: Vec<PhaseResult>,
    /// The fatal failure that halted the run, if any.
    pub halted: Option<TaskError>,
}

impl RunReport {
    /// Number of phases that ended in `state`.
    #[must_use]
    pub fn count(&self, state: PhaseState) -> usize {
        self.results.iter().filter(|r| r.state == state).count()
    }

    /// Number of fatal phases that failed.
    #[must_use]
    pub fn fatal_failures(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.fatal && r.state == PhaseState::Failed)
            .count()
    }

    /// Process exit code: `1` after a fatal failure, else `0`.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.halted.is_some())
    }
}

/// The complete, ordered phase list run by the bootstrap command.
#[must_use]
pub fn all_phases() -> Vec<Box<dyn Task>> {
    vec![
        Box::new(build_tools::InstallBuildTools),
        Box::new(package_manager::InstallPackageManager),
        Box::new(packages::InstallMinimalPackages),
        Box::new(repository::CloneRepository),
        Box::new(setup::RunSetup),
        Box::new(runtimes::InstallRuntimes),
        Box::new(language_packages::InstallLanguagePackages),
        Box::new(packages::InstallPlatformPackages),
        Box::new(extension::RunLocalCustomizations::new(vec![Box::new(
            extension::LocalScript,
        )])),
        Box::new(shell::ConfigureShell),
        Box::new(next_steps::ShowNextSteps),
    ]
}

/// Check that every declared predecessor appears earlier in `phases`.
///
/// # Errors
///
/// Returns [`TaskError::MissingDependency`] when a predecessor is absent and
/// [`TaskError::OutOfOrder`] when it is declared after its dependent.
pub fn validate_order(phases: &[Box<dyn Task>]) -> Result<(), TaskError> {
    for (index, phase) in phases.iter().enumerate() {
        for dep in phase.dependencies() {
            let (position, predecessor) = phases
                .iter()
                .enumerate()
                .find(|(_, p)| p.task_id() == *dep)
                .ok_or_else(|| TaskError::MissingDependency {
                    phase: phase.name().to_string(),
                })?;
            if position >= index {
                return Err(TaskError::OutOfOrder {
                    phase: phase.name().to_string(),
                    predecessor: predecessor.name().to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Execute one phase, recording the result in the logger.
pub fn execute(task: &dyn Task, ctx: &Context) -> (PhaseState, Option<String>) {
    let (state, message) = if task.should_run(ctx) {
        ctx.log.stage(task.name());
        match task.run(ctx) {
            Ok(TaskResult::Ok) => (PhaseState::Ok, None),
            Ok(TaskResult::Skipped(reason)) => {
                ctx.log.info(&format!("skipped: {reason}"));
                (PhaseState::Skipped, Some(reason))
            }
            Ok(TaskResult::DryRun) => (PhaseState::DryRun, None),
            Err(e) => {
                let message = format!("{e:#}");
                ctx.log.error(&format!("{}: {message}", task.name()));
                (PhaseState::Failed, Some(message))
            }
        }
    } else {
        ctx.log
            .debug(&format!("skipping phase: {} (not applicable)", task.name()));
        (PhaseState::Skipped, Some("not applicable".to_string()))
    };
    ctx.log
        .record_task(task.name(), state.status(), message.as_deref());
    (state, message)
}

/// Run `phases` strictly in order.
///
/// A failed fatal phase halts the run; every later phase is recorded as
/// [`PhaseState::NotRun`]. Failures of other phases are recorded and the
/// run continues.
pub fn run_all(phases: &[Box<dyn Task>], ctx: &Context) -> RunReport {
    let mut results: Vec<PhaseResult> = phases
        .iter()
        .map(|p| PhaseResult::pending(p.as_ref()))
        .collect();
    let mut halted = None;

    for (phase, result) in phases.iter().zip(results.iter_mut()) {
        if halted.is_some() {
            result.state = PhaseState::NotRun;
            ctx.log.record_task(&result.name, TaskStatus::NotRun, None);
            continue;
        }

        result.state = PhaseState::Running;
        let (state, message) = execute(phase.as_ref(), ctx);
        result.state = state;
        result.message = message;

        if state == PhaseState::Failed && result.fatal {
            ctx.log.error(&format!(
                "fatal phase '{}' failed; halting. Re-running is safe once the cause is fixed.",
                result.name
            ));
            halted = Some(TaskError::Fatal {
                phase: result.name.clone(),
                reason: result.message.clone().unwrap_or_default(),
            });
        }
    }

    RunReport { results, halted }
}

/// Shared helpers for phase unit tests.
#[cfg(test)]
pub mod test_helpers {
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::config::{RunConfig, Settings};
    use crate::exec::Executor;
    use crate::logging::{Log, Logger};
    use crate::operations::{MockDownloader, MockFileSystemOps};
    use crate::platform::{Distro, PlatformProfile};
    use crate::resources::test_helpers::MockExecutor;

    use super::{Context, HostEnv};

    /// Ubuntu profile.
    #[must_use]
    pub fn ubuntu() -> PlatformProfile {
        PlatformProfile::linux(Distro::Ubuntu)
    }

    /// Arch Linux profile.
    #[must_use]
    pub fn arch() -> PlatformProfile {
        PlatformProfile::linux(Distro::Arch)
    }

    /// Apple Silicon macOS profile.
    #[must_use]
    pub fn macos() -> PlatformProfile {
        PlatformProfile::macos("aarch64")
    }

    /// Build a [`Context`] for `/home/me` with default settings, an empty
    /// in-memory filesystem and a downloader that expects no calls.
    pub fn make_context(profile: PlatformProfile, executor: Arc<dyn Executor>) -> Context {
        Context {
            settings: Arc::new(Settings::default()),
            profile: Arc::new(profile),
            run: RunConfig::default(),
            log: Arc::new(Logger::new(None)),
            home: PathBuf::from("/home/me"),
            host: HostEnv {
                user: "me".to_string(),
                login_shell: Some("/bin/bash".to_string()),
                ci: false,
            },
            executor,
            fs_ops: Arc::new(MockFileSystemOps::new()),
            downloader: Arc::new(MockDownloader::new()),
        }
    }

    /// Like [`make_context`], also returning the [`Logger`] so tests can
    /// inspect recorded phases and warnings.
    #[must_use]
    pub fn make_context_with_log(
        profile: PlatformProfile,
        executor: Arc<dyn Executor>,
    ) -> (Context, Arc<Logger>) {
        let log = Arc::new(Logger::new(None));
        let ctx = make_context(profile, executor).with_log(Arc::clone(&log) as Arc<dyn Log>);
        (ctx, log)
    }

    /// A context whose executor fails every call, plus its logger.
    #[must_use]
    pub fn make_static_context(profile: PlatformProfile) -> (Context, Arc<Logger>) {
        make_context_with_log(profile, Arc::new(MockExecutor::with_responses(vec![])))
    }

    /// Settings with a repository URL configured.
    #[must_use]
    pub fn settings_with_repo() -> Settings {
        let mut settings = Settings::default();
        settings.repository.url = "https://example.com/me/dotfiles.git".to_string();
        settings
    }
}
