//! Generic resource processing loop: check state, apply, collect stats.
use anyhow::Result;

use super::context::Context;
use crate::resources::{Applicable, Resource, ResourceChange, ResourceState};

/// Result of a single phase execution.
///
/// # Examples
///
/// ```
/// use dotfiles_bootstrap::tasks::TaskResult;
///
/// let skipped = TaskResult::Skipped("already satisfied".into());
/// assert!(matches!(skipped, TaskResult::Skipped(_)));
/// assert!(matches!(TaskResult::DryRun, TaskResult::DryRun));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    /// Phase completed (possibly with recoverable item failures).
    Ok,
    /// Phase had nothing to do, or was skipped on request.
    Skipped(String),
    /// Phase would have mutated state but ran in dry-run mode.
    DryRun,
}

/// Counters for batch phases that process many items.
///
/// # Examples
///
/// ```
/// use dotfiles_bootstrap::tasks::TaskStats;
///
/// let stats = TaskStats { changed: 3, already_ok: 10, ..TaskStats::default() };
/// assert_eq!(stats.summary(false), "3 changed, 10 already ok");
/// assert_eq!(stats.summary(true), "3 would change, 10 already ok");
///
/// let stats = TaskStats { changed: 1, already_ok: 2, skipped: 0, failed: 1 };
/// assert_eq!(stats.summary(false), "1 changed, 2 already ok, 1 failed");
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    /// Items changed (or that would change in dry-run mode).
    pub changed: u32,
    /// Items already in the desired state.
    pub already_ok: u32,
    /// Items that could not be applied without a hard error.
    pub skipped: u32,
    /// Items whose apply failed recoverably.
    pub failed: u32,
}

impl TaskStats {
    /// Create a new empty stats counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Format the summary string (e.g. "3 changed, 10 already ok, 1 failed").
    #[must_use]
    pub fn summary(&self, dry_run: bool) -> String {
        let verb = if dry_run { "would change" } else { "changed" };
        let mut out = format!("{} {verb}, {} already ok", self.changed, self.already_ok);
        if self.skipped > 0 {
            out.push_str(&format!(", {} skipped", self.skipped));
        }
        if self.failed > 0 {
            out.push_str(&format!(", {} failed", self.failed));
        }
        out
    }

    /// Log the summary and return the phase result.
    ///
    /// Nothing changed and nothing failed means the phase was already
    /// satisfied; recoverable failures still finish as [`TaskResult::Ok`].
    #[must_use]
    pub fn finish(self, ctx: &Context) -> TaskResult {
        ctx.log.info(&self.summary(ctx.dry_run()));
        if self.changed == 0 && self.failed == 0 {
            TaskResult::Skipped(if self.skipped == 0 {
                "already satisfied".to_string()
            } else {
                format!("nothing to apply, {} skipped", self.skipped)
            })
        } else if ctx.dry_run() {
            TaskResult::DryRun
        } else {
            TaskResult::Ok
        }
    }
}

impl std::ops::AddAssign for TaskStats {
    fn add_assign(&mut self, other: Self) {
        self.changed += other.changed;
        self.already_ok += other.already_ok;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// How each [`ResourceState`] is handled by the processing loop.
///
/// # Examples
///
/// ```
/// use dotfiles_bootstrap::tasks::ProcessOpts;
///
/// let opts = ProcessOpts::apply_all("install");
/// assert!(opts.fix_incorrect && opts.fix_missing && opts.bail_on_error);
///
/// let opts = ProcessOpts::install_missing("install");
/// assert!(!opts.fix_incorrect && opts.fix_missing && !opts.bail_on_error);
/// ```
#[derive(Debug)]
pub struct ProcessOpts<'a> {
    /// Verb for log messages (e.g., "install", "clone", "add").
    pub verb: &'a str,
    /// Apply the change for `Incorrect` resources.
    pub fix_incorrect: bool,
    /// Apply the change for `Missing` resources.
    pub fix_missing: bool,
    /// Propagate apply errors. If `false`, warn and count the item as failed.
    pub bail_on_error: bool,
}

impl<'a> ProcessOpts<'a> {
    /// Fix both missing and incorrect resources, bailing on errors.
    #[must_use]
    pub const fn apply_all(verb: &'a str) -> Self {
        Self {
            verb,
            fix_incorrect: true,
            fix_missing: true,
            bail_on_error: true,
        }
    }

    /// Install only missing resources, warning on errors instead of bailing.
    #[must_use]
    pub const fn install_missing(verb: &'a str) -> Self {
        Self {
            verb,
            fix_incorrect: false,
            fix_missing: true,
            bail_on_error: false,
        }
    }

    /// Warn on errors instead of bailing.
    #[must_use]
    pub const fn no_bail(mut self) -> Self {
        self.bail_on_error = false;
        self
    }
}

/// Process resources that determine their own state.
///
/// # Errors
///
/// Returns an error if a state query fails, or if an apply fails and
/// `opts.bail_on_error` is set.
pub fn process_resources<R: Resource>(
    ctx: &Context,
    resources: impl IntoIterator<Item = R>,
    opts: &ProcessOpts,
) -> Result<TaskStats> {
    let mut stats = TaskStats::new();
    for resource in resources {
        let current = resource.current_state()?;
        stats += process_single(ctx, &resource, current, opts)?;
    }
    Ok(stats)
}

/// Process resources whose states were computed by one bulk query.
///
/// # Errors
///
/// Returns an error if an apply fails and `opts.bail_on_error` is set.
pub fn process_resource_states<R: Applicable>(
    ctx: &Context,
    resource_states: impl IntoIterator<Item = (R, ResourceState)>,
    opts: &ProcessOpts,
) -> Result<TaskStats> {
    let mut stats = TaskStats::new();
    for (resource, current) in resource_states {
        stats += process_single(ctx, &resource, current, opts)?;
    }
    Ok(stats)
}

/// Process a single resource given its current state, returning a stats delta.
///
/// # Errors
///
/// See [`apply_resource`].
pub fn process_single<R: Applicable + ?Sized>(
    ctx: &Context,
    resource: &R,
    resource_state: ResourceState,
    opts: &ProcessOpts,
) -> Result<TaskStats> {
    let desc = resource.description();
    ctx.log.debug(&format!("check {desc}: {resource_state:?}"));
    let mut delta = TaskStats::new();
    match resource_state {
        ResourceState::Correct => {
            ctx.log.debug(&format!("ok: {desc}"));
            delta.already_ok += 1;
        }
        ResourceState::Invalid { reason } => {
            ctx.log.warn(&format!("skipping {desc}: {reason}"));
            delta.skipped += 1;
        }
        ResourceState::Missing if !opts.fix_missing => {
            delta.skipped += 1;
        }
        ResourceState::Incorrect { .. } if !opts.fix_incorrect => {
            ctx.log.debug(&format!("leaving {desc} as is"));
            delta.already_ok += 1;
        }
        resource_state @ (ResourceState::Missing | ResourceState::Incorrect { .. }) => {
            if ctx.dry_run() {
                let msg = if let ResourceState::Incorrect { ref current } = resource_state {
                    format!("would {} {desc} (currently {current})", opts.verb)
                } else {
                    format!("would {}: {desc}", opts.verb)
                };
                ctx.log.dry_run(&msg);
                delta.changed += 1;
                return Ok(delta);
            }
            delta += apply_resource(ctx, resource, opts)?;
        }
    }
    Ok(delta)
}

/// Apply a single resource change, returning a stats delta.
///
/// # Errors
///
/// Returns the apply error (or a skip turned into an error) when
/// `opts.bail_on_error` is set.
pub fn apply_resource<R: Applicable + ?Sized>(
    ctx: &Context,
    resource: &R,
    opts: &ProcessOpts,
) -> Result<TaskStats> {
    let desc = resource.description();
    let mut delta = TaskStats::new();
    let change = match resource.apply() {
        Ok(change) => change,
        Err(e) => {
            if opts.bail_on_error {
                return Err(e.context(format!("failed to {} {desc}", opts.verb)));
            }
            ctx.log.warn(&format!("failed to {} {desc}: {e:#}", opts.verb));
            delta.failed += 1;
            return Ok(delta);
        }
    };

    match change {
        ResourceChange::Applied => {
            ctx.log.info(&format!("{}: {desc}", opts.verb));
            delta.changed += 1;
        }
        ResourceChange::AlreadyCorrect => {
            delta.already_ok += 1;
        }
        ResourceChange::Skipped { reason } => {
            if opts.bail_on_error {
                anyhow::bail!("failed to {} {desc}: {reason}", opts.verb);
            }
            ctx.log.warn(&format!("skipped {desc}: {reason}"));
            delta.skipped += 1;
        }
    }
    Ok(delta)
}
