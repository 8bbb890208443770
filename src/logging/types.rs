//! Core logging types: phase entries, status, and the [`Log`] trait.

/// Phase execution result for summary reporting.
#[derive(Debug, Clone)]
pub struct TaskEntry {
    /// Human-readable phase name.
    pub name: String,
    /// Final status of the phase.
    pub status: TaskStatus,
    /// Optional detail message (e.g., skip reason or error description).
    pub message: Option<String>,
}

/// Status of a finished (or never started) phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Phase completed successfully.
    Ok,
    /// Phase had nothing to do, did not apply, or was skipped on request.
    Skipped,
    /// Phase ran in dry-run mode; no changes were applied.
    DryRun,
    /// Phase encountered an error.
    Failed,
    /// Phase never started because an earlier fatal phase failed.
    NotRun,
}

/// Abstraction over logging backends.
///
/// Phase code logs through this trait so tests can substitute an
/// isolated [`Logger`](super::logger::Logger).
pub trait Log: Send + Sync {
    /// Log a stage header (phase banner).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a phase result for the summary.
    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>);
}
