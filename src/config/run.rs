//! Invocation options that shape a single run.

/// Options parsed from the command line; immutable for the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunConfig {
    /// Report intended actions without performing any mutation.
    pub dry_run: bool,
    /// Skip the platform package phase.
    pub skip_packages: bool,
    /// Skip the language runtime and language package phases.
    pub skip_runtimes: bool,
}
