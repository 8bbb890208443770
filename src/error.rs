//! Domain-specific error types for the bootstrap engine.
//!
//! Internal modules return typed errors (e.g., [`PlatformError`],
//! [`TaskError`]) while the command handler at the CLI boundary converts
//! them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! BootstrapError
//! ├── Config(ConfigError)     : settings and manifest parsing
//! ├── Task(TaskError)         : fatal phases and phase ordering
//! ├── Resource(ResourceError) : external commands and downloads
//! └── Platform(PlatformError) : OS / distro detection
//! ```

use thiserror::Error;

/// Top-level error type for the bootstrap engine.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Configuration-related error (settings file, manifests).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Phase execution error (fatal phase, ordering problems).
    #[error("Phase execution error: {0}")]
    Task(#[from] TaskError),

    /// Resource operation error (command failure, download failure).
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Platform detection error.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

/// Errors that arise from loading settings and manifests.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings file contains invalid TOML or unknown keys.
    #[error("Invalid TOML in {file}: {message}")]
    InvalidSyntax {
        /// Path of the offending file.
        file: String,
        /// Parser message.
        message: String,
    },

    /// A manifest line could not be interpreted.
    #[error("{file}:{line}: {message}")]
    InvalidManifestLine {
        /// Path of the manifest.
        file: String,
        /// One-based line number.
        line: usize,
        /// What is wrong with the line.
        message: String,
    },

    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise while sequencing and running phases.
#[derive(Error, Debug)]
pub enum TaskError {
    /// A phase marked fatal failed; the run halts.
    #[error("Phase '{phase}' failed: {reason}")]
    Fatal {
        /// Name of the phase that failed.
        phase: String,
        /// Proximate cause, usually the failing command.
        reason: String,
    },

    /// A phase depends on a phase that is not in the list.
    #[error("Phase '{phase}' depends on a phase that is not scheduled")]
    MissingDependency {
        /// Name of the dependent phase.
        phase: String,
    },

    /// A phase is declared before one of its predecessors.
    #[error("Phase '{phase}' is declared before its predecessor '{predecessor}'")]
    OutOfOrder {
        /// Name of the dependent phase.
        phase: String,
        /// Name of the predecessor declared too late.
        predecessor: String,
    },
}

/// Errors that arise from resource operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A command exited non-zero.
    #[error("{command} failed (exit {code}): {stderr}")]
    CommandFailed {
        /// Command with its arguments, e.g. `sudo apt-get update -q` or
        /// `git pull --ff-only in /home/me/.dotfiles`.
        command: String,
        /// Exit code, `-1` when terminated by a signal.
        code: i32,
        /// Trimmed standard error.
        stderr: String,
    },

    /// A required program is absent and cannot be installed automatically.
    #[error("required program '{0}' not found on PATH")]
    MissingPrerequisite(String),

    /// A download failed.
    #[error("download of {url} failed: {reason}")]
    Download {
        /// URL that was requested.
        url: String,
        /// Transport or HTTP error.
        reason: String,
    },
}

/// Errors that arise from platform detection.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The operating system family is not supported.
    #[error("Unsupported operating system: {platform}")]
    Unsupported {
        /// OS identifier as reported by the build target.
        platform: String,
    },

    /// The Linux distribution id is not one of the supported ids.
    #[error("Unsupported Linux distribution '{0}' (expected ubuntu, debian, arch or cachyos)")]
    UnsupportedDistro(String),

    /// Platform detection failed (e.g. distro id file missing or unreadable).
    #[error("Platform detection failed: {0}")]
    DetectionFailed(String),
}
