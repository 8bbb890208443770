//! Idempotent workstation bootstrap.
//!
//! Brings a fresh macOS, Debian/Ubuntu or Arch-family host to a configured
//! developer state by running an ordered list of check-then-act phases:
//! build tools, package manager, packages, the dotfiles checkout and its
//! setup script, language runtimes, the default login shell. Every phase can
//! be previewed with `--dry-run` and re-running is always safe.
//!
//! The public API is organised into four layers:
//!
//! - **[`config`]**: settings, run options and manifest parsing
//! - **[`resources`]**: idempotent `check + apply` primitives (packages, plugins, …)
//! - **[`tasks`]**: named, ordered phases wired to resources
//! - **[`commands`]**: the top-level `bootstrap` orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod operations;
pub mod platform;
pub mod resources;
pub mod tasks;

/// Version reported by `--version` and the run banner.
pub const VERSION: &str = match option_env!("BOOTSTRAP_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};
