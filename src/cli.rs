//! Command-line interface definition.
use std::path::PathBuf;

use clap::Parser;

use crate::config::RunConfig;

/// Top-level CLI entry point for the workstation bootstrap.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "bootstrap",
    about = "Bring a fresh macOS or Linux workstation to a configured state",
    version = crate::VERSION
)]
pub struct Cli {
    /// Preview changes without applying
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Skip the platform package phase
    #[arg(long)]
    pub skip_packages: bool,

    /// Skip language runtimes and language packages
    #[arg(long)]
    pub skip_runtimes: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Settings file (default: $XDG_CONFIG_HOME/dotfiles/bootstrap.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the dotfiles checkout directory
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Override the dotfiles repository URL
    #[arg(long, value_name = "URL")]
    pub repo: Option<String>,
}

impl Cli {
    /// Invocation options handed to every phase.
    #[must_use]
    pub const fn run_config(&self) -> RunConfig {
        RunConfig {
            dry_run: self.dry_run,
            skip_packages: self.skip_packages,
            skip_runtimes: self.skip_runtimes,
        }
    }
}
