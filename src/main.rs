//! `bootstrap` binary entry point.
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use dotfiles_bootstrap::cli::Cli;
use dotfiles_bootstrap::commands;
use dotfiles_bootstrap::logging::{self, Logger};

/// Exit status after an interrupt (128 + SIGINT).
const INTERRUPTED: i32 = 130;

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version land here too and exit 0.
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    let log_file = logging::log_file_path("bootstrap");
    logging::init_subscriber(cli.verbose, log_file.as_deref());
    let log = Arc::new(Logger::new(log_file));

    let handler_log = Arc::clone(&log);
    if let Err(e) = ctrlc::set_handler(move || {
        handler_log.error("interrupted; re-running bootstrap is safe and resumes where it stopped");
        std::process::exit(INTERRUPTED);
    }) {
        log.debug(&format!("cannot install interrupt handler: {e}"));
    }

    match commands::bootstrap::run(&cli, &log) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            log.error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
