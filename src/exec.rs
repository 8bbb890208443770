//! External command execution behind the [`Executor`] seam.
use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Output};

use crate::error::ResourceError;

/// Result of a command execution.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Captured standard output (empty for interactive commands).
    pub stdout: String,
    /// Captured standard error (empty for interactive commands).
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

impl ExecResult {
    /// Successful result carrying `stdout`.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }

    /// Failed result with exit code `code` and `stderr`.
    #[must_use]
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            code: Some(code),
        }
    }

    /// Convert a non-zero exit into a [`ResourceError::CommandFailed`]
    /// naming `command` (see [`command_line`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the command did not succeed.
    pub fn check(self, command: &str) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        Err(ResourceError::CommandFailed {
            command: command.to_string(),
            code: self.code.unwrap_or(-1),
            stderr: self.stderr.trim().to_string(),
        }
        .into())
    }
}

/// Longest argument shown in full by [`command_line`].
const MAX_ARG_LEN: usize = 48;

/// Render a command for error messages: the program followed by its
/// arguments.
///
/// An argument longer than 48 characters or spanning several lines (an
/// installer script passed to `bash -c`) is cut to the start of its first
/// line followed by `...`.
#[must_use]
pub fn command_line(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        let first = arg.lines().next().unwrap_or_default();
        if first.len() == arg.len() && arg.chars().count() <= MAX_ARG_LEN {
            line.push_str(arg);
        } else {
            line.extend(first.chars().take(MAX_ARG_LEN));
            line.push_str("...");
        }
    }
    line
}

/// Abstraction over process execution so phases can run against a
/// simulated host in tests.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run a command, failing on non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or exits non-zero.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command in `dir`, failing on non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or exits non-zero.
    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command with extra environment variables, failing on non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or exits non-zero.
    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult>;

    /// Run a command and return its result whatever the exit status.
    ///
    /// # Errors
    ///
    /// Returns an error only if the program cannot be spawned.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command with extra environment variables and return its result
    /// whatever the exit status.
    ///
    /// # Errors
    ///
    /// Returns an error only if the program cannot be spawned.
    fn run_unchecked_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult>;

    /// Run a command attached to the terminal (installers, password
    /// prompts, license dialogs). Output is not captured.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or exits non-zero.
    fn run_interactive(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult>;

    /// Check whether a program is available on `PATH`.
    fn which(&self, program: &str) -> bool;
}

/// [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

/// Execute a command and return the result, bailing on non-zero exit.
fn execute_checked(mut cmd: Command, command: &str) -> Result<ExecResult> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to execute: {command}"))?;
    ExecResult::from(output).check(command)
}

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        execute_checked(cmd, &command_line(program, args))
    }

    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(dir);
        let command = format!("{} in {}", command_line(program, args), dir.display());
        execute_checked(cmd, &command)
    }

    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args).envs(env.iter().copied());
        execute_checked(cmd, &command_line(program, args))
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult::from(output))
    }

    fn run_unchecked_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .envs(env.iter().copied())
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult::from(output))
    }

    fn run_interactive(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        let status = Command::new(program)
            .args(args)
            .envs(env.iter().copied())
            .status()
            .with_context(|| format!("failed to execute: {program}"))?;
        ExecResult {
            stdout: String::new(),
            stderr: String::new(),
            success: status.success(),
            code: status.code(),
        }
        .check(&command_line(program, args))
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}
