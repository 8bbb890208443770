//! Runtime version manager (asdf) plugins and tool versions.
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{Applicable, ResourceChange, ResourceState};
use crate::config::tool_versions::ToolVersionSpec;
use crate::exec::{ExecResult, Executor};

/// An asdf installation rooted at `root`.
///
/// Commands run `<root>/bin/asdf` directly (or the program chosen with
/// [`with_program`](Self::with_program)) with `ASDF_DIR` and
/// `ASDF_DATA_DIR` pointing at `root`, so nothing depends on the user's
/// shell having sourced asdf yet.
#[derive(Debug)]
pub struct VersionManager<'a> {
    root: PathBuf,
    program: PathBuf,
    executor: &'a dyn Executor,
}

impl<'a> VersionManager<'a> {
    /// Bind the installation at `root` to `executor`.
    #[must_use]
    pub fn new(root: PathBuf, executor: &'a dyn Executor) -> Self {
        let program = root.join("bin").join("asdf");
        Self {
            root,
            program,
            executor,
        }
    }

    /// Run `program` instead of `<root>/bin/asdf`, e.g. an `asdf` found on
    /// `PATH` when `root` is only the data directory.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Installation root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `asdf` entry point used for every command.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Directory holding the tool shims (`gem`, `npm`, ...).
    #[must_use]
    pub fn shims_dir(&self) -> PathBuf {
        self.root.join("shims")
    }

    /// Environment every asdf (and shim) invocation needs.
    #[must_use]
    pub fn env(&self) -> Vec<(&'static str, String)> {
        let root = self.root.to_string_lossy().into_owned();
        vec![("ASDF_DIR", root.clone()), ("ASDF_DATA_DIR", root)]
    }

    fn query(&self, args: &[&str]) -> Result<ExecResult> {
        let program = self.program();
        let env = self.env();
        let env: Vec<(&str, &str)> = env.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.executor
            .run_unchecked_with_env(&program.to_string_lossy(), args, &env)
    }

    fn run(&self, args: &[&str]) -> Result<ExecResult> {
        let program = self.program();
        let env = self.env();
        let env: Vec<(&str, &str)> = env.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.executor
            .run_with_env(&program.to_string_lossy(), args, &env)
    }

    /// Names of installed plugins (`asdf plugin list`).
    ///
    /// # Errors
    ///
    /// Returns an error if asdf cannot be spawned.
    pub fn plugins(&self) -> Result<HashSet<String>> {
        let result = self.query(&["plugin", "list"])?;
        Ok(parse_listing(&result, "No plugins"))
    }

    /// Versions of `tool` already installed (`asdf list <tool>`).
    ///
    /// # Errors
    ///
    /// Returns an error if asdf cannot be spawned.
    pub fn installed_versions(&self, tool: &str) -> Result<HashSet<String>> {
        let result = self.query(&["list", tool])?;
        Ok(parse_listing(&result, "No versions"))
    }

    /// `asdf plugin add <name>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub fn add_plugin(&self, name: &str) -> Result<()> {
        self.run(&["plugin", "add", name])?;
        Ok(())
    }

    /// `asdf plugin update <name>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub fn update_plugin(&self, name: &str) -> Result<()> {
        self.run(&["plugin", "update", name])?;
        Ok(())
    }

    /// `asdf install <tool> <version>`, attached to the terminal so long
    /// builds show progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the install fails.
    pub fn install(&self, spec: &ToolVersionSpec) -> Result<()> {
        let program = self.program();
        let env = self.env();
        let env: Vec<(&str, &str)> = env.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.executor.run_interactive(
            &program.to_string_lossy(),
            &["install", &spec.tool, &spec.version],
            &env,
        )?;
        Ok(())
    }
}

/// First token of every listing line, with the current-version marker
/// stripped. A failed query or an "empty" notice yields nothing.
fn parse_listing(result: &ExecResult, empty_notice: &str) -> HashSet<String> {
    if !result.success {
        return HashSet::new();
    }
    result
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with(empty_notice))
        .filter_map(|line| line.trim_start_matches('*').split_whitespace().next())
        .map(String::from)
        .collect()
}

/// An asdf plugin.
#[derive(Debug)]
pub struct PluginResource<'a> {
    /// Plugin name.
    pub name: String,
    manager: &'a VersionManager<'a>,
}

impl<'a> PluginResource<'a> {
    /// Create a plugin resource.
    #[must_use]
    pub const fn new(name: String, manager: &'a VersionManager<'a>) -> Self {
        Self { name, manager }
    }

    /// Determine the state from a pre-fetched plugin list.
    #[must_use]
    pub fn state_from_installed(&self, installed: &HashSet<String>) -> ResourceState {
        if installed.contains(&self.name) {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        }
    }
}

impl Applicable for PluginResource<'_> {
    fn description(&self) -> String {
        format!("asdf plugin {}", self.name)
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.manager.add_plugin(&self.name)?;
        Ok(ResourceChange::Applied)
    }
}

/// One declared tool version.
#[derive(Debug)]
pub struct ToolVersionResource<'a> {
    /// Tool and version to ensure.
    pub spec: ToolVersionSpec,
    manager: &'a VersionManager<'a>,
}

impl<'a> ToolVersionResource<'a> {
    /// Create a tool version resource.
    #[must_use]
    pub const fn new(spec: ToolVersionSpec, manager: &'a VersionManager<'a>) -> Self {
        Self { spec, manager }
    }

    /// Determine the state from the versions already installed for the tool.
    #[must_use]
    pub fn state_from_installed(&self, installed: &HashSet<String>) -> ResourceState {
        if installed.contains(&self.spec.version) {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        }
    }
}

impl Applicable for ToolVersionResource<'_> {
    fn description(&self) -> String {
        self.spec.to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.manager.install(&self.spec)?;
        Ok(ResourceChange::Applied)
    }
}
