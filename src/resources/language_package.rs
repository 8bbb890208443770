//! Language ecosystem packages (Ruby gems, global npm packages).
use std::collections::HashSet;

use anyhow::Result;

use super::{Applicable, ResourceChange, ResourceState};
use crate::exec::{ExecResult, Executor};

/// Supported language package ecosystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ecosystem {
    /// RubyGems via `gem`.
    Gem,
    /// Global npm packages via `npm`.
    Npm,
}

impl Ecosystem {
    /// Program name of the ecosystem's package tool.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Gem => "gem",
            Self::Npm => "npm",
        }
    }

    /// Package name of a manifest spec (`name`, `name@1.2.3`,
    /// `@scope/name@1.2.3`).
    #[must_use]
    pub fn package_name(self, spec: &str) -> String {
        match self {
            Self::Gem => spec.split_whitespace().next().unwrap_or(spec).to_string(),
            Self::Npm => {
                let (scope, rest) = spec
                    .strip_prefix('@')
                    .map_or(("", spec), |rest| ("@", rest));
                let name = rest.split_once('@').map_or(rest, |(name, _)| name);
                format!("{scope}{name}")
            }
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

/// An ecosystem's package tool bound to the program path and environment to
/// run it with.
#[derive(Debug)]
pub struct LanguageTool<'a> {
    /// Which ecosystem.
    pub ecosystem: Ecosystem,
    /// Program to run (a version-manager shim or a `PATH` lookup).
    pub program: String,
    env: Vec<(&'static str, String)>,
    executor: &'a dyn Executor,
}

impl<'a> LanguageTool<'a> {
    /// Create a tool binding.
    #[must_use]
    pub const fn new(
        ecosystem: Ecosystem,
        program: String,
        env: Vec<(&'static str, String)>,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            ecosystem,
            program,
            env,
            executor,
        }
    }

    fn env_refs(&self) -> Vec<(&str, &str)> {
        self.env.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }

    /// Names of globally installed packages, from one bulk query.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot be spawned or npm's JSON output
    /// cannot be parsed.
    pub fn installed(&self) -> Result<HashSet<String>> {
        let env = self.env_refs();
        match self.ecosystem {
            Ecosystem::Gem => {
                let result = self.executor.run_unchecked_with_env(
                    &self.program,
                    &["list", "--no-versions"],
                    &env,
                )?;
                Ok(parse_gem_list(&result))
            }
            Ecosystem::Npm => {
                // npm exits non-zero on peer-dependency problems but still
                // prints the tree.
                let result = self.executor.run_unchecked_with_env(
                    &self.program,
                    &["ls", "-g", "--depth=0", "--json"],
                    &env,
                )?;
                parse_npm_tree(&result.stdout)
            }
        }
    }

    /// Install one package spec.
    ///
    /// # Errors
    ///
    /// Returns an error if the install command fails.
    pub fn install(&self, spec: &str) -> Result<()> {
        let env = self.env_refs();
        match self.ecosystem {
            Ecosystem::Gem => {
                let mut args = vec!["install", "--no-document"];
                args.extend(spec.split_whitespace());
                self.executor.run_with_env(&self.program, &args, &env)?;
            }
            Ecosystem::Npm => {
                self.executor
                    .run_with_env(&self.program, &["install", "-g", spec], &env)?;
            }
        }
        Ok(())
    }
}

fn parse_gem_list(result: &ExecResult) -> HashSet<String> {
    if !result.success {
        return HashSet::new();
    }
    result
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("***"))
        .map(String::from)
        .collect()
}

fn parse_npm_tree(stdout: &str) -> Result<HashSet<String>> {
    if stdout.trim().is_empty() {
        return Ok(HashSet::new());
    }
    let tree: serde_json::Value = serde_json::from_str(stdout)
        .map_err(|e| anyhow::anyhow!("unexpected `npm ls` output: {e}"))?;
    Ok(tree
        .get("dependencies")
        .and_then(serde_json::Value::as_object)
        .map(|deps| deps.keys().cloned().collect())
        .unwrap_or_default())
}

/// One package spec from a secondary manifest.
#[derive(Debug)]
pub struct LanguagePackageResource<'a> {
    /// Spec as written in the manifest.
    pub spec: String,
    tool: &'a LanguageTool<'a>,
}

impl<'a> LanguagePackageResource<'a> {
    /// Create a package resource.
    #[must_use]
    pub const fn new(spec: String, tool: &'a LanguageTool<'a>) -> Self {
        Self { spec, tool }
    }

    /// Determine the state from the installed package names.
    #[must_use]
    pub fn state_from_installed(&self, installed: &HashSet<String>) -> ResourceState {
        if installed.contains(&self.tool.ecosystem.package_name(&self.spec)) {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        }
    }
}

impl Applicable for LanguagePackageResource<'_> {
    fn description(&self) -> String {
        format!("{} ({})", self.spec, self.tool.ecosystem)
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.tool.install(&self.spec)?;
        Ok(ResourceChange::Applied)
    }
}
