//! Git checkout resource, used for the dotfiles repository and the version
//! manager.
use std::path::PathBuf;

use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;
use crate::operations::FileSystemOps;

/// A git repository checked out at `dir`.
#[derive(Debug)]
pub struct GitCheckoutResource<'a> {
    /// Clone URL.
    pub url: String,
    /// Branch or tag passed to `git clone --branch`; empty for the remote
    /// default branch.
    pub reference: String,
    /// Checkout directory.
    pub dir: PathBuf,
    fs: &'a dyn FileSystemOps,
    executor: &'a dyn Executor,
}

impl<'a> GitCheckoutResource<'a> {
    /// Create a checkout resource.
    #[must_use]
    pub const fn new(
        url: String,
        reference: String,
        dir: PathBuf,
        fs: &'a dyn FileSystemOps,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            url,
            reference,
            dir,
            fs,
            executor,
        }
    }

    /// Fast-forward the existing checkout.
    ///
    /// Returns [`ResourceChange::AlreadyCorrect`] when git reports nothing to
    /// pull.
    ///
    /// # Errors
    ///
    /// Returns an error if `git pull --ff-only` fails (diverged history,
    /// network failure, local changes).
    pub fn update(&self) -> Result<ResourceChange> {
        let result = self
            .executor
            .run_in(&self.dir, "git", &["pull", "--ff-only"])?;
        if is_up_to_date(&result.stdout) {
            Ok(ResourceChange::AlreadyCorrect)
        } else {
            Ok(ResourceChange::Applied)
        }
    }
}

fn is_up_to_date(stdout: &str) -> bool {
    let out = stdout.trim();
    out.starts_with("Already up to date") || out.starts_with("Already up-to-date")
}

impl Applicable for GitCheckoutResource<'_> {
    fn description(&self) -> String {
        format!("{} → {}", self.url, self.dir.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let dir = self.dir.to_string_lossy();
        let mut args = vec!["clone"];
        if !self.reference.is_empty() {
            args.extend(["--branch", self.reference.as_str()]);
        }
        args.extend([self.url.as_str(), &*dir]);
        self.executor.run("git", &args)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for GitCheckoutResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        if self.fs.exists(&self.dir.join(".git")) {
            Ok(ResourceState::Correct)
        } else if self.fs.exists(&self.dir) {
            Ok(ResourceState::Invalid {
                reason: format!("{} exists but is not a git checkout", self.dir.display()),
            })
        } else {
            Ok(ResourceState::Missing)
        }
    }
}
