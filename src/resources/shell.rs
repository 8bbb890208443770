//! Shell registry (`/etc/shells`) and default login shell resources.
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;
use crate::operations::FileSystemOps;
use crate::platform::Os;

/// System list of permitted login shells.
pub const SHELLS_FILE: &str = "/etc/shells";

/// A shell path listed in the shell registry.
#[derive(Debug)]
pub struct ShellRegistryResource<'a> {
    shell: PathBuf,
    registry: PathBuf,
    fs: &'a dyn FileSystemOps,
    executor: &'a dyn Executor,
}

impl<'a> ShellRegistryResource<'a> {
    /// Ensure `shell` is listed in [`SHELLS_FILE`].
    #[must_use]
    pub fn new(shell: PathBuf, fs: &'a dyn FileSystemOps, executor: &'a dyn Executor) -> Self {
        Self {
            shell,
            registry: PathBuf::from(SHELLS_FILE),
            fs,
            executor,
        }
    }
}

impl Applicable for ShellRegistryResource<'_> {
    fn description(&self) -> String {
        format!("{} in {}", self.shell.display(), self.registry.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let shell = self.shell.to_string_lossy();
        let registry = self.registry.to_string_lossy();
        self.executor.run(
            "sudo",
            &[
                "sh",
                "-c",
                "printf '%s\\n' \"$1\" >> \"$2\"",
                "sh",
                &shell,
                &registry,
            ],
        )?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for ShellRegistryResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let content = match self.fs.read_to_string(&self.registry) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ResourceState::Missing),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("reading {}", self.registry.display())));
            }
        };
        let listed = content
            .lines()
            .map(str::trim)
            .any(|line| Path::new(line) == self.shell);
        Ok(if listed {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        })
    }
}

/// The account's login shell.
#[derive(Debug)]
pub struct DefaultShellResource<'a> {
    shell: PathBuf,
    user: String,
    os: Os,
    fallback: Option<String>,
    executor: &'a dyn Executor,
}

impl<'a> DefaultShellResource<'a> {
    /// Ensure `user`'s login shell is `shell`.
    ///
    /// `fallback` (usually `$SHELL`) is used when the account database
    /// cannot be queried.
    #[must_use]
    pub const fn new(
        shell: PathBuf,
        user: String,
        os: Os,
        fallback: Option<String>,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            shell,
            user,
            os,
            fallback,
            executor,
        }
    }

    /// Read the login shell from the account database.
    fn login_shell(&self) -> Result<Option<String>> {
        let found = match self.os {
            Os::Linux => {
                let result = self.executor.run_unchecked("getent", &["passwd", &self.user])?;
                result
                    .success
                    .then(|| result.stdout.trim().split(':').nth(6).map(String::from))
                    .flatten()
            }
            Os::MacOs => {
                let record = format!("/Users/{}", self.user);
                let result = self
                    .executor
                    .run_unchecked("dscl", &[".", "-read", &record, "UserShell"])?;
                result
                    .success
                    .then(|| {
                        result
                            .stdout
                            .trim()
                            .strip_prefix("UserShell:")
                            .map(|s| s.trim().to_string())
                    })
                    .flatten()
            }
        };
        Ok(found.or_else(|| self.fallback.clone()))
    }
}

impl Applicable for DefaultShellResource<'_> {
    fn description(&self) -> String {
        format!("login shell → {}", self.shell.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let shell = self.shell.to_string_lossy();
        self.executor.run_interactive("chsh", &["-s", &shell], &[])?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for DefaultShellResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        match self.login_shell()? {
            Some(current) if Path::new(&current) == self.shell => Ok(ResourceState::Correct),
            Some(current) if !current.is_empty() => Ok(ResourceState::Incorrect { current }),
            _ => Ok(ResourceState::Missing),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::MockFileSystemOps;
    use crate::resources::test_helpers::MockExecutor;

    #[test]
    fn registry_state_matches_whole_lines() {
        let executor = MockExecutor::ok("");
        let fs = MockFileSystemOps::new()
            .with_file(SHELLS_FILE, "# valid shells\n/bin/sh\n/bin/bash\n/usr/bin/zsh\n");
        let listed = ShellRegistryResource::new(PathBuf::from("/usr/bin/zsh"), &fs, &executor);
        assert_eq!(listed.current_state().unwrap(), ResourceState::Correct);

        let absent = ShellRegistryResource::new(PathBuf::from("/opt/homebrew/bin/zsh"), &fs, &executor);
        assert_eq!(absent.current_state().unwrap(), ResourceState::Missing);
    }

    #[test]
    fn registry_append_runs_through_sudo() {
        let executor = MockExecutor::ok("");
        let fs = MockFileSystemOps::new();
        let resource = ShellRegistryResource::new(PathBuf::from("/opt/homebrew/bin/zsh"), &fs, &executor);
        resource.apply().unwrap();
        assert_eq!(
            executor.calls(),
            vec!["sudo sh -c printf '%s\\n' \"$1\" >> \"$2\" sh /opt/homebrew/bin/zsh /etc/shells"]
        );
    }

    #[test]
    fn linux_login_shell_from_getent() {
        let executor = MockExecutor::ok("me:x:1000:1000:Me:/home/me:/bin/bash\n");
        let resource = DefaultShellResource::new(
            PathBuf::from("/usr/bin/zsh"),
            "me".to_string(),
            Os::Linux,
            None,
            &executor,
        );
        assert_eq!(
            resource.current_state().unwrap(),
            ResourceState::Incorrect {
                current: "/bin/bash".to_string()
            }
        );
        assert_eq!(executor.calls(), vec!["getent passwd me"]);
    }

    #[test]
    fn macos_login_shell_from_dscl() {
        let executor = MockExecutor::ok("UserShell: /opt/homebrew/bin/zsh\n");
        let resource = DefaultShellResource::new(
            PathBuf::from("/opt/homebrew/bin/zsh"),
            "me".to_string(),
            Os::MacOs,
            None,
            &executor,
        );
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
        assert_eq!(executor.calls(), vec!["dscl . -read /Users/me UserShell"]);
    }

    #[test]
    fn falls_back_to_shell_variable() {
        let executor = MockExecutor::fail();
        let resource = DefaultShellResource::new(
            PathBuf::from("/usr/bin/zsh"),
            "me".to_string(),
            Os::Linux,
            Some("/usr/bin/zsh".to_string()),
            &executor,
        );
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn unknown_login_shell_is_missing() {
        let executor = MockExecutor::fail();
        let resource = DefaultShellResource::new(
            PathBuf::from("/usr/bin/zsh"),
            "me".to_string(),
            Os::Linux,
            None,
            &executor,
        );
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
    }

    #[test]
    fn apply_runs_chsh() {
        let executor = MockExecutor::ok("");
        let resource = DefaultShellResource::new(
            PathBuf::from("/usr/bin/zsh"),
            "me".to_string(),
            Os::Linux,
            None,
            &executor,
        );
        assert_eq!(resource.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(executor.calls(), vec!["chsh -s /usr/bin/zsh"]);
    }
}
