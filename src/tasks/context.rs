use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::config::{RunConfig, Settings, expand_home};
use crate::exec::Executor;
use crate::logging::Log;
use crate::operations::{Downloader, FileSystemOps, SystemFileSystemOps, UreqDownloader};
use crate::platform::PlatformProfile;

/// Facts about the invoking account read once from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEnv {
    /// Login name (`$USER`, else `$LOGNAME`).
    pub user: String,
    /// Current `$SHELL`, used when the account database cannot be queried.
    pub login_shell: Option<String>,
    /// Running under CI (`$CI` set to anything but `false`).
    pub ci: bool,
}

impl HostEnv {
    /// Read the host facts from `lookup` (normally [`std::env::var`]).
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            user: get("USER").or_else(|| get("LOGNAME")).unwrap_or_default(),
            login_shell: get("SHELL"),
            ci: get("CI").is_some_and(|v| v != "false" && v != "0"),
        }
    }

    /// Read the host facts from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Shared context for phase execution.
///
/// Everything a phase reads is in here; nothing is read from ambient
/// globals once the run has started.
pub struct Context {
    /// Settings after file, environment and command-line overrides.
    pub settings: Arc<Settings>,
    /// Detected platform.
    pub profile: Arc<PlatformProfile>,
    /// Invocation options.
    pub run: RunConfig,
    /// Logger for output and phase recording.
    pub log: Arc<dyn Log>,
    /// User's home directory.
    pub home: PathBuf,
    /// Account facts.
    pub host: HostEnv,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Filesystem queries (injectable for testing).
    pub fs_ops: Arc<dyn FileSystemOps>,
    /// HTTPS downloads (injectable for testing).
    pub downloader: Arc<dyn Downloader>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("settings", &"<Settings>")
            .field("profile", &self.profile)
            .field("run", &self.run)
            .field("log", &"<dyn Log>")
            .field("home", &self.home)
            .field("host", &self.host)
            .field("executor", &"<dyn Executor>")
            .field("fs_ops", &"<dyn FileSystemOps>")
            .field("downloader", &"<dyn Downloader>")
            .finish()
    }
}

impl Context {
    /// Creates a new context for phase execution against the real host.
    ///
    /// # Errors
    ///
    /// Returns an error if the HOME environment variable is not set.
    pub fn new(
        settings: Arc<Settings>,
        profile: Arc<PlatformProfile>,
        run: RunConfig,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
    ) -> Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))?;
        Ok(Self {
            settings,
            profile,
            run,
            log,
            home: PathBuf::from(home),
            host: HostEnv::from_env(),
            executor,
            fs_ops: Arc::new(SystemFileSystemOps),
            downloader: Arc::new(UreqDownloader),
        })
    }

    /// Whether this is a preview run.
    #[must_use]
    pub const fn dry_run(&self) -> bool {
        self.run.dry_run
    }

    /// Dotfiles checkout directory.
    #[must_use]
    pub fn dotfiles_dir(&self) -> PathBuf {
        expand_home(&self.settings.repository.directory, &self.home)
    }

    /// Version manager installation directory.
    #[must_use]
    pub fn version_manager_dir(&self) -> PathBuf {
        expand_home(&self.settings.version_manager.directory, &self.home)
    }

    /// User-local customization script.
    #[must_use]
    pub fn extension_script(&self) -> PathBuf {
        expand_home(&self.settings.extension.script, &self.home)
    }

    /// Program used to reach Homebrew: the prefixed binary when installed
    /// there, else `brew` from `PATH`.
    #[must_use]
    pub fn brew_program(&self) -> String {
        let prefixed = self.profile.prefixed_bin("brew");
        if self.fs_ops.exists(&prefixed) {
            prefixed.to_string_lossy().into_owned()
        } else {
            "brew".to_string()
        }
    }

    /// Create a copy of this context with a different logger.
    #[must_use]
    pub fn with_log(&self, log: Arc<dyn Log>) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            profile: Arc::clone(&self.profile),
            run: self.run,
            log,
            home: self.home.clone(),
            host: self.host.clone(),
            executor: Arc::clone(&self.executor),
            fs_ops: Arc::clone(&self.fs_ops),
            downloader: Arc::clone(&self.downloader),
        }
    }

    /// Create a copy of this context with a different [`FileSystemOps`].
    #[must_use]
    pub fn with_fs_ops(&self, fs_ops: Arc<dyn FileSystemOps>) -> Self {
        Self {
            fs_ops,
            ..self.with_log(Arc::clone(&self.log))
        }
    }

    /// Create a copy of this context with a different [`Downloader`].
    #[must_use]
    pub fn with_downloader(&self, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            downloader,
            ..self.with_log(Arc::clone(&self.log))
        }
    }
}
