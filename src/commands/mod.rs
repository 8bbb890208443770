//! Top-level command orchestration.
pub mod bootstrap;

use std::path::Path;

use crate::cli::Cli;
use crate::config::{Settings, default_settings_path};
use crate::error::{BootstrapError, ConfigError};
use crate::logging::Log;
use crate::platform::PlatformProfile;

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates platform detection and settings loading so the command
/// body only deals with phases.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected platform.
    pub profile: PlatformProfile,
    /// Settings after file, environment and command-line overrides.
    pub settings: Settings,
}

impl CommandSetup {
    /// Detect the platform and load the settings.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Platform`] on an unsupported host and
    /// [`BootstrapError::Config`] if the settings file is missing (when
    /// given explicitly) or invalid.
    pub fn init(cli: &Cli, home: &Path, log: &dyn Log) -> Result<Self, BootstrapError> {
        log.stage("Detecting platform");
        let profile = PlatformProfile::detect()?;
        log.info(&format!("platform: {profile}"));

        let settings = load_settings(cli, home, |key| std::env::var(key).ok())?;
        log.debug(&format!(
            "dotfiles: {} ({})",
            settings.repository.directory, settings.repository.reference
        ));
        log.debug(&format!(
            "version manager: {}",
            settings.version_manager.directory
        ));

        Ok(Self { profile, settings })
    }
}

/// Resolve settings from the file, then the environment, then the
/// command line.
///
/// # Errors
///
/// Returns [`ConfigError`] if the settings file cannot be read or parsed.
pub fn load_settings(
    cli: &Cli,
    home: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Settings, ConfigError> {
    let default_path = default_settings_path(lookup("XDG_CONFIG_HOME").as_deref(), home);
    let mut settings = Settings::load(cli.config.as_deref(), &default_path)?;
    settings.apply_env(lookup);
    settings.apply_overrides(cli.repo.as_deref(), cli.dir.as_deref());
    Ok(settings)
}
