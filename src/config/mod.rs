//! Settings, run options, and manifest formats.
pub mod package_list;
pub mod run;
pub mod tool_versions;
mod toml_loader;

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

pub use run::RunConfig;

/// Settings file name inside the `dotfiles` config directory.
pub const SETTINGS_FILE: &str = "bootstrap.toml";

/// Where the dotfiles repository comes from and where it is checked out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositorySettings {
    /// Clone URL. Empty means "not configured".
    pub url: String,
    /// Branch or tag to clone.
    pub reference: String,
    /// Checkout directory (`~/` is expanded).
    pub directory: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            reference: "main".to_string(),
            directory: "~/.dotfiles".to_string(),
        }
    }
}

/// The runtime version manager (asdf).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VersionManagerSettings {
    /// Clone URL.
    pub url: String,
    /// Pinned release tag.
    pub reference: String,
    /// Install directory (`~/` is expanded).
    pub directory: String,
    /// Version manifest path relative to the dotfiles checkout.
    pub manifest: String,
    /// Plugins to ensure in addition to the tools named in the manifest.
    pub plugins: Vec<String>,
}

impl Default for VersionManagerSettings {
    fn default() -> Self {
        Self {
            url: "https://github.com/asdf-vm/asdf.git".to_string(),
            reference: "v0.14.1".to_string(),
            directory: "~/.asdf".to_string(),
            manifest: ".tool-versions".to_string(),
            plugins: Vec::new(),
        }
    }
}

/// Minimal package set per package manager, installed before the clone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageSettings {
    /// Homebrew formulae.
    pub brew: Vec<String>,
    /// apt packages.
    pub apt: Vec<String>,
    /// pacman packages.
    pub pacman: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            brew: names(&["git", "curl", "zsh", "coreutils"]),
            apt: names(&["git", "curl", "zsh", "unzip", "ca-certificates"]),
            pacman: names(&["git", "curl", "zsh", "unzip"]),
        }
    }
}

/// Secondary manifests, relative to the dotfiles checkout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LanguagePackageSettings {
    /// Ruby gems, one per line.
    pub gems: String,
    /// Global npm packages, one per line.
    pub npm: String,
}

impl Default for LanguagePackageSettings {
    fn default() -> Self {
        Self {
            gems: "default-gems".to_string(),
            npm: "default-npm-packages".to_string(),
        }
    }
}

/// Target login shell.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellSettings {
    /// Shell program name, resolved under the platform prefix.
    pub name: String,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            name: "zsh".to_string(),
        }
    }
}

/// User-local customization hook.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtensionSettings {
    /// Script run late in the run (`~/` is expanded).
    pub script: String,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        Self {
            script: "~/.bootstrap.local".to_string(),
        }
    }
}

/// All settings for a run, read from `bootstrap.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Dotfiles repository.
    pub repository: RepositorySettings,
    /// Runtime version manager.
    pub version_manager: VersionManagerSettings,
    /// Minimal package sets.
    pub packages: PackageSettings,
    /// Secondary package manifests.
    pub language_packages: LanguagePackageSettings,
    /// Default shell.
    pub shell: ShellSettings,
    /// Local customization hook.
    pub extension: ExtensionSettings,
    /// Manual follow-up steps printed at the end of the run.
    pub next_steps: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repository: RepositorySettings::default(),
            version_manager: VersionManagerSettings::default(),
            packages: PackageSettings::default(),
            language_packages: LanguagePackageSettings::default(),
            shell: ShellSettings::default(),
            extension: ExtensionSettings::default(),
            next_steps: names(&[
                "Restart your terminal (or run `exec $SHELL -l`) to pick up the new shell",
                "Open your editor and run its health check",
                "Create ~/.gitconfig.local with your git name and email",
            ]),
        }
    }
}

impl Settings {
    /// Load settings.
    ///
    /// With `explicit = Some(path)` the file must exist. Otherwise the
    /// default location is used and a missing file yields built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit file is missing or any file is
    /// unreadable or invalid.
    pub fn load(explicit: Option<&Path>, default_path: &Path) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) if !path.is_file() => Err(ConfigError::Io {
                path: path.display().to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
            Some(path) => toml_loader::load_config(path),
            None => toml_loader::load_config(default_path),
        }
    }

    /// Apply `DOTFILES_REPO`, `DOTFILES_REF`, `DOTFILES_DIR` and `ASDF_DIR`.
    ///
    /// `lookup` returns the value of an environment variable; empty values
    /// are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(url) = get("DOTFILES_REPO") {
            self.repository.url = url;
        }
        if let Some(reference) = get("DOTFILES_REF") {
            self.repository.reference = reference;
        }
        if let Some(dir) = get("DOTFILES_DIR") {
            self.repository.directory = dir;
        }
        if let Some(dir) = get("ASDF_DIR") {
            self.version_manager.directory = dir;
        }
    }

    /// Apply command-line overrides, which win over file and environment.
    pub fn apply_overrides(&mut self, repo: Option<&str>, dir: Option<&Path>) {
        if let Some(url) = repo {
            self.repository.url = url.to_string();
        }
        if let Some(dir) = dir {
            self.repository.directory = dir.display().to_string();
        }
    }
}

/// Default settings file: `$XDG_CONFIG_HOME/dotfiles/bootstrap.toml`, else
/// `~/.config/dotfiles/bootstrap.toml`.
#[must_use]
pub fn default_settings_path(xdg_config_home: Option<&str>, home: &Path) -> PathBuf {
    xdg_config_home
        .filter(|v| !v.is_empty())
        .map_or_else(|| home.join(".config"), PathBuf::from)
        .join("dotfiles")
        .join(SETTINGS_FILE)
}

/// Expand a leading `~/` (or a bare `~`) against `home`.
#[must_use]
pub fn expand_home(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    path.strip_prefix("~/")
        .map_or_else(|| PathBuf::from(path), |rest| home.join(rest))
}
