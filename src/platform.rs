//! Host platform detection.
//!
//! [`PlatformProfile::detect`] is computed once at start-up and passed by
//! reference into every phase; nothing reads the host OS afterwards.
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::PlatformError;

/// Location of the Linux distribution id file.
pub const OS_RELEASE: &str = "/etc/os-release";

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// macOS (Darwin).
    MacOs,
    /// Any supported Linux distribution.
    Linux,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MacOs => write!(f, "macos"),
            Self::Linux => write!(f, "linux"),
        }
    }
}

/// Supported distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distro {
    /// macOS has no distribution; it is its own family.
    MacOs,
    /// Ubuntu.
    Ubuntu,
    /// Debian.
    Debian,
    /// Arch Linux.
    Arch,
    /// CachyOS (Arch-based).
    CachyOs,
}

impl Distro {
    /// Map an `/etc/os-release` `ID` value onto a supported distribution.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "ubuntu" => Some(Self::Ubuntu),
            "debian" => Some(Self::Debian),
            "arch" => Some(Self::Arch),
            "cachyos" => Some(Self::CachyOs),
            _ => None,
        }
    }

    /// Identifier used in file names such as `packages/<distro>.txt`.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::MacOs => "macos",
            Self::Ubuntu => "ubuntu",
            Self::Debian => "debian",
            Self::Arch => "arch",
            Self::CachyOs => "cachyos",
        }
    }
}

impl fmt::Display for Distro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// System package manager for the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    /// Homebrew.
    Brew,
    /// Debian/Ubuntu apt.
    Apt,
    /// Arch pacman.
    Pacman,
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Brew => write!(f, "brew"),
            Self::Apt => write!(f, "apt"),
            Self::Pacman => write!(f, "pacman"),
        }
    }
}

/// Detected OS / distro / package-manager combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    /// Operating system family.
    pub os: Os,
    /// Distribution.
    pub distro: Distro,
    /// Package manager used for system packages.
    pub package_manager: PackageManager,
    /// Installation prefix of the package manager (`/opt/homebrew`,
    /// `/usr/local`, `/usr`).
    pub arch_prefix: PathBuf,
}

impl PlatformProfile {
    /// Detect the current platform.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the OS is neither macOS nor Linux, or if
    /// the Linux distro id file is missing, unreadable or names an
    /// unsupported distribution.
    pub fn detect() -> Result<Self, PlatformError> {
        Self::detect_from(
            std::env::consts::OS,
            std::env::consts::ARCH,
            Path::new(OS_RELEASE),
        )
    }

    /// Detect from explicit inputs; reads `os_release` only on Linux.
    ///
    /// # Errors
    ///
    /// See [`detect`](Self::detect).
    pub fn detect_from(os: &str, arch: &str, os_release: &Path) -> Result<Self, PlatformError> {
        if os != "linux" {
            return Self::resolve(os, arch, None);
        }
        let content = std::fs::read_to_string(os_release).map_err(|e| {
            PlatformError::DetectionFailed(format!("cannot read {}: {e}", os_release.display()))
        })?;
        Self::resolve(os, arch, Some(&content))
    }

    /// Build a profile from the OS name, CPU architecture and the
    /// contents of the distro id file. Pure.
    ///
    /// # Errors
    ///
    /// See [`detect`](Self::detect).
    pub fn resolve(os: &str, arch: &str, os_release: Option<&str>) -> Result<Self, PlatformError> {
        match os {
            "macos" => Ok(Self::macos(arch)),
            "linux" => {
                let content = os_release.ok_or_else(|| {
                    PlatformError::DetectionFailed(format!("{OS_RELEASE} not available"))
                })?;
                let id = parse_os_release_id(content).ok_or_else(|| {
                    PlatformError::DetectionFailed(format!("no ID field in {OS_RELEASE}"))
                })?;
                let distro =
                    Distro::from_id(&id).ok_or(PlatformError::UnsupportedDistro(id))?;
                Ok(Self::linux(distro))
            }
            other => Err(PlatformError::Unsupported {
                platform: other.to_string(),
            }),
        }
    }

    /// macOS profile; Apple Silicon uses `/opt/homebrew`, Intel `/usr/local`.
    #[must_use]
    pub fn macos(arch: &str) -> Self {
        let prefix = if arch == "aarch64" {
            "/opt/homebrew"
        } else {
            "/usr/local"
        };
        Self {
            os: Os::MacOs,
            distro: Distro::MacOs,
            package_manager: PackageManager::Brew,
            arch_prefix: PathBuf::from(prefix),
        }
    }

    /// Linux profile for `distro` ([`Distro::MacOs`] yields the host macOS profile).
    #[must_use]
    pub fn linux(distro: Distro) -> Self {
        let package_manager = match distro {
            Distro::MacOs => return Self::macos(std::env::consts::ARCH),
            Distro::Ubuntu | Distro::Debian => PackageManager::Apt,
            Distro::Arch | Distro::CachyOs => PackageManager::Pacman,
        };
        Self {
            os: Os::Linux,
            distro,
            package_manager,
            arch_prefix: PathBuf::from("/usr"),
        }
    }

    /// Returns `true` on macOS.
    #[must_use]
    pub fn is_macos(&self) -> bool {
        self.os == Os::MacOs
    }

    /// Returns `true` on Linux.
    #[must_use]
    pub fn is_linux(&self) -> bool {
        self.os == Os::Linux
    }

    /// Path of a binary installed under the package-manager prefix.
    #[must_use]
    pub fn prefixed_bin(&self, program: &str) -> PathBuf {
        self.arch_prefix.join("bin").join(program)
    }
}

impl fmt::Display for PlatformProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} at {})",
            self.distro,
            self.os,
            self.package_manager,
            self.arch_prefix.display()
        )
    }
}

/// Extract the `ID=` value from os-release content, unquoted.
fn parse_os_release_id(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("ID="))
        .map(|v| v.trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const UBUNTU: &str = "NAME=\"Ubuntu\"\nVERSION_ID=\"24.04\"\nID=ubuntu\nID_LIKE=debian\n";
    const CACHY: &str = "NAME=\"CachyOS Linux\"\nID=\"cachyos\"\nID_LIKE=arch\n";

    #[test]
    fn resolves_macos_on_apple_silicon() {
        let p = PlatformProfile::resolve("macos", "aarch64", None).unwrap();
        assert!(p.is_macos());
        assert_eq!(p.distro, Distro::MacOs);
        assert_eq!(p.package_manager, PackageManager::Brew);
        assert_eq!(p.arch_prefix, PathBuf::from("/opt/homebrew"));
    }

    #[test]
    fn resolves_macos_on_intel() {
        let p = PlatformProfile::resolve("macos", "x86_64", None).unwrap();
        assert_eq!(p.arch_prefix, PathBuf::from("/usr/local"));
        assert_eq!(p.prefixed_bin("brew"), PathBuf::from("/usr/local/bin/brew"));
    }

    #[test]
    fn resolves_ubuntu_to_apt() {
        let p = PlatformProfile::resolve("linux", "x86_64", Some(UBUNTU)).unwrap();
        assert!(p.is_linux());
        assert_eq!(p.distro, Distro::Ubuntu);
        assert_eq!(p.package_manager, PackageManager::Apt);
    }

    #[test]
    fn resolves_quoted_cachyos_to_pacman() {
        let p = PlatformProfile::resolve("linux", "x86_64", Some(CACHY)).unwrap();
        assert_eq!(p.distro, Distro::CachyOs);
        assert_eq!(p.package_manager, PackageManager::Pacman);
    }

    #[test]
    fn version_id_is_not_mistaken_for_id() {
        let content = "VERSION_ID=\"12\"\nID=debian\n";
        let p = PlatformProfile::resolve("linux", "x86_64", Some(content)).unwrap();
        assert_eq!(p.distro, Distro::Debian);
    }

    #[test]
    fn unknown_distro_is_unsupported() {
        let err = PlatformProfile::resolve("linux", "x86_64", Some("ID=gentoo\n")).unwrap_err();
        assert!(matches!(err, PlatformError::UnsupportedDistro(ref id) if id == "gentoo"));
    }

    #[test]
    fn missing_id_fails_detection() {
        let err = PlatformProfile::resolve("linux", "x86_64", Some("NAME=Foo\n")).unwrap_err();
        assert!(matches!(err, PlatformError::DetectionFailed(_)));
    }

    #[test]
    fn unknown_os_is_unsupported() {
        let err = PlatformProfile::resolve("windows", "x86_64", None).unwrap_err();
        assert!(matches!(err, PlatformError::Unsupported { ref platform } if platform == "windows"));
    }

    #[test]
    fn missing_os_release_file_fails_detection() {
        let dir = tempfile::tempdir().unwrap();
        let err = PlatformProfile::detect_from("linux", "x86_64", &dir.path().join("os-release"))
            .unwrap_err();
        assert!(matches!(err, PlatformError::DetectionFailed(_)));
    }

    #[test]
    fn os_release_file_is_read_on_linux() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("os-release");
        std::fs::write(&path, "ID=arch\n").unwrap();
        let p = PlatformProfile::detect_from("linux", "x86_64", &path).unwrap();
        assert_eq!(p.distro, Distro::Arch);
    }

    #[test]
    fn display_includes_distro_and_manager() {
        let p = PlatformProfile::linux(Distro::Ubuntu);
        assert_eq!(p.to_string(), "ubuntu (linux, apt at /usr)");
    }
}
