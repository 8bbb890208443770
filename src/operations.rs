//! Filesystem and network abstractions for dependency injection.
//!
//! Provides the [`FileSystemOps`] and [`Downloader`] traits so that phases
//! can be unit-tested without touching the real filesystem or network.
//! Production code uses [`SystemFileSystemOps`] and [`UreqDownloader`];
//! tests use `MockFileSystemOps` and `MockDownloader`.

use anyhow::Result;
use std::path::Path;

use crate::error::ResourceError;

/// Abstraction over the read-only filesystem queries used by phases.
///
/// Every mutation goes through the [`Executor`](crate::exec::Executor), so
/// this trait only answers "what is there right now".
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Returns `true` if `path` exists.
    fn exists(&self, path: &Path) -> bool;

    /// Returns `true` if `path` is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Returns `true` if `path` is a regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Read the whole file at `path` as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFileSystemOps;

impl FileSystemOps for SystemFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Fetches small text payloads (installer scripts) over HTTPS.
#[cfg_attr(test, mockall::automock)]
pub trait Downloader: Send + Sync + std::fmt::Debug {
    /// Download `url` and return the body as text.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success HTTP status.
    fn fetch_text(&self, url: &str) -> Result<String>;
}

/// [`Downloader`] backed by a blocking `ureq` agent.
#[derive(Debug, Default, Clone, Copy)]
pub struct UreqDownloader;

impl Downloader for UreqDownloader {
    fn fetch_text(&self, url: &str) -> Result<String> {
        let to_error = |e: ureq::Error| ResourceError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let mut response = ureq::get(url).call().map_err(to_error)?;
        let body = response.body_mut().read_to_string().map_err(to_error)?;
        Ok(body)
    }
}

/// In-memory [`FileSystemOps`] for unit tests.
///
/// Pre-configure files (with content) and directories using the
/// builder-style methods, then pass `Arc::new(mock)` to
/// [`Context::with_fs_ops`](crate::tasks::Context::with_fs_ops).
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockFileSystemOps {
    files: std::collections::HashMap<std::path::PathBuf, String>,
    dirs: std::collections::HashSet<std::path::PathBuf>,
}

#[cfg(test)]
impl MockFileSystemOps {
    /// Create an empty mock with nothing configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a regular file at `path` with `content`.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<std::path::PathBuf>, content: &str) -> Self {
        self.files.insert(path.into(), content.to_string());
        self
    }

    /// Register a directory at `path`.
    #[must_use]
    pub fn with_dir(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.dirs.insert(path.into());
        self
    }
}

#[cfg(test)]
impl FileSystemOps for MockFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
    }
}
