//! Package list and secondary manifest parsing.
use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;
use crate::operations::FileSystemOps;

/// Parse a platform package list.
///
/// Tokens are whitespace-separated, `#` starts a comment running to the end
/// of the line, and duplicates are dropped keeping the first occurrence.
#[must_use]
pub fn parse_package_list(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .flat_map(|line| {
            line.split('#')
                .next()
                .unwrap_or_default()
                .split_whitespace()
        })
        .filter(|token| seen.insert(*token))
        .map(String::from)
        .collect()
}

/// Parse a secondary (language ecosystem) manifest: one package spec per
/// line, blank lines and `#` comments ignored.
#[must_use]
pub fn parse_line_manifest(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Read the file at `path` and parse it with `parser`.
///
/// Returns `None` when the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file exists but cannot be read.
pub fn load_with(
    fs: &dyn FileSystemOps,
    path: &Path,
    parser: fn(&str) -> Vec<String>,
) -> Result<Option<Vec<String>>, ConfigError> {
    if !fs.is_file(path) {
        return Ok(None);
    }
    let content = fs.read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(parser(&content)))
}
