//! Version manifest parsing (`.tool-versions`).
//!
//! Each non-comment line is `tool v1 [v2 ...]`. Versions are kept in
//! declaration order, never sorted.
use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;
use crate::operations::FileSystemOps;

/// One declared tool/version pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolVersionSpec {
    /// Tool (and version-manager plugin) name, e.g. `nodejs`.
    pub tool: String,
    /// Requested version, e.g. `20.10.0`.
    pub version: String,
}

impl ToolVersionSpec {
    /// Create a spec from a tool name and version.
    #[must_use]
    pub fn new(tool: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for ToolVersionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.tool, self.version)
    }
}

/// Parse manifest `content`; `file` is used in error messages only.
///
/// Identical pairs declared twice are yielded once.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidManifestLine`] for a tool without a version.
pub fn parse(content: &str, file: &str) -> Result<Vec<ToolVersionSpec>, ConfigError> {
    let mut seen = HashSet::new();
    let mut specs = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        let mut tokens = line.split_whitespace();
        let Some(tool) = tokens.next() else {
            continue;
        };
        let versions: Vec<&str> = tokens.collect();
        if versions.is_empty() {
            return Err(ConfigError::InvalidManifestLine {
                file: file.to_string(),
                line: idx + 1,
                message: format!("tool '{tool}' has no version"),
            });
        }
        for version in versions {
            let spec = ToolVersionSpec::new(tool, version);
            if seen.insert(spec.clone()) {
                specs.push(spec);
            }
        }
    }

    Ok(specs)
}

/// Read and parse the manifest at `path`.
///
/// Returns `None` when the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::InvalidManifestLine`] for malformed lines.
pub fn load(
    fs: &dyn FileSystemOps,
    path: &Path,
) -> Result<Option<Vec<ToolVersionSpec>>, ConfigError> {
    if !fs.is_file(path) {
        return Ok(None);
    }
    let content = fs.read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&content, &path.display().to_string()).map(Some)
}

/// Distinct tool names in first-declaration order.
#[must_use]
pub fn tools(specs: &[ToolVersionSpec]) -> Vec<String> {
    let mut seen = HashSet::new();
    specs
        .iter()
        .filter(|s| seen.insert(s.tool.as_str()))
        .map(|s| s.tool.clone())
        .collect()
}
