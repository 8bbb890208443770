//! Log file location, ANSI stripping, and timestamps.
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

/// Timestamp written in the log file header.
pub(super) const HEADER_TIME: &str = "%Y-%m-%d %H:%M:%S";
/// Timestamp prefixed to every log file line.
pub(super) const LINE_TIME: &str = "%H:%M:%S";

/// Remove CSI escape sequences (`ESC [ ... final`) from `s`.
///
/// A final byte is anything in `@`..=`~`, so both SGR colors and cursor
/// controls are dropped. A lone `ESC` swallows the following character.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            chars.by_ref().find(|c| ('@'..='~').contains(c));
        }
    }
    out
}

/// Directory holding the log file: `<cache>/dotfiles`, where `<cache>` is
/// `xdg_cache_home` or else `<home>/.cache`.
pub(super) fn log_dir(xdg_cache_home: Option<OsString>, home: Option<OsString>) -> PathBuf {
    let cache = xdg_cache_home
        .filter(|v| !v.is_empty())
        .map_or_else(
            || home.map_or_else(|| PathBuf::from("."), PathBuf::from).join(".cache"),
            PathBuf::from,
        );
    cache.join("dotfiles")
}

/// Return the log file path for `command`, creating its directory.
///
/// Returns `None` if the directory cannot be created; the run then logs to
/// the console only.
#[must_use]
pub fn log_file_path(command: &str) -> Option<PathBuf> {
    let dir = log_dir(
        std::env::var_os("XDG_CACHE_HOME"),
        std::env::var_os("HOME"),
    );
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// Current UTC time rendered with `format`.
pub(super) fn utc_now(format: &str) -> String {
    chrono::Utc::now().format(format).to_string()
}
