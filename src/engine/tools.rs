//! Filename, key, and path utilities

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::utils::config::FRAME_FILENAME_PATTERN;

/// Outcome of matching one directory entry name against `<name>-<digits>.jpg`.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameName {
    /// Name does not look like a frame image; skip silently.
    NoMatch,
    /// Name matched but the digit group does not fit a frame number.
    BadFrame { digits: String },
    /// `name` is the part before `-<digits>.jpg`.
    Frame { name: String, frame: i64 },
}

fn frame_regex() -> &'static Regex {
    static FRAME_RE: OnceLock<Regex> = OnceLock::new();
    FRAME_RE.get_or_init(|| Regex::new(FRAME_FILENAME_PATTERN).expect("frame pattern is valid"))
}

/// Match a file name (not a path) against the frame pattern.
pub fn parse_frame_filename(file_name: &str) -> FrameName {
    let Some(caps) = frame_regex().captures(file_name) else {
        return FrameName::NoMatch;
    };
    let name = caps.get(1).map_or("", |m| m.as_str());
    let digits = caps.get(2).map_or("", |m| m.as_str());
    match digits.parse::<i64>() {
        Ok(frame) => FrameName::Frame {
            name: name.to_string(),
            frame,
        },
        Err(_) => FrameName::BadFrame {
            digits: digits.to_string(),
        },
    }
}

/// Per-file key: the directory joined with the filename prefix, `/`-separated.
/// An empty prefix yields the directory itself.
pub fn derive_key(dir: &Path, name: &str) -> String {
    if name.is_empty() {
        return path_to_db_string(dir);
    }
    path_to_db_string(&dir.join(name))
}

/// Read a directory's shared key from `<dir>/<key_file>`. Contents are trimmed; empty is an error.
pub fn read_key_file(dir: &Path, key_file: &str) -> Result<String> {
    let full = dir.join(key_file);
    let raw = std::fs::read_to_string(&full)
        .with_context(|| format!("read key file {}", full.display()))?;
    let key = raw.trim();
    if key.is_empty() {
        anyhow::bail!("expected nonempty key in {}", full.display());
    }
    Ok(key.to_string())
}

/// Path string as stored in the DB: forward slashes on every platform.
pub fn path_to_db_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
