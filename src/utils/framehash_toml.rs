//! Load `.framehash.toml` from a directory (CLI only). Lib callers build [`Opts`] directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::config::PackagePaths;
use crate::{Mode, Opts, UniquePolicy};

#[derive(Debug, Default, Deserialize)]
pub struct FramehashToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    mode: Option<Mode>,
    db_path: Option<String>,
    key_file: Option<String>,
    workers: Option<usize>,
    lookup_workers: Option<usize>,
    /// Seconds.
    db_timeout: Option<u64>,
    unique: Option<UniquePolicy>,
    batch_size: Option<usize>,
    verbose: Option<bool>,
}

impl FramehashToml {
    /// Mode named in the file, used when no mode flag is given.
    pub fn mode(&self) -> Option<Mode> {
        self.settings.mode
    }

    pub fn verbose(&self) -> Option<bool> {
        self.settings.verbose
    }
}

/// Load `.framehash.toml` from `dir`. `Ok(None)` when the file is missing or unreadable;
/// `Err` when it exists but does not parse (caller decides whether to warn).
pub fn load_framehash_toml(dir: &Path) -> Result<Option<FramehashToml>, String> {
    let path = dir.join(PackagePaths::get().config_filename());
    let Ok(s) = std::fs::read_to_string(&path) else {
        return Ok(None);
    };
    parse_framehash_toml(&s)
        .map(Some)
        .map_err(|e| format!("{}: {}", path.display(), e))
}

pub fn parse_framehash_toml(s: &str) -> Result<FramehashToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags.
pub fn apply_file_to_opts(file: &FramehashToml, opts: &mut Opts) {
    let sec = &file.settings;
    apply_file_opt!(sec, opts, mode => mode);
    if let Some(ref p) = sec.db_path {
        opts.db_path = Some(PathBuf::from(p));
    }
    if let Some(ref k) = sec.key_file {
        opts.key_file = Some(k.clone());
    }
    if sec.workers.is_some() {
        opts.num_workers = sec.workers;
    }
    if sec.lookup_workers.is_some() {
        opts.lookup_workers = sec.lookup_workers;
    }
    if let Some(secs) = sec.db_timeout {
        opts.db_timeout = Duration::from_secs(secs);
    }
    apply_file_opt!(sec, opts, unique => unique_policy);
    apply_file_opt!(sec, opts, batch_size => batch_size);
    apply_file_opt!(sec, opts, verbose => verbose);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_changes_nothing() {
        let file = parse_framehash_toml("").unwrap();
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts);
        assert_eq!(opts.mode, Mode::Show);
        assert!(opts.db_path.is_none());
        assert_eq!(opts.batch_size, 100);
    }

    #[test]
    fn settings_are_applied() {
        let file = parse_framehash_toml(
            r#"
            [settings]
            mode = "store"
            db_path = "frames.db"
            key_file = "KEY"
            workers = 3
            db_timeout = 5
            unique = "key-frame"
            "#,
        )
        .unwrap();
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts);
        assert_eq!(opts.mode, Mode::Store);
        assert_eq!(opts.db_path, Some(PathBuf::from("frames.db")));
        assert_eq!(opts.key_file.as_deref(), Some("KEY"));
        assert_eq!(opts.num_workers, Some(3));
        assert_eq!(opts.db_timeout, Duration::from_secs(5));
        assert_eq!(opts.unique_policy, UniquePolicy::KeyFrame);
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(load_framehash_toml(dir.path()).unwrap().is_none());
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(".framehash.toml"), "[settings\nmode=").unwrap();
        assert!(load_framehash_toml(dir.path()).is_err());
    }

    #[test]
    fn unknown_mode_is_an_error() {
        assert!(parse_framehash_toml("[settings]\nmode = \"delete\"\n").is_err());
    }
}
