//! Public and internal types for the framehash API and pipeline.

use image::GrayImage;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::config::{DEFAULT_DB_TIMEOUT_SECS, STORE_BATCH_SIZE};

/// Number of 32-bit words in a [`Fingerprint`].
pub const FINGERPRINT_WORDS: usize = 4;

/// Width of a [`Fingerprint`] in bytes (128 bits).
pub const FINGERPRINT_BYTES: usize = FINGERPRINT_WORDS * 4;

/// 128-bit similarity fingerprint: four ordered words, each read big-endian from the hash bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Fingerprint([u32; FINGERPRINT_WORDS]);

impl Fingerprint {
    pub fn from_words(words: [u32; FINGERPRINT_WORDS]) -> Self {
        Self(words)
    }

    /// Build from exactly 16 hash bytes. Word `i` is bytes `4i..4i+4` read big-endian.
    pub fn from_bytes(bytes: &[u8; FINGERPRINT_BYTES]) -> Self {
        let mut words = [0u32; FINGERPRINT_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self(words)
    }

    pub fn words(&self) -> [u32; FINGERPRINT_WORDS] {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for w in &self.0 {
            write!(f, "{:08x}", w)?;
        }
        Ok(())
    }
}

/// One discovered source image, owned by exactly one pipeline stage at a time.
///
/// Created by a scanner with the decoded grayscale buffer in `image`; a worker takes the buffer,
/// fills `fingerprint`, and drops the pixels before forwarding.
#[derive(Debug)]
pub struct ImageDescriptor {
    /// Source file location.
    pub path: PathBuf,
    /// Dedup/grouping key (key-file contents or `<dir>/<name>`). Never empty.
    pub key: String,
    /// Frame number parsed from `<name>-<digits>.jpg`.
    pub frame: i64,
    /// Decoded grayscale pixels; `None` once fingerprinted.
    pub image: Option<GrayImage>,
    /// Set by the worker pool.
    pub fingerprint: Option<Fingerprint>,
}

impl ImageDescriptor {
    pub fn new(path: PathBuf, key: String, frame: i64, image: GrayImage) -> Self {
        Self {
            path,
            key,
            frame,
            image: Some(image),
            fingerprint: None,
        }
    }
}

/// Terminal mode of one invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Print `(path, fingerprint)` pairs; no store access.
    #[default]
    Show,
    /// Batch-insert fingerprints into the store.
    Store,
    /// Look up each fingerprint in the store and print matches.
    Query,
}

impl Mode {
    pub fn needs_store(&self) -> bool {
        matches!(self, Mode::Store | Mode::Query)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Show => write!(f, "show"),
            Mode::Store => write!(f, "store"),
            Mode::Query => write!(f, "query"),
        }
    }
}

/// Which columns the store's uniqueness constraint covers.
///
/// `FullTuple` keeps a new row when a frame's fingerprint changes; `KeyFrame` keeps only the first
/// fingerprint seen for each `(key, frame)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UniquePolicy {
    #[default]
    FullTuple,
    KeyFrame,
}

/// Full run options. Built from defaults, then `.framehash.toml`, then CLI flags.
#[derive(Clone, Debug)]
pub struct Opts {
    /// Input directories; one scanner each.
    pub paths: Vec<PathBuf>,
    pub mode: Mode,
    /// SQLite store file. Required for store and query.
    pub db_path: Option<PathBuf>,
    /// When set, each directory's key is read from this file inside it.
    pub key_file: Option<String>,
    /// Fingerprint worker count. When None, uses the available processing units.
    pub num_workers: Option<usize>,
    /// Bounded lookup concurrency in query mode. When None, matches the worker count.
    pub lookup_workers: Option<usize>,
    /// Time budget for retrying a batch commit while the store is locked.
    pub db_timeout: Duration,
    pub unique_policy: UniquePolicy,
    /// Descriptors per store transaction.
    pub batch_size: usize,
    pub verbose: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            mode: Mode::default(),
            db_path: None,
            key_file: None,
            num_workers: None,
            lookup_workers: None,
            db_timeout: Duration::from_secs(DEFAULT_DB_TIMEOUT_SECS),
            unique_policy: UniquePolicy::default(),
            batch_size: STORE_BATCH_SIZE,
            verbose: false,
        }
    }
}

impl Opts {
    /// Reject configurations that must fail before any pipeline stage starts.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.paths.is_empty() {
            anyhow::bail!("must provide one or more path arguments");
        }
        if self.mode.needs_store() && self.db_path.is_none() {
            anyhow::bail!("must set --db for {} mode", self.mode);
        }
        if self.num_workers == Some(0) {
            anyhow::bail!("worker count must be at least 1");
        }
        if self.lookup_workers == Some(0) {
            anyhow::bail!("lookup worker count must be at least 1");
        }
        if self.batch_size == 0 {
            anyhow::bail!("batch size must be at least 1");
        }
        if let Some(k) = &self.key_file
            && k.trim().is_empty()
        {
            anyhow::bail!("key file name must not be empty");
        }
        Ok(())
    }

    /// Effective fingerprint worker count.
    pub fn workers(&self) -> usize {
        self.num_workers
            .unwrap_or_else(rayon::current_num_threads)
            .max(1)
    }

    /// Effective lookup concurrency for query mode.
    pub fn lookups(&self) -> usize {
        self.lookup_workers.unwrap_or_else(|| self.workers()).max(1)
    }
}

/// What one pipeline pass did. Returned by [`run`](crate::run) and logged on completion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub mode: Mode,
    pub dirs_scanned: usize,
    pub dirs_skipped: usize,
    pub files_skipped: usize,
    pub descriptors: usize,
    pub fingerprinted: usize,
    pub batches_committed: usize,
    pub batches_failed: usize,
    pub rows_inserted: usize,
    pub duplicates: usize,
    pub lookups: usize,
    pub lookups_failed: usize,
    pub matches: usize,
    pub printed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_words_are_big_endian() {
        let bytes: [u8; 16] = [
            0x00, 0x00, 0x00, 0x01, 0xde, 0xad, 0xbe, 0xef, 0xff, 0xff, 0xff, 0xff, 0x12, 0x34,
            0x56, 0x78,
        ];
        let fp = Fingerprint::from_bytes(&bytes);
        assert_eq!(fp.words(), [1, 0xdeadbeef, 0xffffffff, 0x12345678]);
    }

    #[test]
    fn fingerprint_display_is_32_hex_chars() {
        let fp = Fingerprint::from_words([0xdeadbeef, 0, 1, 0xffffffff]);
        let s = fp.to_string();
        assert_eq!(s, "deadbeef0000000000000001ffffffff");
    }

    #[test]
    fn validate_requires_paths_and_db() {
        let mut opts = Opts::default();
        assert!(opts.validate().is_err());
        opts.paths.push(PathBuf::from("d1"));
        assert!(opts.validate().is_ok());
        opts.mode = Mode::Store;
        assert!(opts.validate().is_err());
        opts.db_path = Some(PathBuf::from("x.db"));
        assert!(opts.validate().is_ok());
        opts.num_workers = Some(0);
        assert!(opts.validate().is_err());
    }

    #[test]
    fn workers_default_is_nonzero() {
        let opts = Opts::default();
        assert!(opts.workers() >= 1);
        assert_eq!(opts.lookups(), opts.workers());
    }
}
