//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    /// Optional per-directory settings file (`.framehash.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Scanning ----

/// Filename pattern for frame images: `<name>-<digits>.jpg`. Group 1 is the name, group 2 the frame.
pub const FRAME_FILENAME_PATTERN: &str = r"^(.*)-([0-9]+)\.jpg$";

// ---- Fingerprinting ----

/// Block-mean hash tuning.
pub struct BlockMeanConsts;

impl BlockMeanConsts {
    /// Side of the square the image is resized to before block averaging.
    pub const RESIZE_SIDE: u32 = 256;
    /// Side of one averaging block.
    pub const BLOCK_SIDE: u32 = 16;
}

// ---- Database ----

/// Descriptors per store transaction.
pub const STORE_BATCH_SIZE: usize = 100;

/// Default retry budget for a locked store, in seconds.
pub const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;

/// Exponential backoff bounds for the lock-retry loop.
pub struct RetryConsts;

impl RetryConsts {
    pub const INITIAL_BACKOFF: Duration = Duration::from_millis(1);
    pub const MAX_BACKOFF: Duration = Duration::from_millis(100);
}
