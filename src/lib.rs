//! Framehash: concurrent frame-image fingerprinting with store, query, and show modes

pub mod engine;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use std::sync::Arc;

/// Result alias used by public framehash API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub use pipeline::{run_pipeline, run_with_stats};

/// Single entry point: scan `opts.paths`, fingerprint every frame, and store, query, or print
/// the fingerprints per `opts.mode`. Output goes to stdout.
///
/// ```ignore
/// let opts = framehash::Opts {
///     paths: vec!["frames/clip1".into()],
///     mode: framehash::Mode::Store,
///     db_path: Some("frames.db".into()),
///     ..Default::default()
/// };
/// let summary = framehash::run(&opts)?;
/// println!("{} rows", summary.rows_inserted);
/// ```
pub fn run(opts: &Opts) -> Result<RunSummary> {
    run_with_stats(opts, Arc::new(pipeline::PipelineStats::default()))
}
