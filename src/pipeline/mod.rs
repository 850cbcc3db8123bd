//! Pipeline components: channels and stats, scanners, fingerprint workers, sinks, orchestration.

pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod scan;
pub mod sinks;
pub mod workers;

pub use context::{
    PipelineChannels, PipelineStats, SharedOut, create_pipeline_channels, stdout_out,
};
pub use error_handler::report_skipped;
pub use orchestrator::{run_pipeline, run_with_stats};
pub use scan::{scan_dir, spawn_scanners};
pub use sinks::{SinkContext, spawn_sink};
pub use workers::spawn_fingerprint_workers;
