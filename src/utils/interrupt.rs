//! Ctrl+C diagnostics: dump per-stage counters so a stuck pipeline shows where it is waiting.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::pipeline::PipelineStats;

/// Exit status used when the run is interrupted.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Log the stage counters for one Ctrl+C. Returns true from the second press on, when the
/// caller should exit.
fn on_interrupt(presses: &AtomicUsize, stats: &PipelineStats) -> bool {
    let n = presses.fetch_add(1, Ordering::SeqCst) + 1;
    log::error!("=== interrupted === {}", stats.stage_line());
    if n == 1 {
        log::warn!("run continues; press Ctrl+C again to exit");
        return false;
    }
    true
}

/// Install a Ctrl+C handler. The first press logs the stage counters and lets the run go on;
/// a second press exits with [`INTERRUPTED_EXIT_CODE`]. CLI only: the handler is process-global.
pub fn install_interrupt_diagnostics(stats: Arc<PipelineStats>) -> Result<()> {
    let presses = AtomicUsize::new(0);
    ctrlc::set_handler(move || {
        if on_interrupt(&presses, &stats) {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    })
    .context("set Ctrl+C handler")
}
