use log::warn;

use super::context::PipelineStats;

/// Log how many directories and files were skipped; list each with its reason when verbose.
/// Call after the pipeline has drained.
pub fn report_skipped(verbose: bool, stats: &PipelineStats) {
    let skipped = stats.skipped();
    if skipped.is_empty() {
        return;
    }
    warn!(
        "Skipped {} directories or files due to read, key, or decode errors",
        skipped.len()
    );
    if verbose {
        for (p, reason) in &skipped {
            eprintln!("  skipped: {} ({})", p.display(), reason);
        }
    }
}
