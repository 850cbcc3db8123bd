use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;

use crate::engine::db_ops::Store;
use crate::engine::fingerprint::{BlockMeanHasher, Fingerprinter};
use crate::engine::progress::maybe_counter;
use crate::{Mode, Opts, RunSummary};

use super::context::{PipelineStats, SharedOut, create_pipeline_channels, stdout_out};
use super::error_handler::report_skipped;
use super::scan::spawn_scanners;
use super::sinks::{SinkContext, spawn_sink};
use super::workers::spawn_fingerprint_workers;

/// Run one pass with the default hasher, printing to stdout.
pub fn run_with_stats(opts: &Opts, stats: Arc<PipelineStats>) -> Result<RunSummary> {
    run_pipeline(opts, Arc::new(BlockMeanHasher::new()), stdout_out(), stats)
}

/// Scanners → intake → workers → output → sink.
///
/// Configuration and store-open errors abort before any thread starts. After that, directory,
/// file, batch, and lookup failures are contained and counted; only a sink output error fails
/// the run. Shutdown is strictly ordered: all scanners finish (intake closes), all workers finish
/// (output closes), the sink and its commits or lookups finish, then the setup connection closes.
pub fn run_pipeline(
    opts: &Opts,
    hasher: Arc<dyn Fingerprinter>,
    out: SharedOut,
    stats: Arc<PipelineStats>,
) -> Result<RunSummary> {
    opts.validate()?;

    let (store, setup_conn) = if opts.mode.needs_store() {
        let db = opts
            .db_path
            .as_deref()
            .context("store path required")?;
        // Lookups never create the store or change its schema.
        let (store, conn) = match opts.mode {
            Mode::Query => Store::open_existing(db)?,
            _ => Store::open(db, opts.unique_policy)?,
        };
        info!("{} store: {}", opts.mode, store.path().display());
        (Some(store), Some(conn))
    } else {
        (None, None)
    };

    let num_workers = opts.workers();
    info!(
        "{}: {} path(s), {} fingerprint worker(s)",
        opts.mode,
        opts.paths.len(),
        num_workers
    );

    let channels = create_pipeline_channels();
    let worker_handles = spawn_fingerprint_workers(
        channels.intake_rx,
        &channels.output_tx,
        hasher,
        num_workers,
        &stats,
    );
    // Workers hold the only output senders now; the channel closes when the last one exits.
    drop(channels.output_tx);

    let scanner_handles = spawn_scanners(
        &opts.paths,
        opts.key_file.as_deref(),
        &channels.intake_tx,
        &stats,
    );
    drop(channels.intake_tx);

    let sink_ctx = SinkContext {
        out,
        stats: Arc::clone(&stats),
        bar: maybe_counter(opts.verbose, "Fingerprints"),
    };
    let sink_handle = spawn_sink(opts, store, channels.output_rx, sink_ctx)?;

    for h in scanner_handles {
        if h.join().is_err() {
            log::error!("scanner thread panicked");
        }
    }
    debug!("scanners done, intake closed");
    for h in worker_handles {
        if h.join().is_err() {
            log::error!("fingerprint worker panicked");
        }
    }
    debug!("workers done, output closed");
    let sink_result = sink_handle
        .join()
        .unwrap_or_else(|_| Err(anyhow::anyhow!("sink thread panicked")));
    debug!("sink done");
    drop(setup_conn);

    let summary = stats.snapshot(opts.mode);
    report_skipped(opts.verbose, &stats);
    log_summary(&summary);
    sink_result?;
    Ok(summary)
}

fn log_summary(s: &RunSummary) {
    info!(
        "{} done: {} frames from {} dir(s) ({} dir(s), {} file(s) skipped), {} fingerprinted",
        s.mode, s.descriptors, s.dirs_scanned, s.dirs_skipped, s.files_skipped, s.fingerprinted
    );
    match s.mode {
        Mode::Store => info!(
            "store: {} batch(es) committed, {} failed, {} row(s) inserted, {} already stored",
            s.batches_committed, s.batches_failed, s.rows_inserted, s.duplicates
        ),
        Mode::Query => info!(
            "query: {} lookup(s), {} failed, {} match(es)",
            s.lookups, s.lookups_failed, s.matches
        ),
        Mode::Show => debug!("show: {} line(s) printed", s.printed),
    }
}
