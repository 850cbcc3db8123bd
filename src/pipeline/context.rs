//! Pipeline channels and shared run state: stage counters, skip ledger, and the output sink.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::{ImageDescriptor, Mode, RunSummary};

/// Where the show and query sinks print. Shared by every lookup worker.
pub type SharedOut = Arc<Mutex<dyn Write + Send>>;

/// Standard output as a [`SharedOut`].
pub fn stdout_out() -> SharedOut {
    Arc::new(Mutex::new(std::io::stdout()))
}

/// Write one line under the output lock. A poisoned lock is still usable for plain output.
pub fn write_line(out: &SharedOut, line: &str) -> std::io::Result<()> {
    let mut w = out.lock().unwrap_or_else(PoisonError::into_inner);
    writeln!(w, "{}", line)
}

pub fn flush_out(out: &SharedOut) -> std::io::Result<()> {
    out.lock().unwrap_or_else(PoisonError::into_inner).flush()
}

/// Counters updated by every stage. Live values back the Ctrl+C diagnostic; final values become
/// the [`RunSummary`].
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub scanners_running: AtomicUsize,
    pub workers_busy: AtomicUsize,
    pub batches_in_flight: AtomicUsize,
    pub lookups_in_flight: AtomicUsize,
    pub dirs_scanned: AtomicUsize,
    pub dirs_skipped: AtomicUsize,
    pub files_skipped: AtomicUsize,
    pub descriptors: AtomicUsize,
    pub fingerprinted: AtomicUsize,
    pub batches_committed: AtomicUsize,
    pub batches_failed: AtomicUsize,
    pub rows_inserted: AtomicUsize,
    pub duplicates: AtomicUsize,
    pub lookups: AtomicUsize,
    pub lookups_failed: AtomicUsize,
    pub matches: AtomicUsize,
    pub printed: AtomicUsize,
    skipped: Mutex<Vec<(PathBuf, String)>>,
}

/// Relaxed increment; counters are only read for reporting.
pub fn bump(counter: &AtomicUsize, n: usize) {
    counter.fetch_add(n, Ordering::Relaxed);
}

pub fn drop_one(counter: &AtomicUsize) {
    counter.fetch_sub(1, Ordering::Relaxed);
}

fn load(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::Relaxed)
}

impl PipelineStats {
    /// Record a directory that contributed nothing (unlistable, empty, bad key file).
    pub fn skip_dir(&self, path: &Path, reason: String) {
        bump(&self.dirs_skipped, 1);
        self.push_skipped(path, reason);
    }

    /// Record a matching file that was dropped (bad frame number, decode failure).
    pub fn skip_file(&self, path: &Path, reason: String) {
        bump(&self.files_skipped, 1);
        self.push_skipped(path, reason);
    }

    fn push_skipped(&self, path: &Path, reason: String) {
        self.skipped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((path.to_path_buf(), reason));
    }

    /// Skipped directories and files with their reasons, in the order recorded.
    pub fn skipped(&self) -> Vec<(PathBuf, String)> {
        self.skipped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn snapshot(&self, mode: Mode) -> RunSummary {
        RunSummary {
            mode,
            dirs_scanned: load(&self.dirs_scanned),
            dirs_skipped: load(&self.dirs_skipped),
            files_skipped: load(&self.files_skipped),
            descriptors: load(&self.descriptors),
            fingerprinted: load(&self.fingerprinted),
            batches_committed: load(&self.batches_committed),
            batches_failed: load(&self.batches_failed),
            rows_inserted: load(&self.rows_inserted),
            duplicates: load(&self.duplicates),
            lookups: load(&self.lookups),
            lookups_failed: load(&self.lookups_failed),
            matches: load(&self.matches),
            printed: load(&self.printed),
        }
    }

    /// One-line view of where work currently sits.
    pub fn stage_line(&self) -> String {
        format!(
            "scanners running: {}, descriptors: {}, workers busy: {}, fingerprinted: {}, \
             batches in flight: {}, batches committed: {}, lookups in flight: {}, lookups: {}",
            load(&self.scanners_running),
            load(&self.descriptors),
            load(&self.workers_busy),
            load(&self.fingerprinted),
            load(&self.batches_in_flight),
            load(&self.batches_committed),
            load(&self.lookups_in_flight),
            load(&self.lookups),
        )
    }
}

/// The two handoff channels. Both are rendezvous channels (capacity 0): a send completes only
/// when the next stage takes the descriptor.
pub struct PipelineChannels {
    /// Scanners → fingerprint workers.
    pub intake_tx: Sender<ImageDescriptor>,
    pub intake_rx: Receiver<ImageDescriptor>,
    /// Fingerprint workers → sink.
    pub output_tx: Sender<ImageDescriptor>,
    pub output_rx: Receiver<ImageDescriptor>,
}

pub fn create_pipeline_channels() -> PipelineChannels {
    let (intake_tx, intake_rx) = bounded::<ImageDescriptor>(0);
    let (output_tx, output_rx) = bounded::<ImageDescriptor>(0);
    PipelineChannels {
        intake_tx,
        intake_rx,
        output_tx,
        output_rx,
    }
}
