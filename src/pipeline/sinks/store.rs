//! Store sink: accumulate fixed-size batches and commit each on its own thread while intake
//! continues.

use anyhow::Result;
use crossbeam_channel::Receiver;
use log::{debug, error};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::ImageDescriptor;
use crate::engine::db_ops::{BatchOutcome, Store, insert_batch, retry_while_locked};
use crate::engine::progress::tick;
use crate::pipeline::context::{PipelineStats, bump, drop_one};

use super::SinkContext;

/// Commit one batch in a single transaction on a fresh connection, retrying the whole
/// transaction while the store reports lock contention. After `timeout` the last error is
/// returned and the batch is lost; other batches are unaffected.
pub fn commit_batch(
    store: &Store,
    batch: &[ImageDescriptor],
    timeout: Duration,
) -> Result<BatchOutcome> {
    let mut conn = store.connect()?;
    retry_while_locked(timeout, || insert_batch(&mut conn, batch))
}

fn spawn_commit(
    batch_no: usize,
    batch: Vec<ImageDescriptor>,
    store: Store,
    timeout: Duration,
    stats: Arc<PipelineStats>,
) -> JoinHandle<()> {
    bump(&stats.batches_in_flight, 1);
    thread::spawn(move || {
        debug!("commit batch {} ({} fingerprints)", batch_no, batch.len());
        match commit_batch(&store, &batch, timeout) {
            Ok(outcome) => {
                bump(&stats.batches_committed, 1);
                bump(&stats.rows_inserted, outcome.inserted);
                bump(&stats.duplicates, outcome.duplicates);
                debug!(
                    "batch {} committed: {} inserted, {} already stored",
                    batch_no, outcome.inserted, outcome.duplicates
                );
            }
            Err(e) => {
                bump(&stats.batches_failed, 1);
                error!(
                    "batch {} ({} fingerprints) not stored: {:#}",
                    batch_no,
                    batch.len(),
                    e
                );
            }
        }
        drop_one(&stats.batches_in_flight);
    })
}

/// Consume fingerprinted descriptors until the channel closes, then wait for every outstanding
/// commit. Failed batches are logged and counted, never returned as an error.
pub fn run_store_sink(
    output_rx: Receiver<ImageDescriptor>,
    store: Store,
    batch_size: usize,
    timeout: Duration,
    ctx: SinkContext,
) -> Result<()> {
    let mut batch = Vec::with_capacity(batch_size);
    let mut commits: Vec<JoinHandle<()>> = Vec::new();
    while let Ok(desc) = output_rx.recv() {
        tick(ctx.bar.as_ref());
        batch.push(desc);
        if batch.len() >= batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            commits.push(spawn_commit(
                commits.len() + 1,
                full,
                store.clone(),
                timeout,
                Arc::clone(&ctx.stats),
            ));
        }
    }
    if !batch.is_empty() {
        commits.push(spawn_commit(
            commits.len() + 1,
            batch,
            store.clone(),
            timeout,
            Arc::clone(&ctx.stats),
        ));
    }
    debug!("store sink: intake closed, waiting on {} commits", commits.len());
    for h in commits {
        if h.join().is_err() {
            error!("commit thread panicked");
            bump(&ctx.stats.batches_failed, 1);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::db_ops::count_rows;
    use crate::pipeline::context::SharedOut;
    use crate::{Fingerprint, UniquePolicy};
    use crossbeam_channel::bounded;
    use image::GrayImage;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn descriptor(i: u32) -> ImageDescriptor {
        let mut d = ImageDescriptor::new(
            PathBuf::from(format!("d/f-{}.jpg", i)),
            "d/f".to_string(),
            i64::from(i),
            GrayImage::new(1, 1),
        );
        d.image = None;
        d.fingerprint = Some(Fingerprint::from_words([i, 0, 0, 1]));
        d
    }

    fn ctx(stats: &Arc<PipelineStats>) -> SinkContext {
        let out: SharedOut = Arc::new(Mutex::new(Vec::<u8>::new()));
        SinkContext {
            out,
            stats: Arc::clone(stats),
            bar: None,
        }
    }

    #[test]
    fn partial_final_batch_is_committed() {
        let tmp = TempDir::new().unwrap();
        let db = tmp.path().join("store.db");
        let (store, conn) = Store::open(&db, UniquePolicy::FullTuple).unwrap();
        let stats = Arc::new(PipelineStats::default());
        let (tx, rx) = bounded(0);
        let sink_ctx = ctx(&stats);
        let sink = thread::spawn(move || {
            run_store_sink(rx, store, 10, Duration::from_secs(5), sink_ctx)
        });
        for i in 0..25 {
            tx.send(descriptor(i)).unwrap();
        }
        drop(tx);
        sink.join().unwrap().unwrap();

        let summary = stats.snapshot(crate::Mode::Store);
        assert_eq!(summary.batches_committed, 3);
        assert_eq!(summary.rows_inserted, 25);
        assert_eq!(count_rows(&conn).unwrap(), 25);
    }

    #[test]
    fn recommitting_a_batch_absorbs_duplicates() {
        let tmp = TempDir::new().unwrap();
        let db = tmp.path().join("store.db");
        let (store, conn) = Store::open(&db, UniquePolicy::FullTuple).unwrap();
        let batch: Vec<_> = (0..5).map(descriptor).collect();
        let first = commit_batch(&store, &batch, Duration::from_secs(1)).unwrap();
        let second = commit_batch(&store, &batch, Duration::from_secs(1)).unwrap();
        assert_eq!(first.inserted, 5);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 5);
        assert_eq!(count_rows(&conn).unwrap(), 5);
    }
}
