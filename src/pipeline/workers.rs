use crossbeam_channel::{Receiver, Sender};
use log::warn;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::ImageDescriptor;
use crate::engine::fingerprint::Fingerprinter;

use super::context::{PipelineStats, bump, drop_one};

/// Single fingerprint worker: take the pixels out of each descriptor, fingerprint them, drop the
/// pixels, forward the descriptor.
fn fingerprint_worker_loop(
    intake_rx: Receiver<ImageDescriptor>,
    output_tx: Sender<ImageDescriptor>,
    hasher: Arc<dyn Fingerprinter>,
    stats: Arc<PipelineStats>,
) {
    while let Ok(mut desc) = intake_rx.recv() {
        let Some(image) = desc.image.take() else {
            warn!("skipping {}: no decoded image", desc.path.display());
            stats.skip_file(&desc.path, "no decoded image".to_string());
            continue;
        };
        bump(&stats.workers_busy, 1);
        desc.fingerprint = Some(hasher.fingerprint(&image));
        drop(image);
        drop_one(&stats.workers_busy);
        bump(&stats.fingerprinted, 1);
        if output_tx.send(desc).is_err() {
            break;
        }
    }
}

/// Spawn `num_workers` fingerprint workers sharing `intake_rx`. Caller must drop its own
/// `output_tx` after this so the sink sees the channel close when the last worker exits.
pub fn spawn_fingerprint_workers(
    intake_rx: Receiver<ImageDescriptor>,
    output_tx: &Sender<ImageDescriptor>,
    hasher: Arc<dyn Fingerprinter>,
    num_workers: usize,
    stats: &Arc<PipelineStats>,
) -> Vec<JoinHandle<()>> {
    (0..num_workers)
        .map(|_| {
            let intake_rx = intake_rx.clone();
            let output_tx = output_tx.clone();
            let hasher = Arc::clone(&hasher);
            let stats = Arc::clone(stats);
            thread::spawn(move || fingerprint_worker_loop(intake_rx, output_tx, hasher, stats))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Fingerprint;
    use crate::engine::fingerprint::BlockMeanHasher;
    use crossbeam_channel::bounded;
    use image::{GrayImage, Luma};
    use std::path::PathBuf;

    struct ConstHasher;

    impl Fingerprinter for ConstHasher {
        fn fingerprint(&self, _image: &GrayImage) -> Fingerprint {
            Fingerprint::from_words([1, 2, 3, 4])
        }
    }

    #[test]
    fn every_descriptor_is_fingerprinted_and_stripped() {
        let (in_tx, in_rx) = bounded(0);
        let (out_tx, out_rx) = bounded(0);
        let stats = Arc::new(PipelineStats::default());
        let handles = spawn_fingerprint_workers(in_rx, &out_tx, Arc::new(ConstHasher), 3, &stats);
        drop(out_tx);

        let producer = thread::spawn(move || {
            for i in 0..10 {
                let img = GrayImage::from_pixel(4, 4, Luma([0]));
                in_tx
                    .send(ImageDescriptor::new(
                        PathBuf::from(format!("d/f-{}.jpg", i)),
                        "d/f".to_string(),
                        i,
                        img,
                    ))
                    .unwrap();
            }
        });

        let out: Vec<ImageDescriptor> = out_rx.iter().collect();
        producer.join().unwrap();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(out.len(), 10);
        for d in &out {
            assert!(d.image.is_none());
            assert_eq!(d.fingerprint, Some(Fingerprint::from_words([1, 2, 3, 4])));
        }
        let mut frames: Vec<i64> = out.iter().map(|d| d.frame).collect();
        frames.sort();
        assert_eq!(frames, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn workers_exit_when_intake_closes() {
        let (in_tx, in_rx) = bounded::<ImageDescriptor>(0);
        let (out_tx, out_rx) = bounded(0);
        let stats = Arc::new(PipelineStats::default());
        let handles =
            spawn_fingerprint_workers(in_rx, &out_tx, Arc::new(BlockMeanHasher::new()), 2, &stats);
        drop(out_tx);
        drop(in_tx);
        for h in handles {
            h.join().unwrap();
        }
        assert!(out_rx.recv().is_err());
    }
}
