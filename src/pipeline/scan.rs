//! Path scanners: one thread per input directory, non-recursive, decode matching frames and
//! hand them to the fingerprint workers.

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use walkdir::WalkDir;

use crate::ImageDescriptor;
use crate::engine::fingerprint::decode_grayscale;
use crate::engine::tools::{FrameName, derive_key, parse_frame_filename, read_key_file};

use super::context::{PipelineStats, bump, drop_one};

/// Immediate entries of `dir`, sorted by name. `Err` when the directory itself cannot be listed;
/// unreadable individual entries are recorded as skipped files.
fn list_dir(dir: &Path, stats: &PipelineStats) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for r in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        match r {
            Ok(entry) => entries.push(entry.into_path()),
            Err(err) if err.depth() == 0 => {
                return Err(err).with_context(|| format!("list directory {}", dir.display()));
            }
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| dir.to_path_buf());
                warn!("skipping {}: {}", path.display(), err);
                stats.skip_file(&path, err.to_string());
            }
        }
    }
    Ok(entries)
}

/// Scan one directory and send a descriptor per decodable frame. Returns the number sent.
///
/// Every failure is contained: an unlistable or empty directory, or an unreadable key file, skips
/// the directory; a bad frame number or a decode failure skips the file. Names that do not look
/// like `<name>-<digits>.jpg` are ignored without a warning.
pub fn scan_dir(
    dir: &Path,
    key_file: Option<&str>,
    intake_tx: &Sender<ImageDescriptor>,
    stats: &PipelineStats,
) -> usize {
    let entries = match list_dir(dir, stats) {
        Ok(e) => e,
        Err(e) => {
            warn!("skipping directory: {:#}", e);
            stats.skip_dir(dir, format!("{:#}", e));
            return 0;
        }
    };
    if entries.is_empty() {
        warn!("no files in {}", dir.display());
        stats.skip_dir(dir, "no files".to_string());
        return 0;
    }

    let shared_key = match key_file {
        Some(name) => match read_key_file(dir, name) {
            Ok(k) => {
                info!("using key {:?} for {}", k, dir.display());
                Some(k)
            }
            Err(e) => {
                warn!("skipping directory {}: {:#}", dir.display(), e);
                stats.skip_dir(dir, format!("{:#}", e));
                return 0;
            }
        },
        None => None,
    };
    bump(&stats.dirs_scanned, 1);

    let mut sent = 0_usize;
    for path in entries {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let (name, frame) = match parse_frame_filename(file_name) {
            FrameName::NoMatch => continue,
            FrameName::BadFrame { digits } => {
                warn!(
                    "skipping {}: frame number {} out of range",
                    path.display(),
                    digits
                );
                stats.skip_file(&path, format!("frame number {} out of range", digits));
                continue;
            }
            FrameName::Frame { name, frame } => (name, frame),
        };
        let key = match &shared_key {
            Some(k) => k.clone(),
            None => derive_key(dir, &name),
        };
        let image = match decode_grayscale(&path) {
            Ok(img) => img,
            Err(e) => {
                warn!("skipping {}: {:#}", path.display(), e);
                stats.skip_file(&path, format!("{:#}", e));
                continue;
            }
        };
        debug!("adding file: {}", path.display());
        if intake_tx
            .send(ImageDescriptor::new(path, key, frame, image))
            .is_err()
        {
            // Workers are gone; the run is shutting down.
            break;
        }
        bump(&stats.descriptors, 1);
        sent += 1;
    }
    sent
}

/// Spawn one scanner per directory. Each holds its own sender clone, so the intake channel
/// closes once the caller drops its sender and every scanner has returned.
pub fn spawn_scanners(
    paths: &[PathBuf],
    key_file: Option<&str>,
    intake_tx: &Sender<ImageDescriptor>,
    stats: &Arc<PipelineStats>,
) -> Vec<JoinHandle<usize>> {
    paths
        .iter()
        .map(|dir| {
            let dir = dir.clone();
            let key_file = key_file.map(str::to_string);
            let intake_tx = intake_tx.clone();
            let stats = Arc::clone(stats);
            bump(&stats.scanners_running, 1);
            thread::spawn(move || {
                let sent = scan_dir(&dir, key_file.as_deref(), &intake_tx, &stats);
                debug!("scanner done: {} ({} frames)", dir.display(), sent);
                drop_one(&stats.scanners_running);
                sent
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use image::{GrayImage, Luma};
    use tempfile::TempDir;

    fn write_frame(dir: &Path, name: &str) {
        GrayImage::from_pixel(8, 8, Luma([128]))
            .save(dir.join(name))
            .unwrap();
    }

    fn scan(dir: &Path, key_file: Option<&str>) -> (Vec<ImageDescriptor>, PipelineStats) {
        let (tx, rx) = unbounded();
        let stats = PipelineStats::default();
        scan_dir(dir, key_file, &tx, &stats);
        drop(tx);
        (rx.iter().collect(), stats)
    }

    #[test]
    fn keys_derive_from_dir_and_name() {
        let tmp = TempDir::new().unwrap();
        write_frame(tmp.path(), "img-1.jpg");
        write_frame(tmp.path(), "img-2.jpg");
        std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();
        let (descs, stats) = scan(tmp.path(), None);
        assert_eq!(descs.len(), 2);
        let expected = derive_key(tmp.path(), "img");
        assert!(descs.iter().all(|d| d.key == expected));
        assert_eq!(
            descs.iter().map(|d| d.frame).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(descs.iter().all(|d| d.image.is_some()));
        assert_eq!(stats.snapshot(crate::Mode::Show).files_skipped, 0);
    }

    #[test]
    fn key_file_overrides_derived_key() {
        let tmp = TempDir::new().unwrap();
        write_frame(tmp.path(), "a-3.jpg");
        std::fs::write(tmp.path().join("KEY"), "  movie42\n").unwrap();
        let (descs, _) = scan(tmp.path(), Some("KEY"));
        assert_eq!(descs.len(), 1);
        assert_eq!(descs[0].key, "movie42");
    }

    #[test]
    fn missing_key_file_skips_directory() {
        let tmp = TempDir::new().unwrap();
        write_frame(tmp.path(), "a-3.jpg");
        let (descs, stats) = scan(tmp.path(), Some("KEY"));
        assert!(descs.is_empty());
        assert_eq!(stats.snapshot(crate::Mode::Show).dirs_skipped, 1);
    }

    #[test]
    fn empty_and_missing_directories_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let (descs, stats) = scan(tmp.path(), None);
        assert!(descs.is_empty());
        let (_, missing) = scan(&tmp.path().join("nope"), None);
        assert_eq!(stats.snapshot(crate::Mode::Show).dirs_skipped, 1);
        assert_eq!(missing.snapshot(crate::Mode::Show).dirs_skipped, 1);
    }

    #[test]
    fn undecodable_frame_is_skipped() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("bad-1.jpg"), b"not a jpeg").unwrap();
        write_frame(tmp.path(), "good-2.jpg");
        let (descs, stats) = scan(tmp.path(), None);
        assert_eq!(descs.len(), 1);
        assert_eq!(descs[0].frame, 2);
        assert_eq!(stats.snapshot(crate::Mode::Show).files_skipped, 1);
    }

    #[test]
    fn out_of_range_frame_number_counts_as_skipped_file() {
        let tmp = TempDir::new().unwrap();
        write_frame(tmp.path(), "img-99999999999999999999.jpg");
        write_frame(tmp.path(), "img-7.jpg");
        let (descs, stats) = scan(tmp.path(), None);
        assert_eq!(descs.len(), 1);
        assert_eq!(descs[0].frame, 7);
        assert_eq!(stats.snapshot(crate::Mode::Show).files_skipped, 1);
        assert_eq!(stats.skipped().len(), 1);
    }

    #[test]
    fn subdirectories_are_not_descended() {
        let tmp = TempDir::new().unwrap();
        let sub = tmp.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        write_frame(&sub, "deep-1.jpg");
        write_frame(tmp.path(), "top-1.jpg");
        let (descs, _) = scan(tmp.path(), None);
        assert_eq!(descs.len(), 1);
        assert!(descs[0].path.ends_with("top-1.jpg"));
    }
}
