//! Image decoding and 128-bit block-mean fingerprints

use anyhow::{Context, Result};
use image::GrayImage;
use image::imageops::{self, FilterType};
use std::path::Path;

use crate::utils::config::BlockMeanConsts;
use crate::{FINGERPRINT_BYTES, Fingerprint};

/// Computes a fingerprint from a decoded grayscale image.
///
/// Implementations must be deterministic and hold no mutable state between calls; one instance
/// is shared by every worker.
pub trait Fingerprinter: Send + Sync {
    fn fingerprint(&self, image: &GrayImage) -> Fingerprint;
}

/// Block-mean hash: resize to 256x256, average 16x16 blocks, set a bit where a block is at or
/// above the median block. Bits are packed LSB-first; the first 128 form the fingerprint.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockMeanHasher;

impl BlockMeanHasher {
    pub fn new() -> Self {
        Self
    }

    /// Sum of each block, row-major. Sums order the same as means for equal-sized blocks.
    fn block_sums(resized: &GrayImage) -> Vec<u32> {
        let side = BlockMeanConsts::RESIZE_SIDE;
        let block = BlockMeanConsts::BLOCK_SIDE;
        let per_row = side / block;
        let mut sums = vec![0u32; (per_row * per_row) as usize];
        for (x, y, px) in resized.enumerate_pixels() {
            let idx = (y / block) * per_row + (x / block);
            sums[idx as usize] += u32::from(px[0]);
        }
        sums
    }
}

impl Fingerprinter for BlockMeanHasher {
    fn fingerprint(&self, image: &GrayImage) -> Fingerprint {
        let side = BlockMeanConsts::RESIZE_SIDE;
        let resized = imageops::resize(image, side, side, FilterType::Triangle);
        let sums = Self::block_sums(&resized);

        let mut sorted = sums.clone();
        let mid = sorted.len() / 2;
        let (_, median, _) = sorted.select_nth_unstable(mid);
        let median = *median;

        let mut bytes = [0u8; FINGERPRINT_BYTES];
        for (i, sum) in sums.iter().take(FINGERPRINT_BYTES * 8).enumerate() {
            if *sum >= median {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }
        Fingerprint::from_bytes(&bytes)
    }
}

/// Decode an image file as 8-bit grayscale. A zero-sized result is an error.
pub fn decode_grayscale(path: &Path) -> Result<GrayImage> {
    let img = image::open(path)
        .with_context(|| format!("decode image {}", path.display()))?
        .to_luma8();
    if img.width() == 0 || img.height() == 0 {
        anyhow::bail!("empty image: {}", path.display());
    }
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn gradient(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([((x + y) % 256) as u8]))
    }

    #[test]
    fn identical_images_produce_identical_fingerprint() {
        let hasher = BlockMeanHasher::new();
        let img = gradient(320, 240);
        assert_eq!(hasher.fingerprint(&img), hasher.fingerprint(&img));
    }

    #[test]
    fn solid_image_sets_every_bit() {
        // Every block equals the median, so every bit is set.
        let hasher = BlockMeanHasher::new();
        let img = GrayImage::from_pixel(64, 64, Luma([77]));
        let fp = hasher.fingerprint(&img);
        assert_eq!(fp.words(), [u32::MAX; 4]);
    }

    #[test]
    fn top_half_dark_bottom_half_bright() {
        // Blocks 0..128 cover the top half; with a dark top they fall below the median.
        let hasher = BlockMeanHasher::new();
        let img = GrayImage::from_fn(256, 256, |_, y| Luma([if y < 128 { 10 } else { 240 }]));
        let fp = hasher.fingerprint(&img);
        assert_eq!(fp.words(), [0; 4]);
    }

    #[test]
    fn different_images_differ() {
        let hasher = BlockMeanHasher::new();
        let a = GrayImage::from_fn(256, 256, |x, _| Luma([if x < 128 { 0 } else { 255 }]));
        let b = GrayImage::from_fn(256, 256, |x, _| Luma([if x < 128 { 255 } else { 0 }]));
        assert_ne!(hasher.fingerprint(&a), hasher.fingerprint(&b));
    }

    #[test]
    fn decode_missing_file_fails() {
        assert!(decode_grayscale(Path::new("/nonexistent/frame-1.jpg")).is_err());
    }
}
