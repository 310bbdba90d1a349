//! Perceptual fingerprints of decoded images

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use md5::{Digest, Md5};

/// Side of the grayscale thumbnail used for structural similarity
pub const THUMBNAIL_SIDE: u32 = 32;

/// Histogram bins per RGB channel
pub const HISTOGRAM_BINS: usize = 8;

/// Longest side used when sampling colours for the histogram
const HISTOGRAM_SAMPLE_SIDE: u32 = 256;

/// Everything the scorer compares, computed once per image
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    /// 64-bit average hash
    pub average_hash: u64,
    /// 64-bit difference hash
    pub difference_hash: u64,
    /// `THUMBNAIL_SIDE` x `THUMBNAIL_SIDE` grayscale pixels, row-major
    pub thumbnail: Vec<u8>,
    /// Normalised per-channel histograms (R, G, B), each summing to 1
    pub histogram: [[f32; HISTOGRAM_BINS]; 3],
    /// MD5 of the decoded RGBA pixels and dimensions
    pub pixel_digest: [u8; 16],
}

impl Fingerprint {
    /// Fingerprint an already-decoded (and, by convention, auto-cropped) image
    #[must_use]
    pub fn compute(image: &DynamicImage) -> Self {
        Self {
            average_hash: average_hash(image),
            difference_hash: difference_hash(image),
            thumbnail: image
                .resize_exact(THUMBNAIL_SIDE, THUMBNAIL_SIDE, FilterType::Triangle)
                .to_luma8()
                .into_raw(),
            histogram: colour_histogram(image),
            pixel_digest: pixel_digest(image),
        }
    }
}

fn average_hash(image: &DynamicImage) -> u64 {
    let small = image.resize_exact(8, 8, FilterType::Triangle).to_luma8();
    let pixels = small.as_raw();
    let mean = pixels.iter().map(|&p| u32::from(p)).sum::<u32>() / pixels.len().max(1) as u32;

    pixels
        .iter()
        .enumerate()
        .filter(|&(_, &p)| u32::from(p) > mean)
        .fold(0u64, |hash, (i, _)| hash | (1 << i))
}

fn difference_hash(image: &DynamicImage) -> u64 {
    let small = image.resize_exact(9, 8, FilterType::Triangle).to_luma8();
    let mut hash = 0u64;
    let mut bit = 0;
    for y in 0..8 {
        for x in 0..8 {
            if small.get_pixel(x, y).0[0] < small.get_pixel(x + 1, y).0[0] {
                hash |= 1 << bit;
            }
            bit += 1;
        }
    }
    hash
}

fn colour_histogram(image: &DynamicImage) -> [[f32; HISTOGRAM_BINS]; 3] {
    let (w, h) = image.dimensions();
    let sample = if w > HISTOGRAM_SAMPLE_SIDE || h > HISTOGRAM_SAMPLE_SIDE {
        image
            .thumbnail(HISTOGRAM_SAMPLE_SIDE, HISTOGRAM_SAMPLE_SIDE)
            .to_rgb8()
    } else {
        image.to_rgb8()
    };

    let mut counts = [[0u32; HISTOGRAM_BINS]; 3];
    for pixel in sample.pixels() {
        for (channel, &value) in pixel.0.iter().enumerate() {
            counts[channel][usize::from(value) * HISTOGRAM_BINS / 256] += 1;
        }
    }

    let total = (sample.width() * sample.height()).max(1) as f32;
    let mut histogram = [[0f32; HISTOGRAM_BINS]; 3];
    for (channel, bins) in counts.iter().enumerate() {
        for (bin, &count) in bins.iter().enumerate() {
            histogram[channel][bin] = count as f32 / total;
        }
    }
    histogram
}

fn pixel_digest(image: &DynamicImage) -> [u8; 16] {
    let rgba = image.to_rgba8();
    let mut hasher = Md5::new();
    hasher.update(rgba.width().to_le_bytes());
    hasher.update(rgba.height().to_le_bytes());
    hasher.update(rgba.as_raw());

    let mut digest = [0u8; 16];
    digest.copy_from_slice(&hasher.finalize());
    digest
}
