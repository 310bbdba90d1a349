//! Pairwise similarity scoring over [`Fingerprint`]s

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::fingerprint::{Fingerprint, HISTOGRAM_BINS, THUMBNAIL_SIDE};

/// Which dimensions the duplicate detector uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupMode {
    /// Detector disabled, every image is unique
    Off,
    /// Hashes and exact match only
    Fast,
    /// Every dimension
    #[default]
    Full,
}

impl DedupMode {
    #[must_use]
    pub fn is_enabled(self) -> bool {
        self != DedupMode::Off
    }
}

impl fmt::Display for DedupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::Fast => "fast",
            Self::Full => "full",
        })
    }
}

impl FromStr for DedupMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "false" => Ok(Self::Off),
            "fast" => Ok(Self::Fast),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown dedup mode '{other}' (expected off, fast or full)")),
        }
    }
}

/// Normalised distance limits in `[0, 1]`
///
/// A pair within the exact, hash or structural limit is a duplicate. The
/// histogram limit only counts when structure or hash is also within twice
/// its own limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityThresholds {
    /// Hamming distance / 64, applied to both average and difference hash
    pub hash: f32,
    /// `(1 - SSIM) / 2` over the grayscale thumbnails
    pub structural: f32,
    /// Mean half-L1 distance between the per-channel colour histograms
    pub histogram: f32,
    /// Treat identical decoded pixels as duplicates
    pub exact: bool,
}

impl Default for SimilarityThresholds {
    fn default() -> Self {
        Self {
            hash: 0.10,
            structural: 0.15,
            histogram: 0.10,
            exact: true,
        }
    }
}

impl SimilarityThresholds {
    /// Every limit lies in `[0, 1]`
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("hash", self.hash),
            ("structural", self.structural),
            ("histogram", self.histogram),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} threshold must be within [0, 1], got {value}"));
            }
        }
        Ok(())
    }
}

/// Decides whether two fingerprints show the same picture
pub trait SimilarityScorer: Send + Sync {
    fn similar(&self, a: &Fingerprint, b: &Fingerprint) -> bool;
}

/// Slack applied to the structural and hash limits when colours agree
const HISTOGRAM_CORROBORATION: f32 = 2.0;

/// Hash, structural, colour and exact-match scorer
#[derive(Debug, Clone, Copy)]
pub struct PerceptualScorer {
    mode: DedupMode,
    thresholds: SimilarityThresholds,
}

impl PerceptualScorer {
    #[must_use]
    pub fn new(mode: DedupMode, thresholds: SimilarityThresholds) -> Self {
        Self { mode, thresholds }
    }

    #[must_use]
    pub fn mode(&self) -> DedupMode {
        self.mode
    }
}

impl SimilarityScorer for PerceptualScorer {
    fn similar(&self, a: &Fingerprint, b: &Fingerprint) -> bool {
        let t = &self.thresholds;
        if self.mode == DedupMode::Off {
            return false;
        }
        if t.exact && a.pixel_digest == b.pixel_digest {
            return true;
        }

        let hash = hash_distance(a.average_hash, b.average_hash)
            .min(hash_distance(a.difference_hash, b.difference_hash));
        if hash <= t.hash {
            return true;
        }
        if self.mode == DedupMode::Fast {
            return false;
        }

        let structural = structural_distance(&a.thumbnail, &b.thumbnail);
        if structural <= t.structural {
            return true;
        }

        // Same colours alone do not make the same picture
        histogram_distance(&a.histogram, &b.histogram) <= t.histogram
            && (structural <= t.structural * HISTOGRAM_CORROBORATION
                || hash <= t.hash * HISTOGRAM_CORROBORATION)
    }
}

/// Hamming distance between two 64-bit hashes, over 64
#[must_use]
pub fn hash_distance(a: u64, b: u64) -> f32 {
    (a ^ b).count_ones() as f32 / 64.0
}

/// `(1 - SSIM) / 2`, averaged over 8x8 windows of the thumbnails
#[must_use]
pub fn structural_distance(a: &[u8], b: &[u8]) -> f32 {
    const WINDOW: usize = 8;
    const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
    const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

    let side = THUMBNAIL_SIDE as usize;
    if a.len() != side * side || b.len() != side * side {
        return 1.0;
    }

    let mut total = 0.0;
    let mut windows = 0;
    for wy in (0..side).step_by(WINDOW) {
        for wx in (0..side).step_by(WINDOW) {
            let (mut sa, mut sb, mut saa, mut sbb, mut sab) = (0.0, 0.0, 0.0, 0.0, 0.0);
            for y in wy..wy + WINDOW {
                for x in wx..wx + WINDOW {
                    let pa = f64::from(a[y * side + x]);
                    let pb = f64::from(b[y * side + x]);
                    sa += pa;
                    sb += pb;
                    saa += pa * pa;
                    sbb += pb * pb;
                    sab += pa * pb;
                }
            }
            let n = (WINDOW * WINDOW) as f64;
            let (ma, mb) = (sa / n, sb / n);
            let var_a = saa / n - ma * ma;
            let var_b = sbb / n - mb * mb;
            let cov = sab / n - ma * mb;

            total += ((2.0 * ma * mb + C1) * (2.0 * cov + C2))
                / ((ma * ma + mb * mb + C1) * (var_a + var_b + C2));
            windows += 1;
        }
    }

    let ssim = total / f64::from(windows);
    ((1.0 - ssim) / 2.0).clamp(0.0, 1.0) as f32
}

/// Mean over channels of half the L1 distance between normalised histograms
#[must_use]
pub fn histogram_distance(
    a: &[[f32; HISTOGRAM_BINS]; 3],
    b: &[[f32; HISTOGRAM_BINS]; 3],
) -> f32 {
    let sum: f32 = a
        .iter()
        .zip(b)
        .map(|(ca, cb)| ca.iter().zip(cb).map(|(x, y)| (x - y).abs()).sum::<f32>() / 2.0)
        .sum();
    (sum / 3.0).clamp(0.0, 1.0)
}
