//! Perceptual duplicate detection
//!
//! Images are auto-cropped, fingerprinted ([`Fingerprint`]) and compared by a
//! [`SimilarityScorer`]. [`DuplicateDetector`] checks a candidate against the
//! query image first and then against every decodable file in the store.

pub mod autocrop;
pub mod detector;
pub mod fingerprint;
pub mod similarity;

pub use autocrop::autocrop;
pub use detector::{DuplicateDetector, DuplicateOf, fingerprint};
pub use fingerprint::Fingerprint;
pub use similarity::{DedupMode, PerceptualScorer, SimilarityScorer, SimilarityThresholds};
