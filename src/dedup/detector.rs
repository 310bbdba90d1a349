//! Near-duplicate detection against the query image and the store
//!
//! All methods here are blocking (decode, hash, directory scan) and are meant
//! to be called from `spawn_blocking`.

use dashmap::DashMap;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, trace, warn};

use super::autocrop::autocrop;
use super::fingerprint::Fingerprint;
use super::similarity::{DedupMode, PerceptualScorer, SimilarityScorer, SimilarityThresholds};

/// Cached fingerprint of one store file; `None` when the file is not a decodable image
type CacheEntry = (Option<SystemTime>, Option<Arc<Fingerprint>>);

/// What a duplicate matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateOf {
    Query,
    Stored(PathBuf),
}

pub struct DuplicateDetector {
    scorer: Arc<dyn SimilarityScorer>,
    enabled: bool,
    query: Option<Fingerprint>,
    cache: DashMap<PathBuf, CacheEntry>,
}

impl std::fmt::Debug for DuplicateDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateDetector")
            .field("enabled", &self.enabled)
            .field("has_query", &self.query.is_some())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl DuplicateDetector {
    /// Detector backed by [`PerceptualScorer`]
    #[must_use]
    pub fn new(mode: DedupMode, thresholds: SimilarityThresholds) -> Self {
        Self::with_scorer(
            Arc::new(PerceptualScorer::new(mode, thresholds)),
            mode.is_enabled(),
        )
    }

    #[must_use]
    pub fn with_scorer(scorer: Arc<dyn SimilarityScorer>, enabled: bool) -> Self {
        Self {
            scorer,
            enabled,
            query: None,
            cache: DashMap::new(),
        }
    }

    /// Detector that reports every image as unique
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(DedupMode::Off, SimilarityThresholds::default())
    }

    /// Fingerprint the query image (auto-cropped) once up front
    #[must_use]
    pub fn with_query(mut self, query: &DynamicImage) -> Self {
        if self.enabled {
            self.query = Some(fingerprint(query));
        }
        self
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `candidate` matches the query image or anything already in `store_dir`
    pub fn is_duplicate(&self, candidate: &DynamicImage, store_dir: &Path) -> bool {
        self.find_duplicate(candidate, store_dir).is_some()
    }

    /// Like [`is_duplicate`](Self::is_duplicate) but reports what matched
    pub fn find_duplicate(&self, candidate: &DynamicImage, store_dir: &Path) -> Option<DuplicateOf> {
        if !self.enabled {
            return None;
        }

        let candidate = fingerprint(candidate);

        if let Some(query) = &self.query
            && self.scorer.similar(&candidate, query)
        {
            trace!("Candidate matches the query image");
            return Some(DuplicateOf::Query);
        }

        let entries = match std::fs::read_dir(store_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot list store {}: {e}", store_dir.display());
                return None;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if metadata.is_dir() {
                continue;
            }

            let Some(stored) = self.stored_fingerprint(&path, metadata.modified().ok()) else {
                continue;
            };
            if self.scorer.similar(&candidate, &stored) {
                debug!("Candidate matches stored image {}", path.display());
                return Some(DuplicateOf::Stored(path));
            }
        }

        None
    }

    fn stored_fingerprint(&self, path: &Path, modified: Option<SystemTime>) -> Option<Arc<Fingerprint>> {
        if let Some(entry) = self.cache.get(path)
            && modified.is_some()
            && entry.0 == modified
        {
            return entry.1.clone();
        }

        let decoded = match image::open(path) {
            Ok(img) => Some(Arc::new(fingerprint(&img))),
            Err(e) => {
                trace!("Skipping undecodable store entry {}: {e}", path.display());
                None
            }
        };
        self.cache
            .insert(path.to_path_buf(), (modified, decoded.clone()));
        decoded
    }
}

/// Auto-crop then fingerprint
#[must_use]
pub fn fingerprint(image: &DynamicImage) -> Fingerprint {
    Fingerprint::compute(&autocrop(image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn stripes(period: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(48, 48, |x, _| {
            if (x / period) % 2 == 0 { Rgb([250, 30, 30]) } else { Rgb([30, 30, 250]) }
        }))
    }

    #[test]
    fn disabled_detector_never_matches() {
        let dir = tempfile::tempdir().expect("tempdir");
        let img = stripes(4);
        let detector = DuplicateDetector::disabled().with_query(&img);
        assert!(!detector.is_duplicate(&img, dir.path()));
    }

    #[test]
    fn query_image_matches_itself_without_a_scan() {
        let img = stripes(4);
        let detector =
            DuplicateDetector::new(DedupMode::Full, SimilarityThresholds::default()).with_query(&img);
        // the store path does not exist; a query match must not need it
        assert_eq!(
            detector.find_duplicate(&img, Path::new("/nonexistent/store")),
            Some(DuplicateOf::Query)
        );
    }

    #[test]
    fn non_image_store_entries_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("manifest.json"), b"{}").expect("write");
        std::fs::create_dir(dir.path().join("nested")).expect("mkdir");

        let detector = DuplicateDetector::new(DedupMode::Fast, SimilarityThresholds::default());
        assert!(!detector.is_duplicate(&stripes(4), dir.path()));
    }

    #[test]
    fn stored_copy_is_found_and_cached() {
        let dir = tempfile::tempdir().expect("tempdir");
        let img = stripes(6);
        let stored = dir.path().join("a.png");
        img.save(&stored).expect("save png");

        let detector = DuplicateDetector::new(DedupMode::Full, SimilarityThresholds::default());
        assert_eq!(
            detector.find_duplicate(&img, dir.path()),
            Some(DuplicateOf::Stored(stored.clone()))
        );
        assert!(detector.cache.contains_key(&stored));
        assert!(detector.is_duplicate(&img, dir.path()));
    }
}
