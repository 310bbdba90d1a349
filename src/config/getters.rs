//! Getter methods for `LocateConfig`

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::LocateConfig;
use crate::dedup::{DedupMode, SimilarityThresholds};

impl LocateConfig {
    #[must_use]
    pub fn source_image(&self) -> &Path {
        &self.source_image
    }

    #[must_use]
    pub fn save_folder(&self) -> &Path {
        &self.save_folder
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn dedup_mode(&self) -> DedupMode {
        self.dedup_mode
    }

    #[must_use]
    pub fn thresholds(&self) -> &SimilarityThresholds {
        &self.thresholds
    }

    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn search_endpoint(&self) -> &str {
        &self.search_endpoint
    }

    #[must_use]
    pub fn navigation_timeout_secs(&self) -> u64 {
        self.navigation_timeout_secs
    }

    #[must_use]
    pub fn idle_timeout_secs(&self) -> u64 {
        self.idle_timeout_secs
    }

    #[must_use]
    pub fn max_resolve_attempts(&self) -> u32 {
        self.max_resolve_attempts
    }

    #[must_use]
    pub fn backpressure_poll(&self) -> Duration {
        Duration::from_millis(self.backpressure_poll_ms)
    }

    #[must_use]
    pub fn download_timeout_secs(&self) -> u64 {
        self.download_timeout_secs
    }

    #[must_use]
    pub fn max_image_size(&self) -> usize {
        self.max_image_size
    }

    /// Overall crawl deadline, `None` when disabled
    #[must_use]
    pub fn crawl_timeout(&self) -> Option<Duration> {
        self.crawl_timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn write_manifest(&self) -> bool {
        self.write_manifest
    }

    #[must_use]
    pub fn chrome_data_dir(&self) -> Option<&PathBuf> {
        self.chrome_data_dir.as_ref()
    }

    #[must_use]
    pub fn allow_loopback(&self) -> bool {
        self.allow_loopback
    }
}
