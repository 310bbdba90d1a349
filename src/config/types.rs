//! Core configuration type for locate runs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::dedup::{DedupMode, SimilarityThresholds};

/// Main configuration struct for one locate run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocateConfig {
    /// Image whose look-alikes are searched for.
    ///
    /// **INVARIANT:** Always an absolute path (normalized in builder).
    pub(crate) source_image: PathBuf,

    /// Destination directory for accepted images.
    ///
    /// **INVARIANT:** Always an absolute path. Defaults to
    /// `<absolute source path>_images`.
    pub(crate) save_folder: PathBuf,

    /// Number of distinct images to accept before stopping
    pub(crate) depth: usize,

    pub(crate) dedup_mode: DedupMode,
    pub(crate) thresholds: SimilarityThresholds,
    pub(crate) debug: bool,
    pub(crate) headless: bool,

    /// Search-by-image endpoint the source image is uploaded to
    pub(crate) search_endpoint: String,

    /// Timeout in seconds for `page.goto()` operations
    ///
    /// Default: 30 seconds
    pub(crate) navigation_timeout_secs: u64,

    /// Timeout in seconds for network-idle and selector waits
    ///
    /// Elapsing this is what the resolver treats as a retryable timeout.
    ///
    /// Default: 30 seconds
    pub(crate) idle_timeout_secs: u64,

    /// Total resolution attempts per candidate
    ///
    /// Default: 4
    pub(crate) max_resolve_attempts: u32,

    /// Backpressure re-check interval in milliseconds
    ///
    /// Default: 100 ms
    pub(crate) backpressure_poll_ms: u64,

    /// Per-image HTTP timeout in seconds
    ///
    /// Default: 60 seconds
    pub(crate) download_timeout_secs: u64,

    /// Largest accepted image body in bytes
    ///
    /// Default: 50 MiB
    pub(crate) max_image_size: usize,

    /// Overall crawl deadline in seconds; `None` disables it
    ///
    /// Default: 600 seconds
    pub(crate) crawl_timeout_secs: Option<u64>,

    /// Write `manifest.json` into the save folder after the run
    pub(crate) write_manifest: bool,

    /// Parent directory for the temporary Chrome profile (system temp dir if `None`)
    pub(crate) chrome_data_dir: Option<PathBuf>,

    /// Download from loopback hosts instead of skipping them
    pub(crate) allow_loopback: bool,
}
