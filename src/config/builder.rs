//! Type-safe builder for `LocateConfig` using the typestate pattern
//!
//! The source image is the only required field; `build()` is only available
//! once it has been set.

use anyhow::{Result, anyhow, bail};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use super::types::LocateConfig;
use crate::dedup::{DedupMode, SimilarityThresholds};
use crate::utils::constants::{
    DEFAULT_BACKPRESSURE_POLL_MS, DEFAULT_CRAWL_TIMEOUT_SECS, DEFAULT_DEPTH,
    DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_MAX_IMAGE_SIZE,
    DEFAULT_MAX_RESOLVE_ATTEMPTS, DEFAULT_NAVIGATION_TIMEOUT_SECS, SAVE_FOLDER_SUFFIX, SEARCH_URL,
};

// Type state for the builder
pub struct WithSourceImage;

pub struct LocateConfigBuilder<State = ()> {
    pub(crate) source_image: Option<PathBuf>,
    pub(crate) save_folder: Option<PathBuf>,
    pub(crate) depth: usize,
    pub(crate) dedup_mode: DedupMode,
    pub(crate) thresholds: SimilarityThresholds,
    pub(crate) debug: bool,
    pub(crate) headless: bool,
    pub(crate) search_endpoint: String,
    pub(crate) navigation_timeout_secs: u64,
    pub(crate) idle_timeout_secs: u64,
    pub(crate) max_resolve_attempts: u32,
    pub(crate) backpressure_poll_ms: u64,
    pub(crate) download_timeout_secs: u64,
    pub(crate) max_image_size: usize,
    pub(crate) crawl_timeout_secs: Option<u64>,
    pub(crate) write_manifest: bool,
    pub(crate) chrome_data_dir: Option<PathBuf>,
    pub(crate) allow_loopback: bool,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for LocateConfigBuilder<()> {
    fn default() -> Self {
        Self {
            source_image: None,
            save_folder: None,
            depth: DEFAULT_DEPTH,
            dedup_mode: DedupMode::default(),
            thresholds: SimilarityThresholds::default(),
            debug: false,
            headless: true,
            search_endpoint: SEARCH_URL.to_string(),
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            max_resolve_attempts: DEFAULT_MAX_RESOLVE_ATTEMPTS,
            backpressure_poll_ms: DEFAULT_BACKPRESSURE_POLL_MS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
            crawl_timeout_secs: Some(DEFAULT_CRAWL_TIMEOUT_SECS),
            write_manifest: true,
            chrome_data_dir: None,
            allow_loopback: false,
            _phantom: PhantomData,
        }
    }
}

impl LocateConfig {
    /// Create a builder for configuring a `LocateConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> LocateConfigBuilder<()> {
        LocateConfigBuilder::default()
    }
}

impl LocateConfigBuilder<()> {
    pub fn source_image(self, path: impl Into<PathBuf>) -> LocateConfigBuilder<WithSourceImage> {
        LocateConfigBuilder {
            source_image: Some(path.into()),
            save_folder: self.save_folder,
            depth: self.depth,
            dedup_mode: self.dedup_mode,
            thresholds: self.thresholds,
            debug: self.debug,
            headless: self.headless,
            search_endpoint: self.search_endpoint,
            navigation_timeout_secs: self.navigation_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
            max_resolve_attempts: self.max_resolve_attempts,
            backpressure_poll_ms: self.backpressure_poll_ms,
            download_timeout_secs: self.download_timeout_secs,
            max_image_size: self.max_image_size,
            crawl_timeout_secs: self.crawl_timeout_secs,
            write_manifest: self.write_manifest,
            chrome_data_dir: self.chrome_data_dir,
            allow_loopback: self.allow_loopback,
            _phantom: PhantomData,
        }
    }
}

/// Make a path absolute against the current directory without touching the filesystem
fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| anyhow!("Cannot resolve current directory: {e}"))?;
    Ok(cwd.join(path))
}

/// `<absolute source path>_images`
#[must_use]
pub fn default_save_folder(source_image: &Path) -> PathBuf {
    let mut folder = source_image.as_os_str().to_owned();
    folder.push(SAVE_FOLDER_SUFFIX);
    PathBuf::from(folder)
}

impl LocateConfigBuilder<WithSourceImage> {
    pub fn build(self) -> Result<LocateConfig> {
        let source_image = absolutize(
            &self
                .source_image
                .ok_or_else(|| anyhow!("source_image is required"))?,
        )?;

        if self.depth == 0 {
            bail!("depth must be at least 1");
        }
        if self.max_resolve_attempts == 0 {
            bail!("max_resolve_attempts must be at least 1");
        }
        if self.backpressure_poll_ms == 0 {
            bail!("backpressure_poll_ms must be positive");
        }
        self.thresholds.validate().map_err(|e| anyhow!(e))?;
        if url::Url::parse(&self.search_endpoint).is_err() {
            bail!("search_endpoint '{}' is not a valid URL", self.search_endpoint);
        }

        let save_folder = match self.save_folder {
            Some(folder) => absolutize(&folder)?,
            None => default_save_folder(&source_image),
        };

        // Enforce headless mode in release builds
        #[cfg(not(debug_assertions))]
        let headless = if self.headless {
            true
        } else {
            tracing::warn!("Headed mode requested in a release build; the browser window will be visible");
            false
        };

        #[cfg(debug_assertions)]
        let headless = self.headless;

        Ok(LocateConfig {
            source_image,
            save_folder,
            depth: self.depth,
            dedup_mode: self.dedup_mode,
            thresholds: self.thresholds,
            debug: self.debug,
            headless,
            search_endpoint: self.search_endpoint.trim_end_matches('?').to_string(),
            navigation_timeout_secs: self.navigation_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
            max_resolve_attempts: self.max_resolve_attempts,
            backpressure_poll_ms: self.backpressure_poll_ms,
            download_timeout_secs: self.download_timeout_secs,
            max_image_size: self.max_image_size,
            crawl_timeout_secs: self.crawl_timeout_secs,
            write_manifest: self.write_manifest,
            chrome_data_dir: self.chrome_data_dir,
            allow_loopback: self.allow_loopback,
        })
    }
}

// Builder methods available at any state
impl<State> LocateConfigBuilder<State> {
    #[must_use]
    pub fn save_folder(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_folder = Some(dir.into());
        self
    }

    /// Number of distinct images to accept (default: 4)
    #[must_use]
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    #[must_use]
    pub fn dedup_mode(mut self, mode: DedupMode) -> Self {
        self.dedup_mode = mode;
        self
    }

    #[must_use]
    pub fn thresholds(mut self, thresholds: SimilarityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn search_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.search_endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn navigation_timeout_secs(mut self, secs: u64) -> Self {
        self.navigation_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn idle_timeout_secs(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }

    /// Total resolution attempts per candidate before it is dropped (default: 4)
    #[must_use]
    pub fn max_resolve_attempts(mut self, attempts: u32) -> Self {
        self.max_resolve_attempts = attempts;
        self
    }

    #[must_use]
    pub fn backpressure_poll_ms(mut self, ms: u64) -> Self {
        self.backpressure_poll_ms = ms;
        self
    }

    #[must_use]
    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.download_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn max_image_size(mut self, bytes: usize) -> Self {
        self.max_image_size = bytes;
        self
    }

    /// Overall crawl deadline; `None` lets the crawl run until candidates run out
    #[must_use]
    pub fn crawl_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.crawl_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn write_manifest(mut self, write: bool) -> Self {
        self.write_manifest = write;
        self
    }

    #[must_use]
    pub fn chrome_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.chrome_data_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn allow_loopback(mut self, allow: bool) -> Self {
        self.allow_loopback = allow;
        self
    }
}
