//! Download worker: fetch one resolved image, vet it and persist it

use async_trait::async_trait;
use image::DynamicImage;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::naming::content_hash_name;
use crate::crawl_engine::progress::{NoOpProgress, ProgressReporter};
use crate::crawl_engine::state::CrawlState;
use crate::crawl_engine::{DownloadFailure, DownloadOutcome, ResolvedImage, SkipReason};
use crate::dedup::DuplicateDetector;
use crate::store::ImageStore;
use crate::utils::constants::DEFAULT_MAX_IMAGE_SIZE;
use crate::utils::{filename_from_url, is_loopback_url};

/// Turns a resolved URL into a [`DownloadOutcome`]
///
/// Implementations are shared between concurrently running download tasks.
#[async_trait]
pub trait ImageDownloader: Send + Sync + 'static {
    async fn download(&self, image: ResolvedImage, state: Arc<CrawlState>) -> DownloadOutcome;
}

/// HTTP-backed [`ImageDownloader`] writing into an [`ImageStore`]
pub struct DownloadWorker {
    client: reqwest::Client,
    store: Arc<ImageStore>,
    detector: Arc<DuplicateDetector>,
    max_image_size: usize,
    allow_loopback: bool,
    progress: Arc<dyn ProgressReporter>,
}

impl DownloadWorker {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        store: Arc<ImageStore>,
        detector: Arc<DuplicateDetector>,
    ) -> Self {
        Self {
            client,
            store,
            detector,
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
            allow_loopback: false,
            progress: Arc::new(NoOpProgress),
        }
    }

    #[must_use]
    pub fn with_max_image_size(mut self, bytes: usize) -> Self {
        self.max_image_size = bytes;
        self
    }

    /// Fetch from loopback hosts instead of skipping them (local test servers)
    #[must_use]
    pub fn allow_loopback(mut self, allow: bool) -> Self {
        self.allow_loopback = allow;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<ImageStore> {
        &self.store
    }

    async fn fetch(&self, url: &str) -> Result<(Vec<u8>, Option<String>), DownloadFailure> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadFailure::Network(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DownloadFailure::HttpStatus(status.as_u16()));
        }

        if let Some(length) = response.content_length()
            && length > self.max_image_size as u64
        {
            return Err(DownloadFailure::TooLarge(length));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DownloadFailure::Network(e.to_string()))?
        {
            body.extend_from_slice(&chunk);
            if body.len() > self.max_image_size {
                return Err(DownloadFailure::TooLarge(body.len() as u64));
            }
        }

        Ok((body, content_type))
    }

    async fn process(&self, url: &str, state: &Arc<CrawlState>) -> DownloadOutcome {
        if !self.allow_loopback && is_loopback_url(url) {
            return DownloadOutcome::skipped(url, SkipReason::LocalhostRedirect);
        }

        let url_name = filename_from_url(url);
        if let Some(name) = &url_name
            && self.store.contains(name)
        {
            return DownloadOutcome::skipped(url, SkipReason::AlreadyExists);
        }

        let (body, content_type) = match self.fetch(url).await {
            Ok(fetched) => fetched,
            Err(failure) => return DownloadOutcome::failed(url, failure),
        };

        let filename = match url_name {
            Some(name) => {
                if content_type.as_deref().is_some_and(|ct| ct.starts_with("text/")) {
                    return DownloadOutcome::skipped(url, SkipReason::NotAnImage);
                }
                name
            }
            None => match content_hash_name(&body) {
                Some(name) => name,
                None => return DownloadOutcome::skipped(url, SkipReason::Unreadable),
            },
        };

        let _write_guard = self.store.lock().await;

        if self.store.contains(&filename) {
            return DownloadOutcome::skipped(url, SkipReason::AlreadyExists);
        }
        if state.is_terminated() {
            return DownloadOutcome::skipped(url, SkipReason::QuotaReached);
        }

        let body = Arc::new(body);

        if self.detector.is_enabled() {
            let detector = Arc::clone(&self.detector);
            let store = Arc::clone(&self.store);
            let bytes = Arc::clone(&body);
            let verdict = tokio::task::spawn_blocking(move || {
                let image: DynamicImage = image::load_from_memory(&bytes).ok()?;
                Some(detector.find_duplicate(&image, store.root()))
            })
            .await;

            match verdict {
                Ok(None) => return DownloadOutcome::skipped(url, SkipReason::Unreadable),
                Ok(Some(Some(matched))) => {
                    debug!("{url} duplicates {matched:?}");
                    return DownloadOutcome::skipped(url, SkipReason::Duplicate);
                }
                Ok(Some(None)) => {}
                Err(e) => {
                    return DownloadOutcome::failed(
                        url,
                        DownloadFailure::Io(format!("duplicate check task failed: {e}")),
                    );
                }
            }
        }

        let Some(slot) = state.try_reserve() else {
            return DownloadOutcome::skipped(url, SkipReason::QuotaReached);
        };

        let store = Arc::clone(&self.store);
        let name = filename.clone();
        let bytes = Arc::clone(&body);
        let crawl = Arc::clone(state);
        // Survives task abort; termination is re-checked before the rename
        let written = tokio::task::spawn_blocking(move || {
            store.persist(&name, &bytes, || crawl.is_terminated())
        })
        .await;

        match written {
            Ok(Ok(None)) => DownloadOutcome::skipped(url, SkipReason::QuotaReached),
            Ok(Ok(Some(byte_size))) => {
                let accepted = slot.commit();
                info!("Saved {filename} ({byte_size} bytes, {accepted}/{})", state.depth());
                DownloadOutcome::Accepted {
                    url: url.to_string(),
                    filename,
                    byte_size,
                }
            }
            Ok(Err(e)) => DownloadOutcome::failed(url, DownloadFailure::Io(e.to_string())),
            Err(e) => DownloadOutcome::failed(url, DownloadFailure::Io(format!("write task failed: {e}"))),
        }
    }
}

#[async_trait]
impl ImageDownloader for DownloadWorker {
    async fn download(&self, image: ResolvedImage, state: Arc<CrawlState>) -> DownloadOutcome {
        let outcome = self.process(&image.url, &state).await;

        match &outcome {
            DownloadOutcome::Accepted { .. } => {}
            DownloadOutcome::Skipped { url, reason } => debug!("Skipping {url}: {reason}"),
            DownloadOutcome::Failed { url, failure } => warn!("Failed to download {url}: {failure}"),
        }
        self.progress.report_download(&outcome);
        outcome
    }
}
