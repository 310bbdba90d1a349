//! Top-level locate run
//!
//! Upload the source image, bootstrap the browser, crawl the similar-images
//! listing and persist the run manifest. The browser session is torn down on
//! every exit path, including cancellation.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::LocateConfig;
use crate::crawl_engine::{Coordinator, CrawlError, CrawlReport, NoOpProgress, ProgressReporter};
use crate::dedup::DuplicateDetector;
use crate::downloader::{DownloadWorker, http_client};
use crate::error::{LocateError, LocateResult};
use crate::manifest::RunManifest;
use crate::similar_search::{BrowserSession, LinkResolver, upload_image};
use crate::store::ImageStore;

/// Find and download images similar to `config.source_image()`
pub async fn locate_similar(config: &LocateConfig) -> LocateResult<CrawlReport> {
    locate_similar_until(config, Arc::new(NoOpProgress), std::future::pending()).await
}

/// Like [`locate_similar`], but stops with [`LocateError::Cancelled`] once `shutdown` resolves
pub async fn locate_similar_until<F>(
    config: &LocateConfig,
    progress: Arc<dyn ProgressReporter>,
    shutdown: F,
) -> LocateResult<CrawlReport>
where
    F: Future<Output = ()>,
{
    let mut session = None;

    let outcome = tokio::select! {
        result = run(config, Arc::clone(&progress), &mut session) => result,
        () = shutdown => {
            info!("Cancellation requested, stopping crawl");
            Err(LocateError::Cancelled)
        }
    };

    progress.report_cleanup_started();
    if let Some(session) = session.take() {
        session.shutdown().await;
    }

    match &outcome {
        Ok(report) => progress.report_completed(report.accepted_count()),
        Err(e) => progress.report_error(&e.to_string()),
    }
    outcome
}

async fn run(
    config: &LocateConfig,
    progress: Arc<dyn ProgressReporter>,
    session_slot: &mut Option<BrowserSession>,
) -> LocateResult<CrawlReport> {
    let started_at = Utc::now();
    if config.debug() {
        info!("Run configuration: {config:?}");
    }

    let client = http_client(config.download_timeout_secs())
        .map_err(|e| LocateError::Config(format!("Failed to build HTTP client: {e}")))?;

    let root = upload_image(&client, config.search_endpoint(), config.source_image()).await?;
    progress.report_uploaded(&root.search_url);

    let store = Arc::new(ImageStore::open(config.save_folder())?);
    info!("Saving images to {}", store.root().display());

    let detector = if config.dedup_mode().is_enabled() {
        let detector = DuplicateDetector::new(config.dedup_mode(), *config.thresholds());
        let query = root.query_image.clone();
        tokio::task::spawn_blocking(move || detector.with_query(&query))
            .await
            .map_err(|e| CrawlError::Other(format!("Fingerprinting the source image failed: {e}")))?
    } else {
        DuplicateDetector::disabled()
    };

    let worker = DownloadWorker::new(client.clone(), Arc::clone(&store), Arc::new(detector))
        .with_max_image_size(config.max_image_size())
        .allow_loopback(config.allow_loopback())
        .with_progress(Arc::clone(&progress));

    let session = session_slot.insert(BrowserSession::open(config, &root.search_url, &client).await?);
    progress.report_browser_launched();

    let resolver =
        LinkResolver::new(session.page().clone()).with_max_attempts(config.max_resolve_attempts());
    let coordinator = Coordinator::new(resolver, Arc::new(worker), config.depth())
        .with_progress(Arc::clone(&progress))
        .with_poll_interval(config.backpressure_poll())
        .with_deadline(config.crawl_timeout())
        .with_search_endpoint(config.search_endpoint());

    let report = coordinator.crawl(session.page(), &root.search_url).await?;

    if config.write_manifest() {
        match RunManifest::new(config, started_at, report.clone()).save().await {
            Ok(path) => info!("Run manifest written to {}", path.display()),
            Err(e) => warn!("Failed to write run manifest: {e:#}"),
        }
    }

    Ok(report)
}
