//! Crawl coordination: serial resolution feeding a quota-bounded worker pool
//!
//! One coordinating task walks the candidates in extraction order and drives
//! the resolver inline. Every resolved URL becomes a download task on a
//! `JoinSet`, started only while fewer workers are in flight than images are
//! still needed. Dropping the coordinator future aborts every worker.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::crawl_types::{
    AcceptedImage, Candidate, CrawlReport, CrawlResult, DownloadOutcome, Resolution,
    TerminationReason,
};
use super::progress::{NoOpProgress, ProgressReporter};
use super::state::{Capacity, CrawlState};
use crate::downloader::ImageDownloader;
use crate::page::SearchPage;
use crate::similar_search::{Resolve, extract_candidates, open_similar_listing};
use crate::utils::constants::{DEFAULT_BACKPRESSURE_POLL_MS, SEARCH_URL};

/// Drives one crawl from a loaded result page to a [`CrawlReport`]
pub struct Coordinator<R, D> {
    resolver: R,
    downloader: Arc<D>,
    state: Arc<CrawlState>,
    progress: Arc<dyn ProgressReporter>,
    poll: Duration,
    deadline: Option<Duration>,
    search_endpoint: String,
}

impl<R: Resolve, D: ImageDownloader> Coordinator<R, D> {
    #[must_use]
    pub fn new(resolver: R, downloader: Arc<D>, depth: usize) -> Self {
        Self {
            resolver,
            downloader,
            state: CrawlState::new(depth),
            progress: Arc::new(NoOpProgress),
            poll: Duration::from_millis(DEFAULT_BACKPRESSURE_POLL_MS),
            deadline: None,
            search_endpoint: SEARCH_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Backpressure re-check interval
    #[must_use]
    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    /// Stop dispatching and abort workers once `deadline` has passed
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Endpoint candidate links are rewritten against
    #[must_use]
    pub fn with_search_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.search_endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    #[must_use]
    pub fn state(&self) -> &Arc<CrawlState> {
        &self.state
    }

    /// Open the similar-images listing on `page`, extract candidates and dispatch them
    pub async fn crawl<P: SearchPage + ?Sized>(
        &self,
        page: &P,
        search_url: &str,
    ) -> CrawlResult<CrawlReport> {
        if let Err(e) = open_similar_listing(page).await {
            if e.is_session_closed() {
                return Err(e.into());
            }
            // Fall through: the plain result page may still carry similar links
            warn!("Could not switch to the similar-images tab: {e}");
        }

        let candidates = extract_candidates(page, &self.search_endpoint).await?;
        self.progress.report_candidates_found(candidates.len());
        self.dispatch(search_url, candidates).await
    }

    /// Resolve and download `candidates` until they run out or the depth is met
    pub async fn dispatch(
        &self,
        search_url: &str,
        candidates: Vec<Candidate>,
    ) -> CrawlResult<CrawlReport> {
        let started = Instant::now();
        let mut report = CrawlReport::empty(search_url, self.state.depth());
        report.candidates_found = candidates.len();

        if candidates.is_empty() {
            info!("No candidates found; nothing to download");
            self.state.terminate(TerminationReason::CandidatesExhausted);
            return Ok(report);
        }

        let mut workers = JoinSet::new();
        // Dropped before `workers`, so aborted downloads already see the flag
        let _cancel_on_drop = TerminateOnDrop(self.state.as_ref());
        let run = self.run(candidates, &mut report, &mut workers);
        match self.deadline {
            Some(limit) => {
                if let Ok(result) = tokio::time::timeout(limit, run).await {
                    result?;
                } else {
                    warn!("Crawl deadline of {}s elapsed", limit.as_secs());
                    self.state.terminate(TerminationReason::Deadline);
                }
            }
            None => run.await?,
        }

        if self.state.is_terminated() {
            // Finished workers keep their outcome; the rest are cancelled
            workers.abort_all();
        }
        collect_outcomes(&mut workers, &mut report).await;

        self.state.terminate(TerminationReason::CandidatesExhausted);
        report.terminated_by = self
            .state
            .termination_reason()
            .unwrap_or(TerminationReason::CandidatesExhausted);
        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            "Crawl finished: {}/{} accepted, {} resolved, {} resolution failures ({:?})",
            report.accepted_count(),
            report.depth,
            report.resolved.len(),
            report.resolution_failures,
            report.terminated_by
        );
        Ok(report)
    }

    async fn run(
        &self,
        candidates: Vec<Candidate>,
        report: &mut CrawlReport,
        workers: &mut JoinSet<DownloadOutcome>,
    ) -> CrawlResult<()> {
        let total = candidates.len();

        for (index, mut candidate) in candidates.into_iter().enumerate() {
            if self.state.is_terminated() {
                debug!("Crawl terminated; {} candidates left undispatched", total - index);
                return Ok(());
            }

            match self.resolver.resolve(&mut candidate).await? {
                Resolution::Resolved(image) => {
                    debug!("[{}/{total}] {} -> {}", index + 1, candidate.url, image.url);
                    report.resolved.push(image.url.clone());
                    self.progress.report_resolved(&candidate.url, &image.url);

                    if self.state.wait_for_capacity(self.poll).await == Capacity::Exhausted {
                        return Ok(());
                    }

                    let guard = self.state.start_worker();
                    let downloader = Arc::clone(&self.downloader);
                    let state = Arc::clone(&self.state);
                    workers.spawn(async move {
                        let _guard = guard;
                        downloader.download(image, state).await
                    });
                }
                Resolution::Empty => {
                    debug!("[{}/{total}] {} offered no image", index + 1, candidate.url);
                }
                Resolution::Failed(failure) => {
                    report.resolution_failures += 1;
                    self.progress
                        .report_resolution_failed(&candidate.url, &failure);
                }
            }
        }

        debug!("Candidates exhausted; draining {} workers", workers.len());
        collect_outcomes(workers, report).await;
        Ok(())
    }
}

/// Marks the crawl cancelled if `dispatch` is dropped before it finishes
///
/// A no-op after a normal finish, since the first termination reason wins.
struct TerminateOnDrop<'a>(&'a CrawlState);

impl Drop for TerminateOnDrop<'_> {
    fn drop(&mut self) {
        self.0.terminate(TerminationReason::Cancelled);
    }
}

/// Join every remaining worker, recording outcomes of those that completed
async fn collect_outcomes(workers: &mut JoinSet<DownloadOutcome>, report: &mut CrawlReport) {
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(outcome) => {
                if let DownloadOutcome::Accepted {
                    url,
                    filename,
                    byte_size,
                } = &outcome
                {
                    report.accepted.push(AcceptedImage {
                        url: url.clone(),
                        filename: filename.clone(),
                        byte_size: *byte_size,
                    });
                }
                report.outcomes.push(outcome);
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => warn!("Download task failed: {e}"),
        }
    }
}
