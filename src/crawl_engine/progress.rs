//! Progress reporting abstraction for locate runs
//!
//! Defines the `ProgressReporter` trait for lifecycle event reporting
//! and provides a no-op implementation for simple use cases.

use super::crawl_types::{DownloadOutcome, ResolutionFailure};

/// Trait for reporting crawl progress at key lifecycle events
///
/// Implementations can send updates to channels, log to console, update UI, etc.
/// Hooks are called from the coordinating task and from download workers, so
/// implementations must be cheap and non-blocking.
pub trait ProgressReporter: Send + Sync {
    /// Report that the source image has been uploaded
    fn report_uploaded(&self, search_url: &str);

    /// Report that the browser session is ready
    fn report_browser_launched(&self);

    /// Report how many candidates the listing produced
    fn report_candidates_found(&self, count: usize);

    /// Report that a candidate resolved to a direct image URL
    fn report_resolved(&self, candidate: &str, image_url: &str);

    /// Report that a candidate was dropped
    fn report_resolution_failed(&self, candidate: &str, failure: &ResolutionFailure);

    /// Report the outcome of one download
    fn report_download(&self, outcome: &DownloadOutcome);

    /// Report that cleanup has started
    fn report_cleanup_started(&self);

    /// Report that the run has completed successfully
    fn report_completed(&self, accepted: usize);

    /// Report an error that ended the run
    fn report_error(&self, error: &str);
}

/// Progress reporter that does nothing
#[derive(Debug, Clone, Copy)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    #[inline(always)]
    fn report_uploaded(&self, _search_url: &str) {}

    #[inline(always)]
    fn report_browser_launched(&self) {}

    #[inline(always)]
    fn report_candidates_found(&self, _count: usize) {}

    #[inline(always)]
    fn report_resolved(&self, _candidate: &str, _image_url: &str) {}

    #[inline(always)]
    fn report_resolution_failed(&self, _candidate: &str, _failure: &ResolutionFailure) {}

    #[inline(always)]
    fn report_download(&self, _outcome: &DownloadOutcome) {}

    #[inline(always)]
    fn report_cleanup_started(&self) {}

    #[inline(always)]
    fn report_completed(&self, _accepted: usize) {}

    #[inline(always)]
    fn report_error(&self, _error: &str) {}
}
