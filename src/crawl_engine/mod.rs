//! Crawl Engine Module
//!
//! This module contains the crawl-resolve-download pipeline: the shared
//! crawl state, the coordinator that drives it, progress hooks and browser
//! cleanup.

// Sub-modules
pub mod cleanup;
pub mod coordinator;
pub mod crawl_types;
pub mod progress;
pub mod state;

// Re-exports for public API
pub use coordinator::Coordinator;
pub use progress::{NoOpProgress, ProgressReporter};
pub use state::{Capacity, CrawlState, InFlightGuard, QuotaSlot};

// Re-export crawl types
pub use crawl_types::{
    AcceptedImage, Candidate, CrawlError, CrawlReport, CrawlResult, DownloadFailure,
    DownloadOutcome, Resolution, ResolutionFailure, ResolvedImage, SkipReason, TerminationReason,
};
