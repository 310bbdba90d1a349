pub mod browser_profile;
pub mod browser_setup;
pub mod config;
pub mod crawl_engine;
pub mod dedup;
pub mod downloader;
pub mod error;
pub mod locator;
pub mod manifest;
pub mod page;
pub mod similar_search;
pub mod store;
pub mod utils;

pub use browser_setup::{
    apply_stealth_measures, download_managed_browser, find_browser_executable, launch_browser,
};
pub use config::LocateConfig;
pub use crawl_engine::{
    AcceptedImage, Candidate, Coordinator, CrawlError, CrawlReport, CrawlResult, CrawlState,
    DownloadFailure, DownloadOutcome, NoOpProgress, ProgressReporter, Resolution,
    ResolutionFailure, ResolvedImage, SkipReason, TerminationReason,
};
pub use dedup::{DedupMode, DuplicateDetector, SimilarityScorer, SimilarityThresholds};
pub use downloader::{DownloadWorker, ImageDownloader};
pub use error::{InputError, LocateError, LocateResult};
pub use locator::{locate_similar, locate_similar_until};
pub use manifest::RunManifest;
pub use page::{ChromiumPage, PageElement, PageError, SearchPage};
pub use similar_search::{BrowserSession, LinkResolver, Resolve, SearchRoot};
pub use store::ImageStore;
