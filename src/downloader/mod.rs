//! Image download workers
//!
//! A worker turns one resolved image URL into a [`DownloadOutcome`](crate::crawl_engine::DownloadOutcome):
//! loopback and pre-existing names are skipped before any request is made,
//! bodies are size-limited, unnamed images get content-addressed names and
//! everything goes through the duplicate detector before it is persisted.

pub mod naming;
pub mod worker;

use std::time::Duration;

pub use naming::{content_hash_name, md5_hex};
pub use worker::{DownloadWorker, ImageDownloader};

use crate::utils::constants::CHROME_USER_AGENT;

/// HTTP client shared by every download worker of a run
pub fn http_client(timeout_secs: u64) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(CHROME_USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}
