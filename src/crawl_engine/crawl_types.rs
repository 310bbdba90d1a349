//! Core types for the crawl-resolve-download pipeline.
//!
//! This module contains the values that flow between the extractor, the
//! resolver, the download workers and the coordinator, plus the crawl
//! error type.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::page::PageError;

/// Custom error type for crawl operations
#[derive(Debug, Clone)]
pub enum CrawlError {
    /// Browser session is gone or unusable
    Session(String),
    /// Other errors
    Other(String),
}

impl fmt::Display for CrawlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(msg) => write!(f, "Browser session error: {msg}"),
            Self::Other(msg) => write!(f, "Crawl error: {msg}"),
        }
    }
}

impl std::error::Error for CrawlError {}

impl From<anyhow::Error> for CrawlError {
    fn from(err: anyhow::Error) -> Self {
        // Use {:#} to preserve full error chain with context
        Self::Other(format!("{err:#}"))
    }
}

impl From<PageError> for CrawlError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::SessionClosed(msg) => Self::Session(msg),
            other => Self::Other(other.to_string()),
        }
    }
}

/// Convenience alias for Result with `CrawlError`
pub type CrawlResult<T> = Result<T, CrawlError>;

/// A discovered result-page link not yet resolved to a direct image URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    /// Number of resolution attempts made so far (0 = not tried yet)
    #[serde(default)]
    pub resolve_attempts: u32,
}

impl Candidate {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            resolve_attempts: 0,
        }
    }
}

/// A direct, fetchable image URL produced from exactly one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedImage {
    pub url: String,
}

impl ResolvedImage {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Why a candidate could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionFailure {
    /// Every attempt timed out waiting for the page to settle
    Timeout { attempts: u32 },
    /// The page failed in a way retrying will not fix
    Page { message: String },
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { attempts } => write!(f, "timed out after {attempts} attempts"),
            Self::Page { message } => write!(f, "page error: {message}"),
        }
    }
}

/// Outcome of resolving one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Best-resolution direct image URL
    Resolved(ResolvedImage),
    /// Page loaded but offered no usable image URL
    Empty,
    /// Candidate is dropped
    Failed(ResolutionFailure),
}

/// Why a download was skipped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// URL points at a loopback host
    LocalhostRedirect,
    /// A file with the derived name is already in the store
    AlreadyExists,
    /// Perceptually equivalent to the query image or a stored image
    Duplicate,
    /// Content could not be decoded as an image
    Unreadable,
    /// Server answered with non-image content
    NotAnImage,
    /// Depth target was already met when the worker tried to persist
    QuotaReached,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::LocalhostRedirect => "localhost redirect",
            Self::AlreadyExists => "already exists",
            Self::Duplicate => "duplicate",
            Self::Unreadable => "unreadable",
            Self::NotAnImage => "not an image",
            Self::QuotaReached => "quota reached",
        };
        f.write_str(text)
    }
}

/// Why a download failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DownloadFailure {
    /// Server answered with a status other than 200
    HttpStatus(u16),
    /// Transport error (DNS, connection reset, timeout, ...)
    Network(String),
    /// Body exceeded the configured size limit
    TooLarge(u64),
    /// Writing to the store failed
    Io(String),
}

impl fmt::Display for DownloadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpStatus(code) => write!(f, "HTTP status {code}"),
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::TooLarge(size) => write!(f, "body too large ({size} bytes)"),
            Self::Io(msg) => write!(f, "io error: {msg}"),
        }
    }
}

/// Tagged result of one download attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DownloadOutcome {
    Accepted {
        url: String,
        filename: String,
        byte_size: u64,
    },
    Skipped {
        url: String,
        reason: SkipReason,
    },
    Failed {
        url: String,
        failure: DownloadFailure,
    },
}

impl DownloadOutcome {
    #[must_use]
    pub fn skipped(url: impl Into<String>, reason: SkipReason) -> Self {
        Self::Skipped {
            url: url.into(),
            reason,
        }
    }

    #[must_use]
    pub fn failed(url: impl Into<String>, failure: DownloadFailure) -> Self {
        Self::Failed {
            url: url.into(),
            failure,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Accepted { url, .. } | Self::Skipped { url, .. } | Self::Failed { url, .. } => {
                url
            }
        }
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// An image that passed every check and was persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedImage {
    pub url: String,
    pub filename: String,
    pub byte_size: u64,
}

/// Why the dispatch loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Every candidate was processed
    CandidatesExhausted,
    /// Depth target reached
    QuotaReached,
    /// Overall crawl deadline elapsed
    Deadline,
    /// Crawl was dropped before it finished
    Cancelled,
}

/// Final report of one crawl invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    pub search_url: String,
    pub depth: usize,
    /// Accepted images, in acceptance order
    pub accepted: Vec<AcceptedImage>,
    /// Every resolved direct URL, in resolution order, whether or not it was accepted
    pub resolved: Vec<String>,
    /// Outcomes of every download that completed before the crawl ended
    pub outcomes: Vec<DownloadOutcome>,
    pub candidates_found: usize,
    pub resolution_failures: usize,
    pub terminated_by: TerminationReason,
    pub elapsed_ms: u64,
}

impl CrawlReport {
    /// Report for a crawl that found nothing to do
    #[must_use]
    pub fn empty(search_url: impl Into<String>, depth: usize) -> Self {
        Self {
            search_url: search_url.into(),
            depth,
            accepted: Vec::new(),
            resolved: Vec::new(),
            outcomes: Vec::new(),
            candidates_found: 0,
            resolution_failures: 0,
            terminated_by: TerminationReason::CandidatesExhausted,
            elapsed_ms: 0,
        }
    }

    #[must_use]
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    /// Number of outcomes skipped for the given reason
    #[must_use]
    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DownloadOutcome::Skipped { reason: r, .. } if *r == reason))
            .count()
    }
}
