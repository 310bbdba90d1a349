//! Error types surfaced to callers of a locate run
//!
//! Only fatal conditions live here. Per-candidate and per-download problems
//! are recovered inside the crawl and reported through `CrawlReport`.

use std::path::PathBuf;
use thiserror::Error;

use crate::crawl_engine::CrawlError;

/// Result type alias for locate operations
pub type LocateResult<T> = Result<T, LocateError>;

/// Problems with the source image, detected before any crawl starts
#[derive(Debug, Error)]
pub enum InputError {
    /// Path does not reference a regular file
    #[error("Source image not found or not a regular file: {0}")]
    NotFound(PathBuf),

    /// Image codec is not one the provider accepts for upload
    #[error("Unsupported source image format '{format}' (expected JPEG, PNG or GIF)")]
    UnsupportedFormat { format: String },

    /// File exists but cannot be read or decoded
    #[error("Source image could not be read: {0}")]
    Unreadable(String),
}

/// Fatal errors for a whole locate run
#[derive(Debug, Error)]
pub enum LocateError {
    /// Invalid or unreadable source image
    #[error(transparent)]
    Input(#[from] InputError),

    /// Browsing session could not be established or was lost
    #[error("Browser session failed: {0}")]
    Session(String),

    /// Upload to the search provider failed
    #[error("Image upload failed: {0}")]
    Upload(String),

    /// Invalid run configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Run was interrupted by the user
    #[error("Operation was cancelled")]
    Cancelled,

    /// Filesystem error on the save folder
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Crawl aborted with a non-recoverable error
    #[error(transparent)]
    Crawl(#[from] CrawlError),
}

impl LocateError {
    /// Whether the error came from the caller's input rather than the environment
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, LocateError::Input(_) | LocateError::Config(_))
    }
}
