//! Shared configuration constants for simscrape
//!
//! This module contains default values and provider constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Default reverse-image-search endpoint
///
/// Used both as the upload target and as the base every similar-image
/// candidate link is rewritten against.
pub const SEARCH_URL: &str = "https://yandex.com/images/search";

/// Default number of distinct images to accept per run
pub const DEFAULT_DEPTH: usize = 4;

/// Total resolution attempts per candidate before it is dropped
pub const DEFAULT_MAX_RESOLVE_ATTEMPTS: u32 = 4;

/// Backpressure re-check interval in milliseconds
///
/// The dispatch loop is woken on every state change; this is the fallback
/// cadence so a missed wakeup can never stall the crawl.
pub const DEFAULT_BACKPRESSURE_POLL_MS: u64 = 100;

/// Default `page.goto()` timeout in seconds
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;

/// Default network-idle / selector wait timeout in seconds
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;

/// Default per-image HTTP timeout in seconds
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Default overall crawl deadline in seconds
pub const DEFAULT_CRAWL_TIMEOUT_SECS: u64 = 600;

/// Largest image body accepted by the download worker (50 MiB)
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 50 * 1024 * 1024;

/// Extensions a URL-derived filename must end with to be trusted as an image
///
/// Matched case-insensitively; the original case of the URL is kept.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".tiff", ".svg",
];

/// Name of the JSON run report written into the save folder
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Suffix appended to the source image path to build the default save folder
pub const SAVE_FOLDER_SUFFIX: &str = "_images";

/// Chrome user agent string for stealth mode and image downloads
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
///
/// Chrome releases new stable versions ~every 4 weeks.
/// Update quarterly to stay within reasonable version window.
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
