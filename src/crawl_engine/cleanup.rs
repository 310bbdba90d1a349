//! Browser and resource cleanup
//!
//! Runs on every exit path of a locate run: success, error and cancellation.

use chromiumoxide::Browser;
use log::{debug, warn};
use std::path::PathBuf;
use tokio::task::JoinHandle;

/// Result of cleanup operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupResult {
    /// All cleanup operations succeeded
    Success,
    /// Some cleanup operations failed, with error details
    PartialFailure(Vec<String>),
}

impl CleanupResult {
    fn from_errors(errors: Vec<String>) -> Self {
        if errors.is_empty() {
            Self::Success
        } else {
            Self::PartialFailure(errors)
        }
    }
}

/// Close the browser, wait for the process, stop the CDP handler and remove the profile
///
/// The profile is removed only after the process has exited, so Chrome no
/// longer holds file handles inside it.
pub async fn cleanup_browser_and_data(
    mut browser: Browser,
    handler: JoinHandle<()>,
    chrome_data_dir: Option<PathBuf>,
) -> CleanupResult {
    let mut errors = Vec::new();

    debug!(target: "simscrape::cleanup", "Closing browser");
    if let Err(e) = browser.close().await {
        warn!(target: "simscrape::cleanup", "Failed to close browser: {e}");
        errors.push(format!("Browser close failed: {e}"));
    }

    debug!(target: "simscrape::cleanup", "Waiting for browser process to exit");
    if let Err(e) = browser.wait().await {
        warn!(target: "simscrape::cleanup", "Failed to wait for browser exit: {e}");
        errors.push(format!("Browser wait failed: {e}"));
    }

    handler.abort();

    if let Some(dir) = chrome_data_dir {
        debug!(target: "simscrape::cleanup", "Removing Chrome profile {}", dir.display());
        if let Err(e) = std::fs::remove_dir_all(&dir) {
            warn!(target: "simscrape::cleanup", "Failed to clean up Chrome profile: {e}");
            errors.push(format!("Directory cleanup failed: {e}"));
        }
    }

    CleanupResult::from_errors(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_errors_is_success() {
        assert_eq!(CleanupResult::from_errors(Vec::new()), CleanupResult::Success);
        assert_eq!(
            CleanupResult::from_errors(vec!["x".into()]),
            CleanupResult::PartialFailure(vec!["x".into()])
        );
    }
}
