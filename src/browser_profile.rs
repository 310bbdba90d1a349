//! Chrome profile directory management
//!
//! Each browser session gets its own UUID-named profile directory so
//! concurrent runs never contend for the same `SingletonLock`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prefix of every profile directory this crate creates
pub const PROFILE_PREFIX: &str = "simscrape_chrome";

/// RAII wrapper for a Chrome profile directory
///
/// Automatically cleans up the profile directory on drop unless `into_path()` is called.
#[derive(Debug)]
pub struct BrowserProfile {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl BrowserProfile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            cleanup_on_drop: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the profile and return the path, disabling auto-cleanup
    ///
    /// Use this when the browser session takes over cleanup.
    pub fn into_path(mut self) -> PathBuf {
        self.cleanup_on_drop = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        if self.cleanup_on_drop && self.path.exists() {
            info!("BrowserProfile cleanup: removing {}", self.path.display());
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!("Failed to cleanup profile directory {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Create a unique profile directory under `parent` (the system temp dir by default)
pub fn create_unique_profile(parent: Option<&Path>) -> Result<BrowserProfile> {
    let parent = parent.map_or_else(std::env::temp_dir, Path::to_path_buf);
    std::fs::create_dir_all(&parent)
        .with_context(|| format!("Failed to create profile parent: {}", parent.display()))?;

    let path = parent.join(format!("{PROFILE_PREFIX}_{}", Uuid::new_v4()));
    debug!("Creating unique Chrome profile: {}", path.display());

    // create_dir (not create_dir_all) so a UUID collision fails loudly
    std::fs::create_dir(&path)
        .with_context(|| format!("Failed to create profile directory: {}", path.display()))?;

    Ok(BrowserProfile::new(path))
}
