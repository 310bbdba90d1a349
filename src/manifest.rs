//! JSON run report stored next to the downloaded images
//!
//! Written with the write-to-temp-then-rename pattern so a crash never
//! leaves a truncated manifest behind.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::LocateConfig;
use crate::crawl_engine::CrawlReport;
use crate::dedup::DedupMode;
use crate::utils::constants::MANIFEST_FILENAME;

/// Settings that shaped a run, kept for later inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSettings {
    pub depth: usize,
    pub dedup_mode: DedupMode,
    pub max_resolve_attempts: u32,
}

impl From<&LocateConfig> for ManifestSettings {
    fn from(config: &LocateConfig) -> Self {
        Self {
            depth: config.depth(),
            dedup_mode: config.dedup_mode(),
            max_resolve_attempts: config.max_resolve_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub source_image: PathBuf,
    pub save_folder: PathBuf,

    /// Run start time (serialized as Unix timestamp seconds)
    #[serde(with = "chrono::serde::ts_seconds")]
    pub started_at: DateTime<Utc>,

    /// Run end time (serialized as Unix timestamp seconds)
    #[serde(with = "chrono::serde::ts_seconds")]
    pub finished_at: DateTime<Utc>,

    pub settings: ManifestSettings,
    pub report: CrawlReport,
}

impl RunManifest {
    #[must_use]
    pub fn new(config: &LocateConfig, started_at: DateTime<Utc>, report: CrawlReport) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            source_image: config.source_image().to_path_buf(),
            save_folder: config.save_folder().to_path_buf(),
            started_at,
            finished_at: Utc::now(),
            settings: ManifestSettings::from(config),
            report,
        }
    }

    /// Save atomically to `{save_folder}/manifest.json`
    pub async fn save(&self) -> Result<PathBuf> {
        let manifest_path = self.save_folder.join(MANIFEST_FILENAME);

        fs::create_dir_all(&self.save_folder)
            .await
            .context("Failed to create manifest directory")?;

        let json = serde_json::to_string_pretty(self).context("Failed to serialize manifest")?;

        let temp_path = manifest_path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path)
            .await
            .context("Failed to create temp manifest file")?;
        file.write_all(json.as_bytes())
            .await
            .context("Failed to write manifest")?;
        file.sync_all()
            .await
            .context("Failed to sync manifest to disk")?;

        fs::rename(&temp_path, &manifest_path)
            .await
            .context("Failed to rename manifest file")?;

        Ok(manifest_path)
    }

    /// Load `{save_folder}/manifest.json`
    pub async fn load(save_folder: &Path) -> Result<Self> {
        let manifest_path = save_folder.join(MANIFEST_FILENAME);
        if !manifest_path.exists() {
            bail!("Manifest not found at {}", manifest_path.display());
        }

        let contents = fs::read_to_string(&manifest_path)
            .await
            .context("Failed to read manifest")?;
        serde_json::from_str(&contents).context("Failed to parse manifest JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl_engine::{AcceptedImage, TerminationReason};

    #[tokio::test]
    async fn save_then_load_keeps_the_report() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = LocateConfig::builder()
            .source_image(dir.path().join("query.png"))
            .save_folder(dir.path().join("out"))
            .depth(2)
            .build()
            .expect("valid config");

        let mut report = CrawlReport::empty("https://yandex.com/images/search?x=1", 2);
        report.accepted.push(AcceptedImage {
            url: "https://img.example/a.png".into(),
            filename: "a.png".into(),
            byte_size: 42,
        });
        report.terminated_by = TerminationReason::QuotaReached;

        let manifest = RunManifest::new(&config, Utc::now(), report);
        let path = manifest.save().await.expect("save");
        assert_eq!(path, dir.path().join("out").join(MANIFEST_FILENAME));
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = RunManifest::load(&dir.path().join("out")).await.expect("load");
        assert_eq!(loaded.run_id, manifest.run_id);
        assert_eq!(loaded.settings.depth, 2);
        assert_eq!(loaded.report.accepted_count(), 1);
        assert_eq!(loaded.report.terminated_by, TerminationReason::QuotaReached);
    }

    #[tokio::test]
    async fn missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(RunManifest::load(dir.path()).await.is_err());
    }
}
