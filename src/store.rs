//! Destination directory for accepted images
//!
//! The store is append-only. Writes go through a temp file in the same
//! directory followed by a rename, so a reader never sees a half-written
//! image. The async write lock serialises "scan for duplicates, then write"
//! across download workers.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug)]
pub struct ImageStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl ImageStore {
    /// Open (creating if needed) the store directory
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Whether a file with this name is already stored
    #[must_use]
    pub fn contains(&self, filename: &str) -> bool {
        self.path_for(filename).exists()
    }

    /// Names of the regular files in the store, in directory listing order
    pub fn filenames(&self) -> std::io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file()
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Hold this while checking for duplicates and persisting
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Atomically write `bytes` as `filename`; returns the byte count
    ///
    /// Blocking. `abandon` is checked right before the rename; when it returns
    /// true the temp file is discarded and `Ok(None)` is returned. An existing
    /// file with the same name is replaced.
    pub fn persist(
        &self,
        filename: &str,
        bytes: &[u8],
        abandon: impl FnOnce() -> bool,
    ) -> std::io::Result<Option<u64>> {
        let target = self.path_for(filename);
        let mut temp_file = NamedTempFile::new_in(&self.root)?;
        temp_file.write_all(bytes)?;
        temp_file.as_file().sync_all()?;
        if abandon() {
            return Ok(None);
        }
        temp_file.persist(&target).map_err(|e| e.error)?;
        Ok(Some(bytes.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_missing_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("a").join("b_images");
        let store = ImageStore::open(&root).expect("open store");
        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
    }

    #[test]
    fn persist_leaves_only_the_target_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ImageStore::open(dir.path()).expect("open store");

        assert!(!store.contains("cat.png"));
        let written = store
            .persist("cat.png", b"not really a png", || false)
            .expect("persist");
        assert_eq!(written, Some(16));
        assert!(store.contains("cat.png"));
        assert_eq!(store.filenames().expect("list"), vec!["cat.png".to_string()]);
    }

    #[test]
    fn abandoned_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ImageStore::open(dir.path()).expect("open store");

        let written = store.persist("late.png", b"bytes", || true).expect("persist");
        assert_eq!(written, None);
        assert!(!store.contains("late.png"));
        assert!(store.filenames().expect("list").is_empty());
    }

    #[test]
    fn filenames_skip_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("sub")).expect("mkdir");
        std::fs::write(dir.path().join("x.jpg"), b"x").expect("write");
        let store = ImageStore::open(dir.path()).expect("open store");
        assert_eq!(store.filenames().expect("list"), vec!["x.jpg".to_string()]);
    }
}
