//! Single-owner handle over the persisted pharmacy dataset.
//!
//! The collector is the only writer and always replaces the whole document.
//! Writes go to a temporary sibling file that is fsynced and then renamed
//! over the target, so a concurrent reader sees either the previous complete
//! document or the new one, never a truncated file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use farmaturno_core::{AppConfig, Dataset};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize dataset: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("persisted dataset at {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatasetStore {
    path: PathBuf,
}

impl DatasetStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(config.dataset_path.clone())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted document bytes exactly as stored.
    ///
    /// Returns `Ok(None)` when nothing has been committed yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] for any read failure other than not-found.
    pub async fn read_raw(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    /// Read and parse the persisted dataset.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Io`] if the file exists but cannot be read.
    /// - [`StoreError::Corrupt`] if the file does not parse as a [`Dataset`].
    pub async fn load(&self) -> Result<Option<Dataset>, StoreError> {
        let Some(bytes) = self.read_raw().await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// Atomically replace the persisted dataset.
    ///
    /// On failure the previous document, if any, is left untouched and the
    /// temporary file is removed on a best-effort basis.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Serialize`] if the dataset cannot be encoded.
    /// - [`StoreError::Io`] if the temporary file cannot be written, synced,
    ///   or renamed into place.
    pub async fn replace(&self, dataset: &Dataset) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(dataset).map_err(StoreError::Serialize)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        let tmp_path = self.tmp_path();
        if let Err(err) = write_and_sync(&tmp_path, &body).await {
            discard_tmp(&tmp_path).await;
            return Err(err);
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            discard_tmp(&tmp_path).await;
            return Err(StoreError::io(&self.path, e));
        }

        tracing::debug!(
            path = %self.path.display(),
            bytes = body.len(),
            pharmacies = dataset.pharmacies.len(),
            "dataset replaced"
        );
        Ok(())
    }

    /// Temporary sibling in the same directory, so the final rename never
    /// crosses a filesystem boundary.
    fn tmp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map_or_else(|| "dataset".into(), |n| n.to_string_lossy().into_owned());
        let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(".{file_name}.{}.{seq}.tmp", std::process::id());
        self.path.with_file_name(tmp_name)
    }
}

async fn write_and_sync(path: &Path, body: &[u8]) -> Result<(), StoreError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    file.write_all(body)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    file.sync_all().await.map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

async fn discard_tmp(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove temporary dataset file");
        }
    }
}
