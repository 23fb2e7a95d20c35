//! Local object storage for product images.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    #[error("Invalid object name: {0}")]
    InvalidName(String),
    #[error("Storage I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object path relative to the storage root, e.g. `products/1718000000000_tap.png`.
    pub path: String,
    pub url: String,
}

/// Objects kept as files under `root`, served from `base_url`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_product_image(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, StorageError> {
        let name = final_component(file_name)?;
        let path = format!("products/{}_{}", Utc::now().timestamp_millis(), name);
        self.put(path, bytes).await
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_additional_image(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, StorageError> {
        let name = final_component(file_name)?;
        let path = format!("products/{}_additional_{}", Utc::now().timestamp_millis(), name);
        self.put(path, bytes).await
    }

    async fn put(&self, path: String, bytes: &[u8]) -> Result<StoredObject, StorageError> {
        let target = self.root.join(&path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        info!(path = %path, "Object stored");
        Ok(StoredObject {
            url: self.url_for(&path),
            path,
        })
    }

    /// Delete the object behind a URL or object path. A missing object counts as deleted.
    #[instrument(skip(self))]
    pub async fn delete_best_effort(&self, url_or_path: &str) -> Result<(), StorageError> {
        let path = self.object_path(url_or_path)?;

        match tokio::fs::remove_file(self.root.join(&path)).await {
            Ok(()) => {
                debug!(path = %path, "Object deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path, "Object already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, url_or_path: &str) -> Result<bool, StorageError> {
        let path = self.object_path(url_or_path)?;
        Ok(tokio::fs::try_exists(self.root.join(path)).await?)
    }

    fn object_path(&self, url_or_path: &str) -> Result<String, StorageError> {
        let relative = url_or_path
            .strip_prefix(&self.base_url)
            .unwrap_or(url_or_path)
            .trim_start_matches('/');

        let safe = !relative.is_empty()
            && Path::new(relative)
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidName(url_or_path.to_string()));
        }
        Ok(relative.to_string())
    }
}

fn final_component(file_name: &str) -> Result<&str, StorageError> {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .ok_or_else(|| StorageError::InvalidName(file_name.to_string()))
}
