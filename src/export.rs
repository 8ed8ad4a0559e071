//! Exporting a derived image to a user-chosen file.
//!
//! The bytes are staged in a transient file, the user picks a destination,
//! and the staged file is removed afterwards whatever the outcome.

use std::fs;
use std::path::{Path, PathBuf};

use rfd::FileDialog;
use thiserror::Error;

use crate::net::{CatalogClient, NetError};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no edited image to export")]
    NothingToExport,
    #[error("export cancelled")]
    Cancelled,
    #[error(transparent)]
    Net(#[from] NetError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("export task failed: {0}")]
    Join(String),
}

/// Where an exported file ends up
pub trait SaveTarget {
    /// Pick a destination for `suggested_name`; None means the user backed out
    fn choose_destination(&self, suggested_name: &str) -> Option<PathBuf>;
}

/// Native save-as dialog
#[derive(Debug, Clone, Copy, Default)]
pub struct DialogSaveTarget;

impl SaveTarget for DialogSaveTarget {
    fn choose_destination(&self, suggested_name: &str) -> Option<PathBuf> {
        FileDialog::new()
            .set_title("Save Edited Image")
            .set_file_name(suggested_name)
            .save_file()
    }
}

/// Staged copy of downloaded bytes, deleted on drop
struct TransientFile {
    path: PathBuf,
}

impl TransientFile {
    fn create(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{name}.part"));
        let file = TransientFile { path };
        fs::write(&file.path, bytes)?;
        Ok(file)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(%err, path = %self.path.display(), "failed to remove transient export file");
            }
        }
    }
}

/// Suggested file name for an exported image
pub fn export_file_name(image_id: &str) -> String {
    format!("edited_image_{image_id}.jpg")
}

/// Stage `bytes`, hand them to `target`, and release the staged copy.
pub fn deliver(
    bytes: &[u8],
    suggested_name: &str,
    target: &dyn SaveTarget,
    staging_dir: &Path,
) -> Result<PathBuf, ExportError> {
    let staged = TransientFile::create(staging_dir, suggested_name, bytes)?;

    let destination = target
        .choose_destination(suggested_name)
        .ok_or(ExportError::Cancelled)?;
    fs::copy(staged.path(), &destination)?;

    tracing::info!(path = %destination.display(), len = bytes.len(), "image exported");
    Ok(destination)
}

#[derive(Debug, Clone)]
pub struct ExportService<T = DialogSaveTarget> {
    client: CatalogClient,
    target: T,
    staging_dir: PathBuf,
}

impl ExportService<DialogSaveTarget> {
    pub fn new(client: CatalogClient) -> Self {
        Self::with_target(
            client,
            DialogSaveTarget,
            std::env::temp_dir().join("picsum-editor"),
        )
    }
}

impl<T> ExportService<T>
where
    T: SaveTarget + Clone + Send + 'static,
{
    pub fn with_target(client: CatalogClient, target: T, staging_dir: PathBuf) -> Self {
        Self {
            client,
            target,
            staging_dir,
        }
    }

    /// Download `url` and save it under a user-chosen name
    pub async fn export(&self, url: &str, suggested_name: &str) -> Result<PathBuf, ExportError> {
        if url.is_empty() {
            return Err(ExportError::NothingToExport);
        }

        let bytes = self.client.fetch_bytes(url).await?;

        let target = self.target.clone();
        let name = suggested_name.to_string();
        let staging_dir = self.staging_dir.clone();
        tokio::task::spawn_blocking(move || deliver(&bytes, &name, &target, &staging_dir))
            .await
            .map_err(|e| ExportError::Join(e.to_string()))?
    }
}
