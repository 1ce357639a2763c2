//! Upload manager.
//!
//! Incoming files are staged under `<root>/uploads/tmp` and relocated into a
//! per-category directory once the request is known to be good:
//!
//! ```text
//! <root>/uploads/users-image/<timestamp>-image.png
//! <root>/uploads/community-images/<timestamp>-logo.jpg
//! <root>/uploads/event-images/<timestamp>-event_image.webp
//! ```
//!
//! Rows store the path relative to `<root>`, always with `/` separators.
//! Staging and durable directories share a volume, so relocation is a rename.

pub mod intake;

use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use tempfile::TempPath;

pub use intake::{FormBody, FormFields, IntakeError, UploadForm, UploadRules};

pub const UPLOADS_DIR: &str = "uploads";
const STAGING_DIR: &str = "tmp";

/// Durable directory an image lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageCategory {
    User,
    Community,
    Event,
}

impl ImageCategory {
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::User => "users-image",
            Self::Community => "community-images",
            Self::Event => "event-images",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to stage upload: {0}")]
    Stage(#[source] io::Error),

    #[error("failed to relocate upload to {path}: {source}")]
    Relocate { path: PathBuf, source: io::Error },

    #[error("failed to remove {path}: {source}")]
    Remove { path: PathBuf, source: io::Error },

    #[error("refusing to touch '{0}' outside the upload tree")]
    OutsideUploads(String),
}

/// A file received with a request, held in the staging directory.
/// Dropping it deletes the temporary file.
#[derive(Debug)]
pub struct StagedFile {
    temp: TempPath,
    original_name: String,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.temp
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Original extension including the dot, or empty.
    fn extension(&self) -> String {
        Path::new(&self.original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct UploadManager {
    root: PathBuf,
}

impl UploadManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory served under the public `/uploads` prefix.
    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    fn staging_dir(&self) -> PathBuf {
        self.uploads_dir().join(STAGING_DIR)
    }

    fn category_dir(&self, category: ImageCategory) -> PathBuf {
        self.uploads_dir().join(category.dir_name())
    }

    /// `create_dir_all` is idempotent and tolerates concurrent creators.
    async fn ensure_dir(&self, dir: PathBuf) -> Result<PathBuf, StorageError> {
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        Ok(dir)
    }

    /// Opens a fresh staging file. The caller writes the body into the
    /// returned handle.
    pub async fn stage(
        &self,
        original_name: &str,
    ) -> Result<(StagedFile, tokio::fs::File), StorageError> {
        let dir = self.ensure_dir(self.staging_dir()).await?;
        let named = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(&dir)
            .map_err(StorageError::Stage)?;
        let (file, temp) = named.into_parts();

        let staged = StagedFile {
            temp,
            original_name: original_name.to_string(),
        };
        Ok((staged, tokio::fs::File::from_std(file)))
    }

    /// Moves `staged` into the category directory as
    /// `<timestamp>-<field><ext>` and returns its reference relative to the
    /// storage root. A taken name bumps the timestamp, so every upload gets a
    /// file of its own. On failure the staged file is deleted.
    pub async fn relocate(
        &self,
        staged: Option<StagedFile>,
        category: ImageCategory,
        field: &str,
    ) -> Result<Option<String>, StorageError> {
        let Some(staged) = staged else {
            return Ok(None);
        };

        let dir = self.ensure_dir(self.category_dir(category)).await?;
        let tail = format!("-{field}{}", staged.extension());
        let stamp = Utc::now().timestamp_millis();
        let temp = staged.temp;

        let dest = tokio::task::spawn_blocking({
            let dir = dir.clone();
            move || persist_unique(temp, &dir, stamp, &tail)
        })
        .await
        .map_err(|e| StorageError::Relocate {
            path: dir,
            source: io::Error::new(io::ErrorKind::Other, e),
        })??;

        let reference = self.reference_for(&dest)?;
        tracing::debug!(%reference, "Upload relocated");
        Ok(Some(reference))
    }

    fn reference_for(&self, dest: &Path) -> Result<String, StorageError> {
        let relative = dest
            .strip_prefix(&self.root)
            .map_err(|_| StorageError::OutsideUploads(dest.display().to_string()))?;

        Ok(relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"))
    }

    /// Maps a stored reference back to a path, refusing anything that is not
    /// a plain relative path inside `uploads/`.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, StorageError> {
        let path = Path::new(reference);
        let plain = path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

        if !plain || !path.starts_with(UPLOADS_DIR) {
            return Err(StorageError::OutsideUploads(reference.to_string()));
        }
        Ok(self.root.join(path))
    }

    pub async fn remove(&self, reference: &str) -> Result<(), StorageError> {
        let path = self.resolve(reference)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|source| StorageError::Remove { path, source })
    }

    /// Deletes a stored file, logging instead of failing.
    pub async fn remove_best_effort(&self, reference: &str) {
        match self.remove(reference).await {
            Ok(()) => tracing::debug!(reference, "Removed stored file"),
            Err(e) => tracing::warn!(reference, error = %e, "Failed to delete stored file"),
        }
    }

    /// Rolls back files relocated for a write that did not go through.
    pub async fn discard(&self, references: &[String]) {
        for reference in references {
            self.remove_best_effort(reference).await;
        }
    }
}

/// Renames `temp` to `<dir>/<stamp><tail>`, bumping `stamp` while the name
/// is taken. Blocking.
fn persist_unique(
    mut temp: TempPath,
    dir: &Path,
    mut stamp: i64,
    tail: &str,
) -> Result<PathBuf, StorageError> {
    loop {
        let dest = dir.join(format!("{stamp}{tail}"));
        match temp.persist_noclobber(&dest) {
            Ok(()) => return Ok(dest),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                temp = err.path;
                stamp += 1;
            }
            // `err.path` drops here and takes the staged file with it.
            Err(err) => {
                return Err(StorageError::Relocate {
                    path: dest,
                    source: err.error,
                })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tokio::io::AsyncWriteExt;

    pub async fn staged(manager: &UploadManager, name: &str, body: &[u8]) -> StagedFile {
        let (staged, mut file) = manager.stage(name).await.unwrap();
        file.write_all(body).await.unwrap();
        file.flush().await.unwrap();
        staged
    }
}
