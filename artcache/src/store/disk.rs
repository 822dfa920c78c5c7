//! Content-addressed artifact store on local disk.
//!
//! Every artifact is written as `{key}_temp.{ext}`, checked for non-zero
//! size, and renamed to `{key}.{ext}`. Readers only ever look at final names,
//! so a half-written file is never observable.

use super::path::{artifact_path, class_directory, is_temp_file_name, temp_path};
use super::types::{ArtifactClass, ArtifactLocation, ClassStats, StoreError};
use crate::error::ArtworkError;
use crate::key::CacheKey;
use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Artifact store rooted at a cache directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at `root`. Call [`ensure_directories`] before use.
    ///
    /// [`ensure_directories`]: ArtifactStore::ensure_directories
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a store and its class directories.
    pub fn open_at(root: impl Into<PathBuf>) -> io::Result<Self> {
        let store = Self::new(root);
        store.ensure_directories()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root and one directory per artifact class.
    pub fn ensure_directories(&self) -> io::Result<()> {
        for class in ArtifactClass::ALL {
            let dir = class_directory(&self.root, class);
            std::fs::create_dir_all(&dir)?;
            debug!(class = %class, dir = %dir.display(), "Artifact directory ready");
        }
        Ok(())
    }

    /// Final path for `key` with an explicit extension.
    pub fn path_for(&self, key: &CacheKey, class: ArtifactClass, ext: &str) -> PathBuf {
        artifact_path(&self.root, class, key, ext)
    }

    /// Temporary path for an in-progress write.
    pub fn temp_path_for(&self, key: &CacheKey, class: ArtifactClass, ext: &str) -> PathBuf {
        temp_path(&self.root, class, key, ext)
    }

    /// Finds the committed artifact for `key`, probing the class's
    /// extensions in priority order.
    pub async fn locate(&self, key: &CacheKey, class: ArtifactClass) -> Option<ArtifactLocation> {
        for ext in class.extensions() {
            if let Some(location) = self.locate_with_extension(key, class, ext).await {
                return Some(location);
            }
        }
        None
    }

    /// Finds the committed artifact for `key` with exactly this extension.
    pub async fn locate_with_extension(
        &self,
        key: &CacheKey,
        class: ArtifactClass,
        ext: &str,
    ) -> Option<ArtifactLocation> {
        if !class.allows_extension(ext) {
            return None;
        }
        let path = self.path_for(key, class, ext);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(ArtifactLocation {
                key: key.clone(),
                class,
                extension: ext.to_string(),
                path,
            }),
            _ => None,
        }
    }

    /// Returns true if a committed artifact exists for `key`.
    pub async fn exists(&self, key: &CacheKey, class: ArtifactClass) -> bool {
        self.locate(key, class).await.is_some()
    }

    /// Reads a committed artifact.
    pub async fn open(
        &self,
        key: &CacheKey,
        class: ArtifactClass,
    ) -> Result<(ArtifactLocation, Bytes), StoreError> {
        let location = self
            .locate(key, class)
            .await
            .ok_or_else(|| StoreError::NotFound {
                key: key.clone(),
                class,
            })?;
        self.read(location).await
    }

    /// Reads a committed artifact with an explicit extension.
    pub async fn open_with_extension(
        &self,
        key: &CacheKey,
        class: ArtifactClass,
        ext: &str,
    ) -> Result<(ArtifactLocation, Bytes), StoreError> {
        let location = self
            .locate_with_extension(key, class, ext)
            .await
            .ok_or_else(|| StoreError::NotFound {
                key: key.clone(),
                class,
            })?;
        self.read(location).await
    }

    async fn read(
        &self,
        location: ArtifactLocation,
    ) -> Result<(ArtifactLocation, Bytes), StoreError> {
        match tokio::fs::read(&location.path).await {
            Ok(data) => Ok((location, Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound {
                key: location.key,
                class: location.class,
            }),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Atomically stores `data` as the artifact for `key`.
    ///
    /// Writes the temp file, verifies it is non-empty, then renames it into
    /// place. On any failure the temp file is removed and
    /// [`ArtworkError::GenerationFailed`] is returned.
    pub async fn commit(
        &self,
        key: &CacheKey,
        class: ArtifactClass,
        ext: &str,
        data: &[u8],
    ) -> Result<ArtifactLocation, ArtworkError> {
        self.check_extension(class, ext)?;
        let temp = self.temp_path_for(key, class, ext);

        if let Err(e) = tokio::fs::write(&temp, data).await {
            self.discard(&temp).await;
            return Err(ArtworkError::GenerationFailed(format!(
                "failed to write {}: {}",
                temp.display(),
                e
            )));
        }

        self.promote(key, class, ext).await
    }

    /// Promotes an already written temp file to its final name.
    ///
    /// Used when an external process (the transcoder) writes the temp path
    /// directly. Same verification and cleanup rules as [`commit`].
    ///
    /// [`commit`]: ArtifactStore::commit
    pub async fn promote(
        &self,
        key: &CacheKey,
        class: ArtifactClass,
        ext: &str,
    ) -> Result<ArtifactLocation, ArtworkError> {
        self.check_extension(class, ext)?;
        let temp = self.temp_path_for(key, class, ext);
        let final_path = self.path_for(key, class, ext);

        let size = match tokio::fs::metadata(&temp).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                self.discard(&temp).await;
                return Err(ArtworkError::GenerationFailed(format!(
                    "temporary file {} was not created: {}",
                    temp.display(),
                    e
                )));
            }
        };

        if size == 0 {
            warn!(key = %key, class = %class, "Generated artifact is empty, discarding");
            self.discard(&temp).await;
            return Err(ArtworkError::GenerationFailed(format!(
                "temporary file {} is empty",
                temp.display()
            )));
        }

        if let Err(e) = tokio::fs::rename(&temp, &final_path).await {
            self.discard(&temp).await;
            return Err(ArtworkError::GenerationFailed(format!(
                "failed to rename {}: {}",
                temp.display(),
                e
            )));
        }

        info!(key = %key, class = %class, bytes = size, "Artifact committed");
        Ok(ArtifactLocation {
            key: key.clone(),
            class,
            extension: ext.to_string(),
            path: final_path,
        })
    }

    /// Removes the temp file for `key`, if any.
    pub async fn discard_temp(&self, key: &CacheKey, class: ArtifactClass, ext: &str) {
        let temp = self.temp_path_for(key, class, ext);
        self.discard(&temp).await;
    }

    async fn discard(&self, temp: &Path) {
        match tokio::fs::remove_file(temp).await {
            Ok(()) => debug!(path = %temp.display(), "Removed temporary file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %temp.display(), error = %e, "Failed to remove temporary file"),
        }
    }

    fn check_extension(&self, class: ArtifactClass, ext: &str) -> Result<(), ArtworkError> {
        if class.allows_extension(ext) {
            Ok(())
        } else {
            Err(ArtworkError::GenerationFailed(format!(
                "extension '{}' is not allowed for {}",
                ext, class
            )))
        }
    }

    /// Removes orphaned temp files left behind by a crash.
    ///
    /// Only safe while nothing is generating, i.e. at startup.
    pub fn sweep_temp(&self) -> io::Result<usize> {
        let mut removed = 0;
        for class in ArtifactClass::ALL {
            let dir = class_directory(&self.root, class);
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            for entry in entries {
                let entry = entry?;
                let name = entry.file_name();
                if is_temp_file_name(&name.to_string_lossy()) {
                    std::fs::remove_file(entry.path())?;
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            info!(removed, "Swept orphaned temporary files");
        }
        Ok(removed)
    }

    /// File counts and sizes per class, excluding temp files.
    pub fn stats(&self) -> io::Result<Vec<ClassStats>> {
        let mut stats = Vec::with_capacity(ArtifactClass::ALL.len());
        for class in ArtifactClass::ALL {
            let mut entry_stats = ClassStats {
                class,
                files: 0,
                bytes: 0,
            };
            let dir = class_directory(&self.root, class);
            if let Ok(entries) = std::fs::read_dir(&dir) {
                for entry in entries {
                    let entry = entry?;
                    let meta = entry.metadata()?;
                    if meta.is_file() && !is_temp_file_name(&entry.file_name().to_string_lossy())
                    {
                        entry_stats.files += 1;
                        entry_stats.bytes += meta.len();
                    }
                }
            }
            stats.push(entry_stats);
        }
        Ok(stats)
    }
}
