//! Configuration storage handle providing sandboxed, atomic file I/O.
//!
//! [`ConfigStorage`] owns the physical configuration directory, enforces path resolution
//! inside it, provisions bundled default files and persists documents with an atomic swap.

use crate::builder::StorageBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance;
use crate::security;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Outcome of [`ConfigStorage::bootstrap`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Bootstrap {
    /// The file was already present and left untouched.
    Existing,
    /// The bundled default registered for this name was copied.
    CopiedDefault,
    /// No bundled default exists; an empty file was created.
    CreatedEmpty,
}

/// The internal shared state of a [`ConfigStorage`] instance.
#[derive(Debug)]
pub struct StorageInner {
    /// The canonicalized physical directory holding every configuration file.
    pub(crate) root: PathBuf,
    /// Bundled default contents keyed by file name.
    pub(crate) defaults: BTreeMap<String, Cow<'static, str>>,
    /// A unique counter used to generate temporary file names.
    pub(crate) tmp_counter: AtomicU64,
}

/// A thread-safe handle to the configuration directory.
///
/// Every path is resolved relative to the root and validated so that it can never escape it.
/// Writes go through a unique temporary file, `fsync` and `rename`, so a crash mid-save leaves
/// either the old or the new document on disk.
///
/// This handle is internally reference-counted (`Arc`) and can be cheaply cloned.
///
/// # Example
///
/// ```rust
/// use bindery_storage::{Bootstrap, ConfigStorage, StorageError};
///
/// fn main() -> Result<(), StorageError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     # let root = tmp.path().join("config");
///     let storage = ConfigStorage::builder()
///         .root(&root)
///         .default_file("server.yml", "port: 8080\n")
///         .open()?;
///
///     assert_eq!(storage.bootstrap("server.yml")?, Bootstrap::CopiedDefault);
///     assert_eq!(storage.read_to_string("server.yml")?, "port: 8080\n");
///
///     storage.write("server.yml", b"port: 9090\n")?;
///     assert_eq!(storage.bootstrap("server.yml")?, Bootstrap::Existing);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ConfigStorage {
    pub(crate) inner: Arc<StorageInner>,
}

impl Deref for ConfigStorage {
    type Target = StorageInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl ConfigStorage {
    #[must_use = "The storage is not initialized until you call .open()"]
    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    /// The canonical configuration directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Bundled default contents registered for `name`.
    #[must_use]
    pub fn bundled_default(&self, name: &str) -> Option<&str> {
        self.defaults.get(name).map(AsRef::as_ref)
    }

    /// Resolves a relative path to a physical path inside the configuration directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathTraversalAttempt`] if the path tries to escape the sandbox.
    /// Returns [`StorageError::Io`] if the path or its parent cannot be verified on the filesystem.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        security::resolve_path(&self.root, path)
    }

    /// Makes sure `path` exists, copying its bundled default or creating an empty file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathTraversalAttempt`] if the path escapes the sandbox.
    /// Returns [`StorageError::Io`] if the file cannot be created.
    pub fn bootstrap(&self, path: impl AsRef<Path>) -> Result<Bootstrap, StorageError> {
        let path = path.as_ref();
        if self.exists(path)? {
            return Ok(Bootstrap::Existing);
        }

        let name = path.to_string_lossy();
        let (contents, outcome) = self
            .bundled_default(&name)
            .map_or(("", Bootstrap::CreatedEmpty), |text| (text, Bootstrap::CopiedDefault));

        self.write(path, contents.as_bytes())?;
        info!(file = %name, outcome = ?outcome, "Provisioned configuration file");
        Ok(outcome)
    }

    /// Reads a whole configuration file as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if the path does not exist.
    /// Returns [`StorageError::InvalidEncoding`] if the contents are not UTF-8.
    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Result<String, StorageError> {
        let resolved = self.resolve(path)?;

        let data = match fs::read(&resolved) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::FileNotFound {
                    message: resolved.display().to_string().into(),
                    context: None,
                });
            },
            Err(err) => {
                return Err(StorageError::Io {
                    source: err,
                    context: Some(format!("Read failed: {}", resolved.display()).into()),
                });
            },
        };

        String::from_utf8(data).map_err(|err| StorageError::InvalidEncoding {
            message: resolved.display().to_string().into(),
            context: Some(err.utf8_error().to_string().into()),
        })
    }

    /// Writes data to a file atomically.
    ///
    /// 1. Data is written to a unique temporary file (`.binderytmp.<id>`).
    /// 2. The file is synced to hardware (`fsync`).
    /// 3. The temporary file is renamed to the final destination.
    ///
    /// On platforms that do not support atomic replace for existing targets, the
    /// implementation falls back to remove-then-rename.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathTraversalAttempt`] if the path escapes the sandbox.
    /// Returns [`StorageError::Io`] if disk space is full or hardware failure occurs.
    pub fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        let resolved = self.resolve(path)?;

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create parent of {}", resolved.display()))?;
        }

        let temp = unique_tmp_path(&resolved, &self.tmp_counter);

        fill_temp(&temp, |file| file.write_all(data))?;

        if let Err(err) = fs::rename(&temp, &resolved) {
            if err.kind() == std::io::ErrorKind::AlreadyExists {
                fs::remove_file(&resolved)
                    .context(format!("Failed to replace existing file: {}", resolved.display()))?;
                fs::rename(&temp, &resolved).context(format!(
                    "Atomic swap failed: {} -> {}",
                    temp.display(),
                    resolved.display()
                ))?;
            } else {
                let _ = fs::remove_file(&temp);
                return Err(StorageError::Io {
                    source: err,
                    context: Some(
                        format!("Atomic swap failed: {} -> {}", temp.display(), resolved.display())
                            .into(),
                    ),
                });
            }
        }

        if let Some(parent) = resolved.parent() {
            Self::sync_dir(parent);
        }

        debug!(path = %resolved.display(), bytes = data.len(), "File saved atomically");
        Ok(())
    }

    /// Deletes a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if the file does not exist.
    /// Returns [`StorageError::Io`] on permission or hardware errors.
    pub fn delete(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let resolved = self.resolve(path)?;
        match fs::remove_file(&resolved) {
            Ok(()) => {},
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::FileNotFound {
                    message: resolved.display().to_string().into(),
                    context: None,
                });
            },
            Err(err) => {
                return Err(StorageError::Io {
                    source: err,
                    context: Some(format!("Failed to delete: {}", resolved.display()).into()),
                });
            },
        }
        debug!(path = %resolved.display(), "File deleted");
        Ok(())
    }

    /// Checks if a file exists inside the configuration directory.
    ///
    /// # Errors
    ///
    /// Returns an `Err` only if path resolution fails (e.g., due to a security violation).
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        let resolved = self.resolve(path)?;
        Ok(resolved.is_file())
    }

    pub fn purge_tmp(&self) {
        maintenance::purge_tmp(&self.root);
    }

    fn sync_dir(path: &Path) {
        match fs::File::open(path) {
            Ok(dir) => {
                if let Err(err) = dir.sync_all() {
                    tracing::warn!(path = %path.display(), error = %err, "Directory sync failed");
                }
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Directory open failed");
            },
        }
    }
}

/// Creates `temp`, fills it and syncs it to disk. A partially written file is removed.
fn fill_temp(
    temp: &Path,
    fill: impl FnOnce(&mut fs::File) -> std::io::Result<()>,
) -> Result<(), StorageError> {
    let mut file = fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(temp)
        .context(format!("Temp creation failed: {}", temp.display()))?;

    let written = fill(&mut file).context("Write failed").and_then(|()| {
        file.sync_all().context("Hardware sync failed")
    });
    if written.is_err() {
        drop(file);
        if let Err(err) = fs::remove_file(temp) {
            tracing::warn!(path = %temp.display(), error = %err, "Failed to remove temp file");
        }
    }
    written
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("config");
    let tmp_name = format!("{file_name}{}{counter}", maintenance::TMP_MARKER);
    target.with_file_name(tmp_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn failed_fill_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let temp = dir.path().join(format!("server.yml{}0", maintenance::TMP_MARKER));

        let result = fill_temp(&temp, |file| {
            file.write_all(b"port: 1")?;
            Err(std::io::Error::other("disk full"))
        });

        assert!(matches!(result, Err(StorageError::Io { .. })));
        assert!(!temp.exists());
    }

    #[test]
    fn successful_fill_keeps_temp_file() {
        let dir = TempDir::new().unwrap();
        let temp = dir.path().join("server.yml.part");

        fill_temp(&temp, |file| file.write_all(b"port: 1")).unwrap();
        assert_eq!(fs::read_to_string(&temp).unwrap(), "port: 1");
    }
}
