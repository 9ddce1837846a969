//! Directory storage backend, the production default.
//!
//! Every key is one regular file directly inside the root directory. All
//! filesystem calls are dispatched to a blocking thread via
//! [`tokio::task::spawn_blocking`].
//!
//! Writes go to a hidden temporary file in the same directory which is then
//! renamed over the target, so a crash mid-write never leaves a truncated
//! file behind.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::{StorageBackend, StorageError, validate_key};

/// Prefix of in-flight temporary files. Hidden from [`FsBackend::list`].
const TEMP_PREFIX: &str = ".docshelf-";

/// A storage backend backed by a single flat directory.
///
/// Cheap to clone and safe to share across async tasks.
///
/// # Examples
///
/// ```no_run
/// # use docshelf_storage::FsBackend;
/// let backend = FsBackend::open("./user_files").unwrap();
/// ```
#[derive(Clone)]
pub struct FsBackend {
    root: Arc<PathBuf>,
}

impl std::fmt::Debug for FsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsBackend")
            .field("root", &self.root)
            .finish()
    }
}

impl FsBackend {
    /// Open a directory backend rooted at `path`.
    ///
    /// Creates the directory (and parents) if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the directory cannot be created or
    /// the path exists but is not a directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(|e| StorageError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        if !path.is_dir() {
            return Err(StorageError::Open {
                path: path.display().to_string(),
                reason: "not a directory".to_owned(),
            });
        }

        Ok(Self {
            root: Arc::new(path.to_path_buf()),
        })
    }

    /// Return the root directory of this backend.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

fn panicked(err: &JoinError) -> String {
    format!("blocking task panicked: {err}")
}

fn write_atomically(root: &Path, target: &Path, value: &[u8]) -> std::io::Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(root)?;
    tmp.write_all(value)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait::async_trait]
impl StorageBackend for FsBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key)?;
        let key = key.to_owned();
        tokio::task::spawn_blocking(move || match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => std::fs::read(&path).map(Some).map_err(|e| {
                StorageError::Read {
                    key,
                    reason: e.to_string(),
                }
            }),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Read {
                key,
                reason: e.to_string(),
            }),
        })
        .await
        .map_err(|e| StorageError::Read {
            key: String::new(),
            reason: panicked(&e),
        })?
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let root = Arc::clone(&self.root);
        let key = key.to_owned();
        let value = value.to_vec();
        tokio::task::spawn_blocking(move || {
            write_atomically(&root, &path, &value).map_err(|e| StorageError::Write {
                key: key.clone(),
                reason: e.to_string(),
            })?;
            debug!(key = %key, bytes = value.len(), "stored");
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Write {
            key: String::new(),
            reason: panicked(&e),
        })?
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let key = key.to_owned();
        tokio::task::spawn_blocking(move || match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Delete {
                key,
                reason: e.to_string(),
            }),
        })
        .await
        .map_err(|e| StorageError::Delete {
            key: String::new(),
            reason: panicked(&e),
        })?
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let root = Arc::clone(&self.root);
        let prefix = prefix.to_owned();
        tokio::task::spawn_blocking(move || {
            let list_err = |e: std::io::Error| StorageError::List {
                prefix: prefix.clone(),
                reason: e.to_string(),
            };

            let mut keys = Vec::new();
            for entry in std::fs::read_dir(root.as_path()).map_err(list_err)? {
                let entry = entry.map_err(list_err)?;
                let Ok(name) = entry.file_name().into_string() else {
                    warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
                    continue;
                };
                if name.starts_with('.') || !name.starts_with(&prefix) {
                    continue;
                }
                // Follows symlinks; directories and dangling links are skipped.
                match std::fs::metadata(entry.path()) {
                    Ok(meta) if meta.is_file() => keys.push(name),
                    Ok(_) => {}
                    Err(e) => debug!(name = %name, error = %e, "skipping unreadable entry"),
                }
            }
            keys.sort();
            Ok(keys)
        })
        .await
        .map_err(|e| StorageError::List {
            prefix: String::new(),
            reason: panicked(&e),
        })?
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        let key = key.to_owned();
        tokio::task::spawn_blocking(move || match std::fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Read {
                key,
                reason: e.to_string(),
            }),
        })
        .await
        .map_err(|e| StorageError::Read {
            key: String::new(),
            reason: panicked(&e),
        })?
    }
}
