//! Storage backend abstraction for docshelf.
//!
//! This crate defines the [`StorageBackend`] trait, a flat key-value
//! storage interface that knows nothing about users, documents, or
//! rendering. Both the credential store and the document repository in
//! `docshelf-core` sit on top of it.
//!
//! Two implementations are provided:
//!
//! - [`FsBackend`]: production default, one file per key inside a single directory
//! - [`MemoryBackend`]: in-memory, for testing only

mod error;
mod fs_backend;
mod memory;

pub use error::StorageError;
pub use fs_backend::FsBackend;
pub use memory::MemoryBackend;

/// A pluggable key-value storage backend.
///
/// Keys are flat names (`credentials.json`, `herstory.txt`). They never
/// contain path separators; see [`validate_key`]. Values are opaque bytes.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Retrieve a value by key.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails, or
    /// [`StorageError::InvalidKey`] if the key is not a flat name.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store a key-value pair, replacing any existing value wholesale.
    ///
    /// Readers observe either the previous value or the new one, never a
    /// truncated mix.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the underlying backend fails.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. This is idempotent: deleting a non-existent key is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Delete`] if the underlying backend fails.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// List all keys that start with the given prefix, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::List`] if the underlying backend fails.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Check whether a key exists in storage.
    ///
    /// The default implementation calls [`get`](StorageBackend::get) and checks
    /// for `Some`. Backends may override this with a more efficient check.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Check that `key` is a flat, visible name.
///
/// Rejects empty keys, `.`/`..`, keys starting with `.` (reserved for
/// in-flight temporary files), path separators and NUL bytes.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] describing the first problem found.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.starts_with('.') {
        "key must not start with '.'"
    } else if key.contains(['/', '\\']) {
        "key must not contain path separators"
    } else if key.contains('\0') {
        "key must not contain NUL bytes"
    } else {
        return Ok(());
    };

    Err(StorageError::InvalidKey {
        reason: format!("{reason}: {key:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_are_valid() {
        for key in ["credentials.json", "herstory.txt", "a", "file_1.md", "x y.txt"] {
            assert!(validate_key(key).is_ok(), "{key} should be valid");
        }
    }

    #[test]
    fn traversal_and_hidden_names_are_rejected() {
        for key in ["", ".", "..", "../etc/passwd", "dir/file.txt", "a\\b", ".tmp123", "nul\0"] {
            assert!(
                matches!(validate_key(key), Err(StorageError::InvalidKey { .. })),
                "{key:?} should be rejected"
            );
        }
    }
}
