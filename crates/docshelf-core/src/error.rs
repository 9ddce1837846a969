//! Error types for `docshelf-core`.
//!
//! Each error variant carries enough context to diagnose the problem without
//! a debugger. Password errors never include plaintext or hash material.

use docshelf_storage::StorageError;

/// Errors from password hashing.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// The configured bcrypt work factor is out of range.
    #[error("invalid bcrypt cost {cost}: must be between {min} and {max}")]
    InvalidCost { cost: u32, min: u32, max: u32 },

    /// bcrypt failed to produce a hash.
    #[error("password hashing failed: {reason}")]
    Hashing { reason: String },
}

/// Errors from the credential store.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The credential file is not a JSON array of well-formed user records.
    #[error("credential store '{key}' is corrupt: {reason}")]
    StoreCorrupt { key: String, reason: String },

    /// A user with this name already exists.
    #[error("user '{username}' already exists")]
    DuplicateUsername { username: String },

    /// No user with this name exists.
    #[error("user '{username}' does not exist")]
    UserNotFound { username: String },

    /// The username is empty or otherwise unusable.
    #[error("invalid username: {reason}")]
    InvalidUsername { reason: String },

    /// The operation would remove the only remaining administrator.
    #[error("cannot remove '{username}': it is the last administrator")]
    LastAdmin { username: String },

    /// Hashing a new password failed.
    #[error("credential password error: {0}")]
    Password(#[from] PasswordError),

    /// The underlying storage backend returned an error.
    #[error("credential storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Reasons a filename is rejected, in the order they are checked.
///
/// The `Display` text is the user-facing corrective message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FilenameError {
    /// Nothing was entered.
    #[error("Please enter a filename.")]
    Empty,

    /// The name does not end in `.md` or `.txt`.
    #[error("Filename must end in .md or .txt.")]
    BadExtension,

    /// The base name is empty or contains characters outside `[A-Za-z0-9_-]`.
    #[error("Filename may only contain letters, numbers, underscores and hyphens.")]
    InvalidCharacters,
}

/// Errors from the document repository.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The document does not exist.
    #[error("{name} was not found.")]
    NotFound { name: String },

    /// A document with this name already exists.
    #[error("{name} already exists.")]
    AlreadyExists { name: String },

    /// The proposed filename is invalid.
    #[error(transparent)]
    InvalidName(#[from] FilenameError),

    /// The underlying storage backend returned an error.
    #[error("document storage error: {0}")]
    Storage(#[from] StorageError),
}

/// The session lacks the role an operation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Sorry, you are not authorized to do that.")]
pub struct Unauthorized;
