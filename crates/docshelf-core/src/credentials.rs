//! JSON-backed user credential store.
//!
//! All users live in one JSON array under a single storage key
//! (`credentials.json` by default):
//!
//! ```json
//! [{ "username": "admin", "password": "$2b$12$...", "role": "admin" }]
//! ```
//!
//! The store is lazily seeded with two accounts the first time it is
//! touched. Nothing is cached: every read re-parses the file and every
//! mutation rewrites it wholesale. Mutations from this process are
//! serialized by a single-writer lock; writers in other processes still race.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use docshelf_storage::StorageBackend;

use crate::error::{CredentialError, PasswordError};
use crate::password::PasswordHasher;

/// Storage key used when none is configured.
pub const DEFAULT_CREDENTIALS_KEY: &str = "credentials.json";

/// Hashed once per store and verified against for unknown usernames, so
/// both kinds of sign-in failure cost one bcrypt verification.
const DECOY_PASSWORD: &str = "docshelf-decoy-password";

/// Accounts written when the credential file does not exist yet.
const SEED_ACCOUNTS: [(&str, &str, Role); 2] = [
    ("admin", "secret", Role::Admin),
    ("frederik", "fredspassword", Role::Regular),
];

/// What a user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May edit, create and delete documents.
    #[default]
    Regular,
    /// Additionally manages user accounts.
    Admin,
}

impl Role {
    /// Lowercase name as stored on disk.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored account.
///
/// Records written before roles existed have no `role` field and load as
/// [`Role::Regular`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique, case-sensitive login name.
    pub username: String,
    /// bcrypt hash of the password.
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Parameters for [`CredentialOp::Add`].
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Parameters for [`CredentialOp::Edit`].
#[derive(Clone)]
pub struct EditUser {
    /// The account to change.
    pub original_username: String,
    /// Replacement name; may equal `original_username`.
    pub new_username: String,
    /// Replacement password. `None` keeps the current hash.
    pub new_password: Option<String>,
}

/// A single read-modify-write operation on the store.
#[derive(Clone)]
pub enum CredentialOp {
    Add(NewUser),
    Edit(EditUser),
    Delete { username: String },
}

/// Exact-match lookup. The first match wins.
#[must_use]
pub fn find_by_username<'a>(records: &'a [UserRecord], username: &str) -> Option<&'a UserRecord> {
    records.iter().find(|r| r.username == username)
}

fn position_of(records: &[UserRecord], username: &str) -> Option<usize> {
    records.iter().position(|r| r.username == username)
}

fn validate_username(username: &str) -> Result<(), CredentialError> {
    let reason = if username.trim().is_empty() {
        "username must not be empty"
    } else if username.trim() != username {
        "username must not start or end with whitespace"
    } else if username.chars().any(char::is_control) {
        "username must not contain control characters"
    } else {
        return Ok(());
    };
    Err(CredentialError::InvalidUsername {
        reason: reason.to_owned(),
    })
}

/// File-backed user credential store.
pub struct CredentialStore {
    storage: Arc<dyn StorageBackend>,
    key: String,
    hasher: PasswordHasher,
    /// Hash of [`DECOY_PASSWORD`] at the configured cost.
    decoy_hash: OnceLock<String>,
    /// Serializes seeding and mutations within this process.
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("key", &self.key)
            .field("cost", &self.hasher.cost())
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Create a store over `storage` using [`DEFAULT_CREDENTIALS_KEY`] and
    /// the default bcrypt cost.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            key: DEFAULT_CREDENTIALS_KEY.to_owned(),
            hasher: PasswordHasher::default(),
            decoy_hash: OnceLock::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Use a different storage key for the credential file.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Use a different password hasher (e.g. a lower cost in tests).
    #[must_use]
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self.decoy_hash = OnceLock::new();
        self
    }

    /// The storage key holding the credential file.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write the seed accounts if the credential file does not exist.
    ///
    /// Idempotent; an existing file is never overwritten. Returns `true` if
    /// this call created the file.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Storage`] or [`CredentialError::Password`]
    /// if the seed file could not be written.
    pub async fn ensure_initialized(&self) -> Result<bool, CredentialError> {
        let _guard = self.write_lock.lock().await;
        self.seed_if_absent().await
    }

    /// Load every record, seeding the store first if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::StoreCorrupt`] if the file is not a JSON
    /// array of user records.
    pub async fn load_all(&self) -> Result<Vec<UserRecord>, CredentialError> {
        if !self.storage.exists(&self.key).await? {
            self.ensure_initialized().await?;
        }
        self.read_records().await
    }

    /// Load the store and look up one user.
    ///
    /// # Errors
    ///
    /// Same as [`load_all`](Self::load_all).
    pub async fn find(&self, username: &str) -> Result<Option<UserRecord>, CredentialError> {
        let records = self.load_all().await?;
        Ok(find_by_username(&records, username).cloned())
    }

    /// Check a username/password pair.
    ///
    /// Returns `Ok(None)` both when the user does not exist and when the
    /// password is wrong; callers cannot tell the two apart. An unknown
    /// username is still checked against a decoy hash of the same cost, so
    /// the two failures also take the same time.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store itself cannot be read.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, CredentialError> {
        let records = self.load_all().await?;
        let record = find_by_username(&records, username).cloned();
        let hash = match &record {
            Some(r) => r.password_hash.clone(),
            None => self.decoy_hash().await,
        };

        let hasher = self.hasher;
        let candidate = password.to_owned();
        let verified = tokio::task::spawn_blocking(move || hasher.verify(&hash, &candidate))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "password verification task failed");
                false
            });

        match record {
            Some(record) if verified => {
                debug!(username = %record.username, "authentication succeeded");
                Ok(Some(record))
            }
            _ => {
                debug!("authentication failed");
                Ok(None)
            }
        }
    }

    /// Apply one operation and persist the full updated list.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::InvalidUsername`] for an empty or padded name
    /// - [`CredentialError::DuplicateUsername`] when adding or renaming onto an existing user
    /// - [`CredentialError::UserNotFound`] when editing a user that does not exist
    /// - [`CredentialError::LastAdmin`] when deleting the only administrator
    /// - [`CredentialError::StoreCorrupt`] / [`CredentialError::Storage`] on I/O problems
    ///
    /// Deleting a user that does not exist is a no-op.
    pub async fn mutate(&self, op: CredentialOp) -> Result<(), CredentialError> {
        let _guard = self.write_lock.lock().await;
        self.seed_if_absent().await?;
        let mut records = self.read_records().await?;

        match op {
            CredentialOp::Add(new) => {
                validate_username(&new.username)?;
                if find_by_username(&records, &new.username).is_some() {
                    return Err(CredentialError::DuplicateUsername {
                        username: new.username,
                    });
                }
                let password_hash = self.hash_password(new.password).await?;
                info!(username = %new.username, role = %new.role, "user added");
                records.push(UserRecord {
                    username: new.username,
                    password_hash,
                    role: new.role,
                });
            }
            CredentialOp::Edit(edit) => {
                validate_username(&edit.new_username)?;
                let Some(idx) = position_of(&records, &edit.original_username) else {
                    return Err(CredentialError::UserNotFound {
                        username: edit.original_username,
                    });
                };
                if edit.new_username != edit.original_username
                    && find_by_username(&records, &edit.new_username).is_some()
                {
                    return Err(CredentialError::DuplicateUsername {
                        username: edit.new_username,
                    });
                }
                if let Some(password) = edit.new_password {
                    records[idx].password_hash = self.hash_password(password).await?;
                }
                info!(
                    from = %edit.original_username,
                    to = %edit.new_username,
                    "user updated"
                );
                records[idx].username = edit.new_username;
            }
            CredentialOp::Delete { username } => {
                let Some(idx) = position_of(&records, &username) else {
                    debug!(username = %username, "delete of unknown user ignored");
                    return Ok(());
                };
                let admins = records.iter().filter(|r| r.role == Role::Admin).count();
                if records[idx].role == Role::Admin && admins == 1 {
                    return Err(CredentialError::LastAdmin { username });
                }
                records.remove(idx);
                info!(username = %username, "user deleted");
            }
        }

        self.persist(&records).await
    }

    /// Shorthand for [`CredentialOp::Add`].
    ///
    /// # Errors
    ///
    /// See [`mutate`](Self::mutate).
    pub async fn add(&self, username: &str, password: &str, role: Role) -> Result<(), CredentialError> {
        self.mutate(CredentialOp::Add(NewUser {
            username: username.to_owned(),
            password: password.to_owned(),
            role,
        }))
        .await
    }

    /// Shorthand for [`CredentialOp::Edit`].
    ///
    /// # Errors
    ///
    /// See [`mutate`](Self::mutate).
    pub async fn edit(&self, edit: EditUser) -> Result<(), CredentialError> {
        self.mutate(CredentialOp::Edit(edit)).await
    }

    /// Shorthand for [`CredentialOp::Delete`].
    ///
    /// # Errors
    ///
    /// See [`mutate`](Self::mutate).
    pub async fn delete(&self, username: &str) -> Result<(), CredentialError> {
        self.mutate(CredentialOp::Delete {
            username: username.to_owned(),
        })
        .await
    }

    /// Caller must hold `write_lock`.
    async fn seed_if_absent(&self) -> Result<bool, CredentialError> {
        if self.storage.exists(&self.key).await? {
            return Ok(false);
        }

        let mut records = Vec::with_capacity(SEED_ACCOUNTS.len());
        for (username, password, role) in SEED_ACCOUNTS {
            records.push(UserRecord {
                username: username.to_owned(),
                password_hash: self.hash_password(password.to_owned()).await?,
                role,
            });
        }
        self.persist(&records).await?;
        info!(key = %self.key, users = records.len(), "credential store seeded");
        Ok(true)
    }

    async fn read_records(&self) -> Result<Vec<UserRecord>, CredentialError> {
        let Some(bytes) = self.storage.get(&self.key).await? else {
            return Ok(Vec::new());
        };
        serde_json::from_slice(&bytes).map_err(|e| CredentialError::StoreCorrupt {
            key: self.key.clone(),
            reason: e.to_string(),
        })
    }

    async fn persist(&self, records: &[UserRecord]) -> Result<(), CredentialError> {
        let mut bytes =
            serde_json::to_vec_pretty(records).map_err(|e| CredentialError::StoreCorrupt {
                key: self.key.clone(),
                reason: format!("failed to serialize records: {e}"),
            })?;
        bytes.push(b'\n');
        self.storage.put(&self.key, &bytes).await?;
        Ok(())
    }

    async fn decoy_hash(&self) -> String {
        if let Some(hash) = self.decoy_hash.get() {
            return hash.clone();
        }
        match self.hash_password(DECOY_PASSWORD.to_owned()).await {
            Ok(hash) => self.decoy_hash.get_or_init(|| hash).clone(),
            Err(e) => {
                warn!(error = %e, "failed to build decoy password hash");
                String::new()
            }
        }
    }

    async fn hash_password(&self, plaintext: String) -> Result<String, CredentialError> {
        let hasher = self.hasher;
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| PasswordError::Hashing {
                reason: format!("blocking task panicked: {e}"),
            })??;
        Ok(hash)
    }
}
