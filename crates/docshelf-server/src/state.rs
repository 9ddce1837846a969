//! Shared application state for the docshelf server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. It holds the credential store, the document
//! repository and the in-memory session table.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use docshelf_core::credentials::CredentialStore;
use docshelf_core::documents::DocumentRepository;
use docshelf_core::password::PasswordHasher;
use docshelf_storage::FsBackend;

use crate::config::ServerConfig;
use crate::session::{SessionLimits, SessionStore};

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// User accounts.
    pub credentials: Arc<CredentialStore>,
    /// The document directory.
    pub documents: Arc<DocumentRepository>,
    /// Live browser sessions.
    pub sessions: SessionStore,
    /// Whether session cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("secure_cookies", &self.secure_cookies)
            .finish_non_exhaustive()
    }
}

impl AppState {
    #[must_use]
    pub fn new(
        credentials: Arc<CredentialStore>,
        documents: Arc<DocumentRepository>,
        secure_cookies: bool,
    ) -> Self {
        Self {
            credentials,
            documents,
            sessions: SessionStore::new(),
            secure_cookies,
        }
    }

    /// Replace the session table, e.g. to use different limits.
    #[must_use]
    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = sessions;
        self
    }

    /// Open the data and document directories named by `config`.
    ///
    /// The credential file is seeded here so a fresh install can sign in
    /// immediately.
    ///
    /// # Errors
    ///
    /// Fails if either directory cannot be created, the bcrypt cost is out
    /// of range, or the seed file cannot be written.
    pub async fn open(config: &ServerConfig) -> anyhow::Result<Self> {
        let hasher = match config.bcrypt_cost {
            Some(cost) => PasswordHasher::new(cost).context("invalid DOCSHELF_BCRYPT_COST")?,
            None => PasswordHasher::default(),
        };

        let data = FsBackend::open(&config.data_dir).with_context(|| {
            format!("failed to open data directory {}", config.data_dir.display())
        })?;
        let documents = FsBackend::open(&config.documents_dir).with_context(|| {
            format!(
                "failed to open documents directory {}",
                config.documents_dir.display()
            )
        })?;

        let credentials = CredentialStore::new(Arc::new(data))
            .with_key(config.credentials_file.clone())
            .with_hasher(hasher);
        if credentials
            .ensure_initialized()
            .await
            .context("failed to initialize credential store")?
        {
            info!(file = %credentials.key(), "seeded credential store");
        }

        info!(
            data_dir = %config.data_dir.display(),
            documents_dir = %config.documents_dir.display(),
            credentials_file = %credentials.key(),
            "storage opened"
        );

        let sessions = SessionStore::with_limits(SessionLimits {
            idle_ttl: config.session_ttl,
            ..SessionLimits::default()
        });

        Ok(Self::new(
            Arc::new(credentials),
            Arc::new(DocumentRepository::new(Arc::new(documents))),
            config.secure_cookies,
        )
        .with_sessions(sessions))
    }
}
