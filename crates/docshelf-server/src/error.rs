//! HTTP error types for the docshelf server.
//!
//! Maps domain errors from `docshelf-core` into responses. User-facing
//! failures become a redirect home with a flash message; anything else is
//! logged and answered with a bare 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use docshelf_core::error::{CredentialError, DocumentError, Unauthorized};

use crate::session::redirect_with_flash;

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// The session lacks the required role.
    Unauthorized,
    /// A named document or user does not exist. Carries the flash text.
    NotFound(String),
    /// The request was understood but refused. Carries the flash text.
    Rejected(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => redirect_with_flash("/", Unauthorized.to_string()),
            Self::NotFound(msg) | Self::Rejected(msg) => redirect_with_flash("/", msg),
            Self::Internal(msg) => {
                error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

impl From<Unauthorized> for AppError {
    fn from(_: Unauthorized) -> Self {
        Self::Unauthorized
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::NotFound { .. } => Self::NotFound(err.to_string()),
            DocumentError::AlreadyExists { .. } | DocumentError::InvalidName(_) => {
                Self::Rejected(err.to_string())
            }
            DocumentError::Storage(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::UserNotFound { ref username } => {
                Self::NotFound(format!("{username} was not found."))
            }
            CredentialError::DuplicateUsername { .. }
            | CredentialError::InvalidUsername { .. }
            | CredentialError::LastAdmin { .. } => Self::Rejected(err.to_string()),
            CredentialError::StoreCorrupt { .. }
            | CredentialError::Password(_)
            | CredentialError::Storage(_) => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Flash;

    fn flash_of(response: &Response) -> Option<&str> {
        response.extensions().get::<Flash>().map(|f| f.0.as_str())
    }

    #[test]
    fn unauthorized_redirects_home_with_message() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").map(|v| v.as_bytes()),
            Some(&b"/"[..])
        );
        assert_eq!(flash_of(&response), Some("Sorry, you are not authorized to do that."));
    }

    #[test]
    fn missing_document_flashes_its_name() {
        let err: AppError = DocumentError::NotFound {
            name: "nonexistentfile.txt".to_owned(),
        }
        .into();
        let response = err.into_response();
        assert_eq!(flash_of(&response), Some("nonexistentfile.txt was not found."));
    }

    #[test]
    fn corrupt_store_is_internal() {
        let err: AppError = CredentialError::StoreCorrupt {
            key: "credentials.json".to_owned(),
            reason: "expected value".to_owned(),
        }
        .into();
        assert!(matches!(err, AppError::Internal(_)));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(flash_of(&response).is_none());
    }

    #[test]
    fn missing_user_is_not_found() {
        let err: AppError = CredentialError::UserNotFound {
            username: "ghost".to_owned(),
        }
        .into();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "ghost was not found."));
    }
}
