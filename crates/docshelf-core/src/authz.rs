//! Session state and the authorization gate.
//!
//! A [`Session`] is the request-scoped view of one browser's state: who is
//! signed in (if anyone) and an optional one-shot flash message. The gate
//! functions are pure reads of that state.
//!
//! | State     | `is_logged_in` | `is_admin` |
//! |-----------|----------------|------------|
//! | anonymous | false          | false      |
//! | regular   | true           | false      |
//! | admin     | true           | true       |

use crate::credentials::{Role, UserRecord};
use crate::error::Unauthorized;

/// The signed-in identity carried by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub username: String,
    pub role: Role,
}

impl From<&UserRecord> for SessionUser {
    fn from(record: &UserRecord) -> Self {
        Self {
            username: record.username.clone(),
            role: record.role,
        }
    }
}

/// Per-browser session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<SessionUser>,
    flash: Option<String>,
}

impl Session {
    /// An anonymous session with no flash message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `user` as signed in, replacing any previous identity.
    pub fn sign_in(&mut self, user: SessionUser) {
        self.user = Some(user);
    }

    /// Forget the signed-in identity. The flash message is kept.
    pub fn sign_out(&mut self) {
        self.user = None;
    }

    /// The signed-in identity, if any.
    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    /// The signed-in username, if any.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }

    /// Set the message shown on the next rendered page.
    pub fn set_flash(&mut self, message: impl Into<String>) {
        self.flash = Some(message.into());
    }

    /// Peek at the pending flash message.
    #[must_use]
    pub fn flash(&self) -> Option<&str> {
        self.flash.as_deref()
    }

    /// Remove and return the pending flash message.
    pub fn take_flash(&mut self) -> Option<String> {
        self.flash.take()
    }
}

/// The access level an operation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Any signed-in user.
    SignedIn,
    /// Only users with [`Role::Admin`].
    Admin,
}

/// True iff the session carries a non-empty username.
#[must_use]
pub fn is_logged_in(session: &Session) -> bool {
    session.username().is_some_and(|name| !name.is_empty())
}

/// True iff the signed-in user has the admin role.
#[must_use]
pub fn is_admin(session: &Session) -> bool {
    is_logged_in(session) && session.user().is_some_and(|u| u.role == Role::Admin)
}

/// Check that `session` grants `access`.
///
/// # Errors
///
/// Returns [`Unauthorized`], whose message is meant for the user, when the
/// required role is absent. Callers redirect home and flash it.
pub fn require(session: &Session, access: Access) -> Result<(), Unauthorized> {
    let allowed = match access {
        Access::SignedIn => is_logged_in(session),
        Access::Admin => is_admin(session),
    };
    if allowed { Ok(()) } else { Err(Unauthorized) }
}
