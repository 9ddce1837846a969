//! Cookie sessions and flash messages.
//!
//! Sessions live in memory, keyed by a random UUID carried in the
//! `docshelf_session` cookie, and are lost on restart. A session row is only
//! created once there is something to remember (a sign-in or a flash
//! message), so anonymous page views allocate nothing. Anonymous rows are
//! dropped as soon as their flash has been shown.
//!
//! Every row expires: signed-in sessions after [`SessionLimits::idle_ttl`]
//! without a request, anonymous flash rows after
//! [`SessionLimits::flash_ttl`]. The number of anonymous rows is capped at
//! [`SessionLimits::max_anonymous`]; the oldest is evicted to make room.
//!
//! Handlers read the session through the [`CurrentSession`] extractor and
//! attach flash messages to redirects with [`redirect_with_flash`]; the
//! [`session_middleware`] persists those after the handler returns.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tokio::sync::{RwLock, watch};
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};
use tracing::{debug, info};
use uuid::Uuid;

use docshelf_core::authz::{self, Access, Session, SessionUser};

use crate::error::AppError;
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "docshelf_session";

/// Expiry and size bounds for the session table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// How long a signed-in session survives without a request.
    pub idle_ttl: Duration,
    /// How long an anonymous row holding only a flash message survives.
    pub flash_ttl: Duration,
    /// Most anonymous rows kept at once.
    pub max_anonymous: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(12 * 60 * 60),
            flash_ttl: Duration::from_secs(10 * 60),
            max_anonymous: 10_000,
        }
    }
}

struct Entry {
    session: Session,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// In-memory session table.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
    limits: SessionLimits,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limits(limits: SessionLimits) -> Self {
        Self {
            sessions: Arc::default(),
            limits,
        }
    }

    #[must_use]
    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    fn ttl_for(&self, session: &Session) -> Duration {
        if authz::is_logged_in(session) {
            self.limits.idle_ttl
        } else {
            self.limits.flash_ttl
        }
    }

    fn expiry_for(&self, session: &Session, now: Instant) -> Instant {
        now.checked_add(self.ttl_for(session)).unwrap_or(now)
    }

    /// Store `session` under a fresh random token and return the token.
    ///
    /// Expired rows are pruned first. If `session` is anonymous and the
    /// anonymous cap is reached, the anonymous row closest to expiry goes.
    pub async fn create(&self, session: Session) -> String {
        let token = Uuid::new_v4().to_string();
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, e| !e.is_expired(now));

        if !authz::is_logged_in(&session) {
            let mut anonymous: Vec<(Instant, String)> = sessions
                .iter()
                .filter(|(_, e)| !authz::is_logged_in(&e.session))
                .map(|(k, e)| (e.expires_at, k.clone()))
                .collect();
            let excess = (anonymous.len() + 1).saturating_sub(self.limits.max_anonymous);
            if excess > 0 {
                anonymous.sort_unstable();
                for (_, key) in anonymous.into_iter().take(excess) {
                    sessions.remove(&key);
                }
                debug!(evicted = excess, "anonymous session cap reached");
            }
        }

        let expires_at = self.expiry_for(&session, now);
        sessions.insert(token.clone(), Entry { session, expires_at });
        token
    }

    /// Look up a live session. Signed-in sessions have their idle timer reset.
    pub async fn get(&self, token: &str) -> Option<Session> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        if sessions.get(token)?.is_expired(now) {
            sessions.remove(token);
            return None;
        }
        let entry = sessions.get_mut(token)?;
        if authz::is_logged_in(&entry.session) {
            entry.expires_at = now.checked_add(self.limits.idle_ttl).unwrap_or(now);
        }
        Some(entry.session.clone())
    }

    /// Apply `f` to the live session behind `token`, if there is one.
    pub async fn update<R>(&self, token: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(token).filter(|e| !e.is_expired(now))?;
        Some(f(&mut entry.session))
    }

    pub async fn destroy(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    /// End every session signed in as `username`. Returns how many were removed.
    pub async fn revoke_user(&self, username: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, e| e.session.username() != Some(username));
        before.saturating_sub(sessions.len())
    }

    /// Drop every expired row. Returns how many were removed.
    pub async fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, e| !e.is_expired(now));
        before.saturating_sub(sessions.len())
    }

    /// Number of stored rows, including any not yet pruned.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Background worker that periodically prunes expired sessions.
pub async fn session_reaper(
    store: SessionStore,
    shutdown: &mut watch::Receiver<bool>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    info!(interval_secs = interval.as_secs(), "session reaper started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let pruned = store.prune_expired().await;
                if pruned > 0 {
                    debug!(pruned, "expired sessions pruned");
                }
            }
            _ = shutdown.changed() => {
                info!("session reaper shutting down");
                return;
            }
        }
    }
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(secure);
    cookie
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie
}

/// A one-shot message attached to a response, shown on the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash(pub String);

/// `303 See Other` to `to`, carrying a flash message.
pub fn redirect_with_flash(to: &str, message: impl Into<String>) -> Response {
    let mut response = Redirect::to(to).into_response();
    response.extensions_mut().insert(Flash(message.into()));
    response
}

/// The requesting browser's session.
#[derive(Clone)]
pub struct CurrentSession {
    store: SessionStore,
    cookies: Cookies,
    secure: bool,
    token: Option<String>,
    session: Session,
}

impl std::fmt::Debug for CurrentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentSession")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl CurrentSession {
    /// State as of the start of the request, plus changes made through this handle.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        self.session.user()
    }

    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] if the session lacks `access`.
    pub fn require(&self, access: Access) -> Result<(), AppError> {
        authz::require(&self.session, access).map_err(AppError::from)
    }

    /// Remove and return the pending flash message.
    ///
    /// An anonymous session has nothing left to remember afterwards, so its
    /// row and cookie are dropped.
    pub async fn take_flash(&mut self) -> Option<String> {
        let message = self.session.take_flash()?;
        if let Some(token) = self.token.clone() {
            let emptied = self
                .store
                .update(&token, |s| {
                    s.take_flash();
                    !authz::is_logged_in(s)
                })
                .await;
            if emptied == Some(true) {
                self.store.destroy(&token).await;
                self.cookies.remove(removal_cookie());
                self.token = None;
            }
        }
        Some(message)
    }

    /// Sign `user` in under a new session token.
    pub async fn sign_in(&mut self, user: SessionUser) {
        if let Some(old) = self.token.take() {
            self.store.destroy(&old).await;
        }
        debug!(username = %user.username, "session signed in");
        self.session.sign_in(user);
        let token = self.store.create(self.session.clone()).await;
        self.cookies.add(session_cookie(token.clone(), self.secure));
        self.token = Some(token);
    }

    /// Drop the session entirely.
    pub async fn sign_out(&mut self) {
        if let Some(token) = self.token.take() {
            self.store.destroy(&token).await;
        }
        self.cookies.remove(removal_cookie());
        self.session = Session::new();
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session middleware is not installed".to_owned()))
    }
}

/// Load the session for the request and persist any [`Flash`] on the response.
///
/// Must run inside `tower_cookies::CookieManagerLayer`.
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Response {
    let mut token = None;
    let mut session = Session::new();
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        let value = cookie.value().to_owned();
        if let Some(found) = state.sessions.get(&value).await {
            token = Some(value);
            session = found;
        }
    }

    req.extensions_mut().insert(CurrentSession {
        store: state.sessions.clone(),
        cookies: cookies.clone(),
        secure: state.secure_cookies,
        token,
        session,
    });

    let mut response = next.run(req).await;

    if let Some(Flash(message)) = response.extensions_mut().remove::<Flash>() {
        store_flash(&state, &cookies, message).await;
    }

    response
}

/// The handler may have rotated or removed the cookie, so it is re-read here.
async fn store_flash(state: &AppState, cookies: &Cookies, message: String) {
    if let Some(token) = cookies.get(SESSION_COOKIE).map(|c| c.value().to_owned()) {
        let stored = state
            .sessions
            .update(&token, |s| s.set_flash(message.clone()))
            .await;
        if stored.is_some() {
            return;
        }
    }

    let mut session = Session::new();
    session.set_flash(message);
    let token = state.sessions.create(session).await;
    cookies.add(session_cookie(token, state.secure_cookies));
}
