//! docshelf HTTP server.
//!
//! Wires together the core library, the storage directories and the HTTP
//! routes into an Axum application serving HTML pages.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware as axum_mw;
use tower_cookies::CookieManagerLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;
pub mod templates;

use crate::session::session_middleware;
use crate::state::AppState;

/// Concurrent sign-in attempts allowed; each one costs a bcrypt verification.
const SIGN_IN_CONCURRENCY: usize = 8;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    let account_routes = routes::account::router()
        .layer(tower::limit::ConcurrencyLimitLayer::new(SIGN_IN_CONCURRENCY));

    Router::new()
        .merge(routes::health::router())
        .merge(account_routes)
        .merge(routes::users::router())
        .merge(routes::documents::router())
        .layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            session_middleware,
        ))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
