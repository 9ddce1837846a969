//! Sign-in and sign-out.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tracing::info;

use docshelf_core::authz::SessionUser;

use crate::error::AppError;
use crate::session::{CurrentSession, redirect_with_flash};
use crate::state::AppState;
use crate::templates::{self, Chrome};

/// Build the account router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/login", get(login_form).post(login))
        .route("/user/logout", post(logout))
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

async fn login_form(mut session: CurrentSession) -> Html<String> {
    let flash = session.take_flash().await;
    Html(templates::login(
        "",
        None,
        Chrome {
            user: session.user(),
            flash: flash.as_deref(),
        },
    ))
}

/// A failed attempt re-renders the form with a 422 and the username kept.
async fn login(
    State(state): State<Arc<AppState>>,
    mut session: CurrentSession,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let Some(record) = state
        .credentials
        .authenticate(&form.username, &form.password)
        .await?
    else {
        info!("sign-in rejected");
        let html = templates::login(
            &form.username,
            Some("Wrong username or password."),
            Chrome {
                user: session.user(),
                flash: None,
            },
        );
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response());
    };

    info!(username = %record.username, role = %record.role, "signed in");
    session.sign_in(SessionUser::from(&record)).await;
    Ok(redirect_with_flash(
        "/",
        format!("Welcome back, {}.", record.username),
    ))
}

async fn logout(mut session: CurrentSession) -> Response {
    if let Some(user) = session.user() {
        info!(username = %user.username, "signed out");
    }
    session.sign_out().await;
    redirect_with_flash("/", "You have been signed out.")
}
