//! User administration. Every route requires the admin role.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tracing::info;

use docshelf_core::authz::{Access, SessionUser};
use docshelf_core::credentials::{EditUser, Role};
use docshelf_core::error::CredentialError;

use crate::error::AppError;
use crate::session::{CurrentSession, redirect_with_flash};
use crate::state::AppState;
use crate::templates::{self, Chrome};

const USERS_PAGE: &str = "/users/view";

/// Build the user administration router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(USERS_PAGE, get(list_users))
        .route("/users/add", get(add_form).post(add_user))
        .route("/users/edit/{username}", get(edit_form).post(edit_user))
        .route("/users/delete/{username}", post(delete_user))
}

// ── Forms ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AddUserForm {
    #[serde(default)]
    pub new_username: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Deserialize)]
pub struct EditUserForm {
    #[serde(default)]
    pub new_username: String,
    /// Blank keeps the current password.
    #[serde(default)]
    pub new_password: String,
}

/// Failures the admin can correct by resubmitting the form.
fn correctable(err: &CredentialError) -> bool {
    matches!(
        err,
        CredentialError::DuplicateUsername { .. } | CredentialError::InvalidUsername { .. }
    )
}

fn unprocessable(html: String) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response()
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn list_users(
    State(state): State<Arc<AppState>>,
    mut session: CurrentSession,
) -> Result<Html<String>, AppError> {
    session.require(Access::Admin)?;
    let records = state.credentials.load_all().await?;
    let flash = session.take_flash().await;
    let current = session.user().map_or("", |u| u.username.as_str());
    Ok(Html(templates::users(
        &records,
        current,
        Chrome {
            user: session.user(),
            flash: flash.as_deref(),
        },
    )))
}

async fn add_form(mut session: CurrentSession) -> Result<Html<String>, AppError> {
    session.require(Access::Admin)?;
    let flash = session.take_flash().await;
    Ok(Html(templates::add_user(
        "",
        Role::Regular,
        None,
        Chrome {
            user: session.user(),
            flash: flash.as_deref(),
        },
    )))
}

async fn add_user(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Form(form): Form<AddUserForm>,
) -> Result<Response, AppError> {
    session.require(Access::Admin)?;
    let chrome = Chrome {
        user: session.user(),
        flash: None,
    };

    if form.new_password.is_empty() {
        return Ok(unprocessable(templates::add_user(
            &form.new_username,
            form.role,
            Some("Please enter a password."),
            chrome,
        )));
    }

    match state
        .credentials
        .add(&form.new_username, &form.new_password, form.role)
        .await
    {
        Ok(()) => Ok(redirect_with_flash(
            USERS_PAGE,
            format!("{} was created.", form.new_username),
        )),
        Err(err) if correctable(&err) => Ok(unprocessable(templates::add_user(
            &form.new_username,
            form.role,
            Some(&err.to_string()),
            chrome,
        ))),
        Err(err) => Err(err.into()),
    }
}

async fn edit_form(
    State(state): State<Arc<AppState>>,
    mut session: CurrentSession,
    Path(username): Path<String>,
) -> Result<Html<String>, AppError> {
    session.require(Access::Admin)?;
    if state.credentials.find(&username).await?.is_none() {
        return Err(AppError::NotFound(format!("{username} was not found.")));
    }
    let flash = session.take_flash().await;
    Ok(Html(templates::edit_user(
        &username,
        &username,
        None,
        Chrome {
            user: session.user(),
            flash: flash.as_deref(),
        },
    )))
}

/// Renaming the signed-in admin keeps them signed in under the new name;
/// anyone else who is renamed has to sign in again.
async fn edit_user(
    State(state): State<Arc<AppState>>,
    mut session: CurrentSession,
    Path(username): Path<String>,
    Form(form): Form<EditUserForm>,
) -> Result<Response, AppError> {
    session.require(Access::Admin)?;

    let new_username = form.new_username.trim().to_owned();
    let edit = EditUser {
        original_username: username.clone(),
        new_username: new_username.clone(),
        new_password: Some(form.new_password).filter(|p| !p.is_empty()),
    };

    if let Err(err) = state.credentials.edit(edit).await {
        if !correctable(&err) {
            return Err(err.into());
        }
        let html = templates::edit_user(
            &username,
            &form.new_username,
            Some(&err.to_string()),
            Chrome {
                user: session.user(),
                flash: None,
            },
        );
        return Ok(unprocessable(html));
    }

    let editing_self = session.user().is_some_and(|u| u.username == username);
    if editing_self {
        let role = session.user().map_or(Role::Admin, |u| u.role);
        session
            .sign_in(SessionUser {
                username: new_username.clone(),
                role,
            })
            .await;
    } else if new_username != username {
        state.sessions.revoke_user(&username).await;
    }

    info!(from = %username, to = %new_username, "user edited via web");
    Ok(redirect_with_flash(
        USERS_PAGE,
        format!("{new_username} was updated."),
    ))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    session.require(Access::Admin)?;

    if session.user().is_some_and(|u| u.username == username) {
        return Ok(redirect_with_flash(
            USERS_PAGE,
            "You cannot delete your own account.",
        ));
    }

    match state.credentials.delete(&username).await {
        Ok(()) => {
            let ended = state.sessions.revoke_user(&username).await;
            info!(username = %username, sessions_ended = ended, "user deleted via web");
            Ok(redirect_with_flash(
                USERS_PAGE,
                format!("{username} was deleted."),
            ))
        }
        Err(err @ CredentialError::LastAdmin { .. }) => {
            Ok(redirect_with_flash(USERS_PAGE, err.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}
