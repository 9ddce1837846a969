//! Document routes: the file list, viewing, editing, creating and deleting.
//!
//! Viewing is public; every change requires a signed-in user.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use docshelf_core::authz::Access;
use docshelf_core::documents::classify_filename;
use docshelf_core::error::DocumentError;
use docshelf_core::render::Rendered;

use crate::error::AppError;
use crate::session::{CurrentSession, redirect_with_flash};
use crate::state::AppState;
use crate::templates::{self, Chrome};

/// Build the document router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route(
            "/create/new-document",
            get(new_document_form).post(create_document),
        )
        .route("/edit/{filename}", get(edit_form).post(save_document))
        .route("/delete/{filename}", post(delete_document))
        .route("/{filename}", get(view_document))
}

// ── Forms ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EditForm {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct NewDocumentForm {
    #[serde(default)]
    pub filename: String,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn index(
    State(state): State<Arc<AppState>>,
    mut session: CurrentSession,
) -> Result<Html<String>, AppError> {
    let files = state.documents.list().await?;
    let flash = session.take_flash().await;
    Ok(Html(templates::index(
        &files,
        Chrome {
            user: session.user(),
            flash: flash.as_deref(),
        },
    )))
}

/// Markdown is served as HTML, everything else as plain text.
async fn view_document(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let response = match state.documents.render(&filename).await? {
        Rendered::Html(html) => Html(html).into_response(),
        Rendered::Text(text) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            text,
        )
            .into_response(),
    };
    Ok(response)
}

async fn edit_form(
    State(state): State<Arc<AppState>>,
    mut session: CurrentSession,
    Path(filename): Path<String>,
) -> Result<Html<String>, AppError> {
    session.require(Access::SignedIn)?;
    let content = state.documents.read(&filename).await?;
    let flash = session.take_flash().await;
    Ok(Html(templates::edit_document(
        &filename,
        &String::from_utf8_lossy(&content),
        Chrome {
            user: session.user(),
            flash: flash.as_deref(),
        },
    )))
}

async fn save_document(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Path(filename): Path<String>,
    Form(form): Form<EditForm>,
) -> Result<Response, AppError> {
    session.require(Access::SignedIn)?;
    state
        .documents
        .write(&filename, form.content.as_bytes())
        .await?;
    Ok(redirect_with_flash("/", format!("{filename} was updated.")))
}

async fn new_document_form(mut session: CurrentSession) -> Result<Html<String>, AppError> {
    session.require(Access::SignedIn)?;
    let flash = session.take_flash().await;
    Ok(Html(templates::new_document(
        "",
        None,
        Chrome {
            user: session.user(),
            flash: flash.as_deref(),
        },
    )))
}

/// Invalid names re-render the form with a 422 and the entered text kept.
async fn create_document(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Form(form): Form<NewDocumentForm>,
) -> Result<Response, AppError> {
    session.require(Access::SignedIn)?;
    let filename = form.filename.trim();

    let rejection = match classify_filename(filename) {
        Err(reason) => reason.to_string(),
        Ok(()) => match state.documents.create(filename).await {
            Ok(()) => return Ok(redirect_with_flash("/", format!("{filename} was created."))),
            Err(err @ (DocumentError::AlreadyExists { .. } | DocumentError::InvalidName(_))) => {
                err.to_string()
            }
            Err(err) => return Err(err.into()),
        },
    };

    let html = templates::new_document(
        &form.filename,
        Some(&rejection),
        Chrome {
            user: session.user(),
            flash: None,
        },
    );
    Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response())
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    session.require(Access::SignedIn)?;
    state.documents.delete(&filename).await?;
    Ok(redirect_with_flash("/", format!("{filename} was deleted.")))
}
