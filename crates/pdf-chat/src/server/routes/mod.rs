//! Routes for the chat page and the JSON API

pub mod api;
pub mod ui;

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::session::Session;
use crate::types::UploadedDocument;

/// Routes of the HTML chat page
pub fn ui_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(ui::index))
        .route(
            "/upload",
            post(ui::upload).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/ask", post(ui::ask))
        .route("/clear", post(ui::clear))
}

/// JSON API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/history",
            get(api::get_history).delete(api::clear_history),
        )
        .route(
            "/ingest",
            post(api::ingest).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/chat", post(api::chat))
        .route("/info", get(api::info))
}

/// Resolve the caller's session from the cookie, starting a new one if needed
pub(crate) fn resolve_session(state: &AppState, jar: CookieJar) -> (Arc<Session>, CookieJar) {
    let cookie_name = state.config().session.cookie_name.clone();
    let id = jar
        .get(&cookie_name)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok());

    let (session, created) = state.sessions().get_or_create(id);
    if !created {
        return (session, jar);
    }

    let cookie = Cookie::build((cookie_name, session.id().to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (session, jar.add(cookie))
}

/// Run an action to completion even if the client goes away
pub(crate) async fn run_detached<F, T>(action: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let result = match tokio::spawn(action).await {
        Ok(result) => result,
        Err(e) => Err(Error::internal(format!("Task join error: {}", e))),
    };

    if let Err(e) = &result {
        if !e.is_recoverable() {
            tracing::error!("Session action failed: {}", e);
        }
    }

    result
}

/// Read the `file` field of an upload form
pub(crate) async fn read_upload(mut multipart: Multipart) -> Result<UploadedDocument> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::BadRequest("Choose a PDF file first".to_string()))?;
        let media_type = field.content_type().unwrap_or_default().to_string();

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::BadRequest(format!("Failed to read '{}': {}", filename, e)))?;

        tracing::info!("Received upload: {} ({} bytes, {})", filename, data.len(), media_type);

        return Ok(UploadedDocument::new(filename, media_type, data));
    }

    Err(Error::BadRequest("Choose a PDF file first".to_string()))
}
