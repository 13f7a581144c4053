//! Handlers for the HTML chat page
//!
//! Every action redirects back to `/` so the page always renders the current
//! session state.

use axum::{
    extract::{Multipart, State},
    response::{Html, Redirect},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::server::page::{render_page, PageView};
use crate::server::state::AppState;
use crate::session::{self, Notice};

use super::{read_upload, resolve_session, run_detached};

/// Question form
#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub prompt: String,
}

/// GET / - render the chat page
pub async fn index(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Html<String>) {
    let (session, jar) = resolve_session(&state, jar);

    let notice = session.take_notice();
    let entries = session.entries();
    let documents = match session.existing_knowledge_base() {
        Some(kb) => kb.documents().await.unwrap_or_else(|e| {
            tracing::warn!("Could not list documents: {}", e);
            Vec::new()
        }),
        None => Vec::new(),
    };

    let html = render_page(&PageView {
        model: &state.config().knowledge_base.llm.model,
        entries: &entries,
        notice: notice.as_ref(),
        documents: &documents,
    });

    (jar, Html(html))
}

/// POST /upload - add the chosen PDF to the knowledge base
pub async fn upload(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> (CookieJar, Redirect) {
    let (session, jar) = resolve_session(&state, jar);

    let notice = match read_upload(multipart).await {
        Ok(upload) => {
            let s = session.clone();
            match run_detached(async move { session::ingest_document(&s, upload).await }).await {
                Ok(summary) => Notice::Success(summary.message()),
                Err(e) => Notice::Error(e.to_string()),
            }
        }
        Err(e) => Notice::Error(e.to_string()),
    };

    session.set_notice(notice);
    (jar, Redirect::to("/"))
}

/// POST /ask - submit a question
pub async fn ask(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AskForm>,
) -> (CookieJar, Redirect) {
    let (session, jar) = resolve_session(&state, jar);

    let s = session.clone();
    let result = run_detached(async move { session::submit_query(&s, &form.prompt).await }).await;
    if let Err(e) = result {
        session.set_notice(Notice::Error(e.to_string()));
    }

    (jar, Redirect::to("/"))
}

/// POST /clear - clear the chat history
pub async fn clear(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let (session, jar) = resolve_session(&state, jar);
    session::clear_history(&session).await;
    (jar, Redirect::to("/"))
}
