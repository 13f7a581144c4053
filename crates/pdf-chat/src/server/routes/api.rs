//! JSON API with the same semantics as the chat page

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::session;
use crate::types::{ChatRequest, ChatResponse, HistoryResponse, IngestSummary};

use super::{read_upload, resolve_session, run_detached};

/// GET /api/history - conversation so far
pub async fn get_history(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<HistoryResponse>) {
    let (session, jar) = resolve_session(&state, jar);
    (jar, Json(session.entries().into()))
}

/// DELETE /api/history - clear the conversation
pub async fn clear_history(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let (session, jar) = resolve_session(&state, jar);
    session::clear_history(&session).await;
    (jar, StatusCode::NO_CONTENT)
}

/// POST /api/ingest - add an uploaded PDF (multipart field `file`)
pub async fn ingest(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> (CookieJar, Result<Json<IngestSummary>>) {
    let (session, jar) = resolve_session(&state, jar);

    let result = async {
        let upload = read_upload(multipart).await?;
        let s = session.clone();
        let summary = run_detached(async move { session::ingest_document(&s, upload).await }).await?;
        Ok(Json(summary))
    }
    .await;

    (jar, result)
}

/// POST /api/chat - ask a question
pub async fn chat(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<ChatRequest>,
) -> (CookieJar, Result<Json<ChatResponse>>) {
    let (session, jar) = resolve_session(&state, jar);
    let start = Instant::now();

    let s = session.clone();
    let result = run_detached(async move { session::submit_query(&s, &request.query).await })
        .await
        .map(|answer| {
            Json(ChatResponse {
                answer,
                history: session.entries(),
                processing_time_ms: start.elapsed().as_millis() as u64,
            })
        });

    (jar, result)
}

/// GET /api/info - service description
pub async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let kb = &state.config().knowledge_base;
    Json(serde_json::json!({
        "name": "pdf-chat",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Chat with a PDF using a local Ollama model",
        "llm": {
            "provider": kb.llm.provider,
            "model": kb.llm.model,
            "base_url": kb.llm.base_url,
            "stream": kb.llm.stream,
        },
        "embedder": {
            "provider": kb.embedder.provider,
            "model": kb.embedder.model,
        },
        "vectordb": {
            "provider": kb.vectordb.provider,
        },
        "sessions": state.sessions().len(),
        "endpoints": {
            "GET /": "Chat page",
            "POST /upload": "Add a PDF from the page (multipart field 'file')",
            "POST /ask": "Ask from the page (form field 'prompt')",
            "POST /clear": "Clear the chat from the page",
            "GET /api/history": "Conversation so far",
            "DELETE /api/history": "Clear the conversation",
            "POST /api/ingest": "Add a PDF (multipart field 'file')",
            "POST /api/chat": "Ask a question ({\"query\": ...})",
        }
    }))
}
