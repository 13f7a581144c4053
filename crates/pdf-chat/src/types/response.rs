//! Request and response types for the JSON API

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::conversation::ConversationEntry;
use crate::knowledge_base::AddOutcome;

/// Result of adding an uploaded document to the knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Document ID inside the knowledge base
    pub document_id: Uuid,
    /// Uploaded filename
    pub filename: String,
    /// Number of pages, when known
    pub total_pages: Option<u32>,
    /// Chunks embedded and stored for this upload
    pub chunks_created: u32,
    /// The same content was already in the knowledge base
    pub duplicate: bool,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl IngestSummary {
    pub fn from_outcome(filename: &str, outcome: &AddOutcome, processing_time_ms: u64) -> Self {
        Self {
            document_id: outcome.document.id,
            filename: filename.to_string(),
            total_pages: outcome.document.total_pages,
            chunks_created: outcome.chunks_created,
            duplicate: outcome.duplicate,
            processing_time_ms,
        }
    }

    /// User-facing confirmation line
    pub fn message(&self) -> String {
        if self.duplicate {
            format!("{} is already in the knowledge base.", self.filename)
        } else {
            format!("Added {} to knowledge base!", self.filename)
        }
    }
}

/// Chat request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

/// Chat response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The answer, `None` when the query was blank
    pub answer: Option<String>,
    /// Conversation after the query
    pub history: Vec<ConversationEntry>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Conversation history body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub entries: Vec<ConversationEntry>,
    pub count: usize,
}

impl From<Vec<ConversationEntry>> for HistoryResponse {
    fn from(entries: Vec<ConversationEntry>) -> Self {
        Self {
            count: entries.len(),
            entries,
        }
    }
}
