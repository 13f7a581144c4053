//! Core types for the PDF chat system

pub mod conversation;
pub mod document;
pub mod response;

pub use conversation::{ConversationEntry, Role};
pub use document::{Chunk, ChunkSource, DataType, Document, UploadedDocument, PDF_MEDIA_TYPE};
pub use response::{ChatRequest, ChatResponse, HistoryResponse, IngestSummary};
