//! pdf-chat: chat with a PDF through a local Ollama model
//!
//! Upload a PDF, index it into a per-session vector store and ask questions
//! answered from its content. The crate provides the knowledge base (PDF
//! parsing, chunking, embedding, retrieval, generation), session state with
//! its ingestion and conversation adapters, and an axum server rendering the
//! chat page.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod knowledge_base;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use knowledge_base::{AddOutcome, KnowledgeBase};
pub use session::{Session, SessionManager};
pub use types::{ConversationEntry, DataType, Role, UploadedDocument};
