//! Error types for the PDF chat system

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for PDF chat operations
pub type Result<T> = std::result::Result<T, Error>;

/// PDF chat errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Unsupported data type for the knowledge base
    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector store error
    #[error("Vector store error: {0}")]
    VectorDb(String),

    /// Ollama/LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// The document could not be added to the knowledge base
    #[error("Could not add '{filename}' to the knowledge base: {message}")]
    Ingestion { filename: String, message: String },

    /// The query could not be answered
    #[error("Could not answer the question: {0}")]
    Chat(String),

    /// Request was malformed
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an ingestion error
    pub fn ingestion(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ingestion {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a chat error
    pub fn chat(message: impl Into<String>) -> Self {
        Self::Chat(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector db error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this is one of the two failures a user can recover from
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Ingestion { .. } | Self::Chat(_))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            Error::FileParse { filename, message } => (
                StatusCode::BAD_REQUEST,
                "parse_error",
                format!("Failed to parse '{}': {}", filename, message),
            ),
            Error::UnsupportedDataType(kind) => (
                StatusCode::BAD_REQUEST,
                "unsupported_type",
                format!("Unsupported data type: {}", kind),
            ),
            Error::Embedding(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "embedding_error", msg.clone())
            }
            Error::VectorDb(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "vector_db_error", msg.clone())
            }
            Error::Llm(msg) => (StatusCode::SERVICE_UNAVAILABLE, "llm_error", msg.clone()),
            Error::Ingestion { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "ingestion_error", self.to_string())
            }
            Error::Chat(msg) => (StatusCode::BAD_GATEWAY, "chat_error", msg.clone()),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Toml(err) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", err.to_string()),
            Error::Http(err) => (
                StatusCode::BAD_GATEWAY,
                "http_error",
                err.to_string(),
            ),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(Error::ingestion("doc.pdf", "corrupted").is_recoverable());
        assert!(Error::chat("timeout").is_recoverable());
        assert!(!Error::internal("boom").is_recoverable());
    }

    #[test]
    fn test_ingestion_status() {
        let response = Error::ingestion("doc.pdf", "corrupted").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = Error::chat("LLM unavailable").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
