//! Configuration for the PDF chat system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming the TOML configuration file
pub const CONFIG_PATH_ENV: &str = "PDF_CHAT_CONFIG";

/// Configuration file picked up from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "pdf-chat.toml";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Knowledge base configuration (passed once per session at handle creation)
    pub knowledge_base: KnowledgeBaseConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Session configuration
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from `$PDF_CHAT_CONFIG`, `./pdf-chat.toml` or defaults,
    /// then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .ok()
            .or_else(|| {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.exists().then_some(local)
            });

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        tracing::info!("Loading configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from a key lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PDF_CHAT_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("PDF_CHAT_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid PDF_CHAT_PORT '{}': {}", port, e)))?;
        }

        if let Some(base_url) = lookup("OLLAMA_BASE_URL") {
            self.knowledge_base.llm.base_url = base_url.clone();
            self.knowledge_base.embedder.base_url = base_url;
        }

        if let Some(model) = lookup("PDF_CHAT_MODEL") {
            self.knowledge_base.llm.model = model;
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS for the JSON API
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 200MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8501,
            enable_cors: true,
            max_upload_size: 200 * 1024 * 1024,
        }
    }
}

/// Knowledge base configuration: LLM, vector store and embedder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    pub llm: LlmConfig,
    pub vectordb: VectorDbConfig,
    pub embedder: EmbedderConfig,
}

/// LLM backends
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    Ollama,
}

/// Vector store backends
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorDbProviderKind {
    /// In-process index persisted as JSON inside `dir`
    #[default]
    Local,
}

/// Embedding backends
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderProviderKind {
    #[default]
    Ollama,
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend
    pub provider: LlmProviderKind,
    /// Generation model name
    pub model: String,
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Temperature for generation
    pub temperature: f32,
    /// Consume the answer as a token stream
    pub stream: bool,
    /// Ollama base URL
    pub base_url: String,
    /// Number of chunks retrieved as context for each question
    pub number_documents: usize,
    /// Number of previous conversation entries included in the prompt
    pub history_window: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::Ollama,
            model: "llama3.2:latest".to_string(),
            max_tokens: 250,
            temperature: 0.5,
            stream: true,
            base_url: "http://localhost:11434".to_string(),
            number_documents: 3,
            history_window: 6,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Vector store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Backend
    pub provider: VectorDbProviderKind,
    /// Parent of the per-session index directories; unset means the system temp dir
    pub dir: Option<PathBuf>,
}

/// Embedder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Backend
    pub provider: EmbedderProviderKind,
    /// Embedding model name
    pub model: String,
    /// Ollama base URL
    pub base_url: String,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            provider: EmbedderProviderKind::Ollama,
            model: "llama3.2:latest".to_string(),
            base_url: "http://localhost:11434".to_string(),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Minimum chunk size (skip smaller chunks)
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 0,
            min_chunk_size: 20,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie carrying the session id
    pub cookie_name: String,
    /// Idle time after which a session is discarded
    pub ttl_secs: u64,
    /// How often idle sessions are swept
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "pdf_chat_session".to_string(),
            ttl_secs: 60 * 60,
            sweep_interval_secs: 60,
        }
    }
}
