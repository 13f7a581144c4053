//! Ollama-based providers for embeddings and LLM
//!
//! Wraps `OllamaClient` to implement the provider traits.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{EmbedderConfig, LlmConfig};
use crate::error::Result;
use crate::generation::{GenerateOptions, OllamaClient, TokenStream};

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Ollama embedding provider
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder; request timeout and retries follow the LLM settings
    pub fn new(config: &EmbedderConfig, llm: &LlmConfig) -> Result<Self> {
        let client = OllamaClient::new(&config.base_url, llm.timeout_secs, llm.max_retries)?;
        Ok(Self::from_client(Arc::new(client), config.model.clone()))
    }

    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(&self.model, text).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Ollama LLM provider for answer generation
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
    options: GenerateOptions,
    stream: bool,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = OllamaClient::new(&config.base_url, config.timeout_secs, config.max_retries)?;
        Ok(Self::from_client(Arc::new(client), config))
    }

    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, config: &LlmConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            options: GenerateOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
            },
            stream: config.stream,
        }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Arc<OllamaClient> {
        &self.client
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if !self.stream {
            return self.client.generate(&self.model, prompt, self.options).await;
        }

        use futures::TryStreamExt;
        let stream = self.generate_stream(prompt).await?;
        let parts: Vec<String> = stream.try_collect().await?;
        Ok(parts.concat())
    }

    async fn generate_stream(&self, prompt: &str) -> Result<TokenStream> {
        self.client.generate_stream(&self.model, prompt, self.options).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_takes_options_from_config() {
        let config = LlmConfig {
            temperature: 0.2,
            max_tokens: 99,
            stream: false,
            ..LlmConfig::default()
        };
        let llm = OllamaLlm::new(&config).unwrap();

        assert_eq!(llm.model(), "llama3.2:latest");
        assert_eq!(llm.options.num_predict, 99);
        assert!((llm.options.temperature - 0.2).abs() < f32::EPSILON);
        assert!(!llm.stream);
        assert_eq!(llm.client().base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_embedder_uses_embedder_model() {
        let embedder = OllamaEmbedder::new(
            &EmbedderConfig {
                model: "nomic-embed-text".to_string(),
                ..EmbedderConfig::default()
            },
            &LlmConfig::default(),
        )
        .unwrap();
        assert_eq!(embedder.model(), "nomic-embed-text");
        assert_eq!(embedder.name(), "ollama");
    }
}
