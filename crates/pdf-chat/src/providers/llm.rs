//! LLM provider trait for generating answers

use async_trait::async_trait;
use futures::TryStreamExt;

use crate::error::Result;
use crate::generation::TokenStream;

/// Trait for LLM-based answer generation
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (llama3.2 etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate the full answer for a prompt
    ///
    /// Default implementation consumes `generate_stream` to completion.
    async fn generate(&self, prompt: &str) -> Result<String> {
        let stream = self.generate_stream(prompt).await?;
        stream.try_collect::<Vec<String>>().await.map(|parts| parts.concat())
    }

    /// Generate the answer as a stream of fragments
    async fn generate_stream(&self, prompt: &str) -> Result<TokenStream>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
