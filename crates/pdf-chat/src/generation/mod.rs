//! Answer generation: Ollama client and prompt templates

pub mod ollama;
pub mod prompt;

pub use ollama::{GenerateOptions, OllamaClient, TokenStream};
pub use prompt::PromptBuilder;
