//! Provider abstractions for embeddings, LLM and vector storage
//!
//! Trait-based seams so the knowledge base can run against Ollama and a local
//! index in production and against in-memory fakes in tests.

pub mod embedding;
pub mod llm;
pub mod vector_store;
pub mod ollama;
pub mod local;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use local::LocalVectorStore;
pub use ollama::{OllamaEmbedder, OllamaLlm};
pub use vector_store::{VectorSearchResult, VectorStoreProvider};
