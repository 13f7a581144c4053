//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use crate::error::Result;
use crate::types::{Chunk, Document};

/// Search result from vector store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    /// The matched chunk
    pub chunk: Chunk,
    /// Similarity score (higher is more similar)
    pub similarity: f32,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `LocalVectorStore`: JSON-persisted index in a local directory
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Insert a document together with its embedded chunks
    async fn insert_document(&self, document: &Document, chunks: &[Chunk]) -> Result<()>;

    /// Look up an already indexed document by content hash
    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<Document>>;

    /// Search for similar chunks
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>>;

    /// Documents in insertion order
    async fn documents(&self) -> Result<Vec<Document>>;

    /// Get total number of vectors stored
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Get provider name for logging
    fn name(&self) -> &str;
}
