//! Local vector store provider backed by a JSON-persisted index

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::retrieval::VectorStore;
use crate::types::{Chunk, Document};

use super::vector_store::{VectorSearchResult, VectorStoreProvider};

/// Local vector store wrapping the in-process `VectorStore`
pub struct LocalVectorStore {
    store: Arc<VectorStore>,
}

impl LocalVectorStore {
    /// Open (or create) the index in `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            store: Arc::new(VectorStore::open(dir)?),
        })
    }

    /// Directory holding the index
    pub fn dir(&self) -> &Path {
        self.store.dir()
    }
}

fn join_error(e: tokio::task::JoinError) -> Error {
    Error::internal(format!("Task join error: {}", e))
}

#[async_trait]
impl VectorStoreProvider for LocalVectorStore {
    async fn insert_document(&self, document: &Document, chunks: &[Chunk]) -> Result<()> {
        // Persisting the index is blocking file IO
        let store = self.store.clone();
        let document = document.clone();
        let chunks = chunks.to_vec();
        tokio::task::spawn_blocking(move || store.insert_document(&document, &chunks))
            .await
            .map_err(join_error)?
    }

    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<Document>> {
        Ok(self.store.find_by_hash(content_hash))
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let store = self.store.clone();
        let query = query_embedding.to_vec();

        tokio::task::spawn_blocking(move || {
            let results = store.search(&query, top_k)?;
            Ok(results
                .into_iter()
                .map(|r| VectorSearchResult {
                    chunk: r.chunk,
                    similarity: r.similarity,
                })
                .collect())
        })
        .await
        .map_err(join_error)?
    }

    async fn documents(&self) -> Result<Vec<Document>> {
        Ok(self.store.documents())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.store.len())
    }

    fn name(&self) -> &str {
        "local"
    }
}
