//! In-process vector store for chunk storage and search

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

/// File holding the persisted index inside the store directory
pub const INDEX_FILE: &str = "index.json";

/// Search result with chunk and similarity
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity (-1.0 to 1.0, higher is better)
    pub similarity: f32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Index {
    documents: Vec<Document>,
    chunks: Vec<Chunk>,
}

/// Flat cosine-similarity index persisted as JSON
pub struct VectorStore {
    dir: PathBuf,
    index: RwLock<Index>,
}

impl VectorStore {
    /// Open the store in `dir`, loading a previously saved index if present
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let index_path = dir.join(INDEX_FILE);
        let index = if index_path.exists() {
            let data = std::fs::read_to_string(&index_path)?;
            let index: Index = serde_json::from_str(&data)
                .map_err(|e| Error::vector_db(format!("Corrupt index {:?}: {}", index_path, e)))?;
            tracing::info!(
                "Loaded {} documents ({} chunks) from {:?}",
                index.documents.len(),
                index.chunks.len(),
                index_path
            );
            index
        } else {
            Index::default()
        };

        Ok(Self {
            dir,
            index: RwLock::new(index),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Add a document and its embedded chunks, then persist
    pub fn insert_document(&self, document: &Document, chunks: &[Chunk]) -> Result<()> {
        if let Some(chunk) = chunks.iter().find(|c| c.embedding.is_empty()) {
            return Err(Error::vector_db(format!("Chunk {} has no embedding", chunk.id)));
        }

        let mut index = self.index.write();

        if let Some(dims) = index.chunks.first().map(|c| c.embedding.len()) {
            if let Some(chunk) = chunks.iter().find(|c| c.embedding.len() != dims) {
                return Err(Error::vector_db(format!(
                    "Embedding dimension mismatch: index has {}, chunk {} has {}",
                    dims,
                    chunk.id,
                    chunk.embedding.len()
                )));
            }
        }

        let chunk_count = index.chunks.len();
        index.documents.push(document.clone());
        index.chunks.extend_from_slice(chunks);

        if let Err(e) = self.save(&index) {
            index.documents.pop();
            index.chunks.truncate(chunk_count);
            return Err(e);
        }

        Ok(())
    }

    /// Find a document by content hash
    pub fn find_by_hash(&self, content_hash: &str) -> Option<Document> {
        self.index
            .read()
            .documents
            .iter()
            .find(|d| d.content_hash == content_hash)
            .cloned()
    }

    /// Search for the `top_k` chunks most similar to the query embedding
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        if query_embedding.is_empty() {
            return Err(Error::vector_db("Query embedding is empty"));
        }

        let index = self.index.read();

        let mut results: Vec<SearchResult> = index
            .chunks
            .iter()
            .filter(|c| c.embedding.len() == query_embedding.len())
            .map(|chunk| SearchResult {
                similarity: cosine_similarity(query_embedding, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .collect();

        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(top_k);

        Ok(results)
    }

    /// All documents, oldest first
    pub fn documents(&self) -> Vec<Document> {
        self.index.read().documents.clone()
    }

    /// Get chunk count
    pub fn len(&self) -> usize {
        self.index.read().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the index to a sibling temp file and rename it over `index.json`
    fn save(&self, index: &Index) -> Result<()> {
        let path = self.dir.join(INDEX_FILE);
        let mut file = tempfile::Builder::new()
            .prefix(".index-")
            .suffix(".json")
            .tempfile_in(&self.dir)?;
        serde_json::to_writer(&mut file, index)?;
        file.as_file().sync_all()?;
        file.persist(&path)
            .map_err(|e| Error::vector_db(format!("Failed to write {:?}: {}", path, e.error)))?;
        tracing::debug!("Saved {} chunks to {:?}", index.chunks.len(), path);
        Ok(())
    }
}

/// Cosine similarity of two equal-length vectors; 0.0 if either is zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkSource, DataType};

    fn chunk(doc: &Document, content: &str, embedding: Vec<f32>) -> Chunk {
        let mut chunk = Chunk::new(
            doc.id,
            content.to_string(),
            ChunkSource {
                filename: doc.filename.clone(),
                page_number: Some(1),
                page_count: Some(1),
            },
            0,
            content.len(),
            0,
        );
        chunk.embedding = embedding;
        chunk
    }

    fn doc(hash: &str) -> Document {
        Document::new("a.pdf".to_string(), DataType::PdfFile, hash.to_string(), 100)
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path()).unwrap();
        let d = doc("h1");
        let chunks = vec![
            chunk(&d, "north", vec![0.0, 1.0]),
            chunk(&d, "east", vec![1.0, 0.0]),
            chunk(&d, "north-east", vec![0.7, 0.7]),
        ];
        store.insert_document(&d, &chunks).unwrap();

        let results = store.search(&[1.0, 0.1], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "east");
        assert_eq!(results[1].chunk.content, "north-east");
    }

    #[test]
    fn test_index_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let d = doc("persisted");
        {
            let store = VectorStore::open(dir.path()).unwrap();
            store
                .insert_document(&d, &[chunk(&d, "text", vec![1.0, 2.0])])
                .unwrap();
        }

        let reopened = VectorStore::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.find_by_hash("persisted").map(|d| d.id), Some(d.id));
        assert!(reopened.find_by_hash("other").is_none());
    }

    #[test]
    fn test_rejects_missing_or_mismatched_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path()).unwrap();
        let d = doc("h");

        assert!(store.insert_document(&d, &[chunk(&d, "x", vec![])]).is_err());

        store.insert_document(&d, &[chunk(&d, "x", vec![1.0, 0.0])]).unwrap();
        let other = doc("h2");
        assert!(store
            .insert_document(&other, &[chunk(&other, "y", vec![1.0, 0.0, 0.0])])
            .is_err());
        assert_eq!(store.documents().len(), 1);
    }

    #[test]
    fn test_failed_save_leaves_index_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path()).unwrap();
        let kept = doc("kept");
        store.insert_document(&kept, &[chunk(&kept, "kept", vec![1.0, 0.0])]).unwrap();

        // A directory in place of the index file makes the rename fail
        std::fs::remove_file(dir.path().join(INDEX_FILE)).unwrap();
        std::fs::create_dir(dir.path().join(INDEX_FILE)).unwrap();

        let lost = doc("lost");
        let result = store.insert_document(&lost, &[chunk(&lost, "lost", vec![0.0, 1.0])]);
        assert!(result.is_err());
        assert!(store.find_by_hash("lost").is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.documents().len(), 1);
        assert_eq!(store.search(&[0.0, 1.0], 5).unwrap()[0].chunk.content, "kept");
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path()).unwrap();
        let d = doc("h");
        store.insert_document(&d, &[chunk(&d, "x", vec![1.0])]).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![INDEX_FILE.to_string()]);
    }
}
