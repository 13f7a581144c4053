//! Vector retrieval over embedded chunks

mod search;

pub use search::{cosine_similarity, SearchResult, VectorStore, INDEX_FILE};
