//! Ingestion pipeline orchestration

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::{Chunk, DataType, Document};

use super::chunker::TextChunker;
use super::parser::{ParsedDocument, PdfParser};

/// Parse + chunk pipeline for one data type
pub struct IngestPipeline {
    chunker: TextChunker,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunker: TextChunker::new(config.chunk_size, config.chunk_overlap, config.min_chunk_size),
        }
    }

    /// Parse raw bytes of the given data type
    pub fn parse(&self, filename: &str, data_type: DataType, data: &[u8]) -> Result<ParsedDocument> {
        match data_type {
            DataType::PdfFile => PdfParser::parse(filename, data),
        }
    }

    /// Create chunks from a parsed document
    pub fn create_chunks(&self, doc: &Document, parsed: &ParsedDocument) -> Vec<Chunk> {
        self.chunker.chunk_document(doc, parsed)
    }

    /// Full ingestion: parse + chunk
    pub fn ingest(
        &self,
        filename: &str,
        data_type: DataType,
        data: &[u8],
    ) -> Result<(Document, ParsedDocument, Vec<Chunk>)> {
        let parsed = self.parse(filename, data_type, data)?;

        let mut doc = Document::new(
            filename.to_string(),
            data_type,
            parsed.content_hash.clone(),
            data.len() as u64,
        );
        doc.total_pages = parsed.total_pages;

        let chunks = self.create_chunks(&doc, &parsed);
        doc.total_chunks = chunks.len() as u32;

        Ok((doc, parsed, chunks))
    }
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new(&ChunkingConfig::default())
    }
}
