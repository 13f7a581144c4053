//! Text chunking with page and position tracking

use unicode_segmentation::UnicodeSegmentation;

use crate::types::{Chunk, ChunkSource, Document};
use super::parser::ParsedDocument;

/// Text chunker with configurable size and overlap
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
    /// Minimum chunk size
    min_size: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize, min_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap: overlap.min(chunk_size / 2),
            min_size,
        }
    }

    /// Chunk a parsed document page by page
    pub fn chunk_document(&self, doc: &Document, parsed: &ParsedDocument) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in &parsed.pages {
            let source = ChunkSource {
                filename: doc.filename.clone(),
                page_number: Some(page.page_number),
                page_count: parsed.total_pages,
            };

            let page_chunks = self.chunk_text(
                &page.content,
                doc,
                &source,
                page.char_offset,
                chunks.len() as u32,
            );
            chunks.extend(page_chunks);
        }

        chunks
    }

    /// Chunk one run of text
    fn chunk_text(
        &self,
        text: &str,
        doc: &Document,
        source: &ChunkSource,
        base_offset: usize,
        start_index: u32,
    ) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut current_chunk = String::new();
        let mut current_start = 0usize;
        let mut chunk_index = start_index;
        let mut char_pos = 0usize;

        for piece in self.split_into_pieces(text) {
            if !current_chunk.is_empty() && current_chunk.len() + piece.len() > self.chunk_size {
                if current_chunk.trim().len() >= self.min_size {
                    chunks.push(Chunk::new(
                        doc.id,
                        current_chunk.trim().to_string(),
                        source.clone(),
                        base_offset + current_start,
                        base_offset + char_pos,
                        chunk_index,
                    ));
                    chunk_index += 1;
                }

                current_chunk = self.get_overlap_text(&current_chunk);
                current_start = char_pos.saturating_sub(current_chunk.len());
            }

            current_chunk.push_str(piece);
            char_pos += piece.len();
        }

        if current_chunk.trim().len() >= self.min_size {
            chunks.push(Chunk::new(
                doc.id,
                current_chunk.trim().to_string(),
                source.clone(),
                base_offset + current_start,
                base_offset + char_pos,
                chunk_index,
            ));
        }

        chunks
    }

    /// Split text at sentence bounds; sentences longer than a chunk are split
    /// further at word bounds
    fn split_into_pieces<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut pieces = Vec::new();

        for sentence in text.split_sentence_bounds() {
            if sentence.len() <= self.chunk_size {
                pieces.push(sentence);
            } else {
                pieces.extend(sentence.split_word_bounds());
            }
        }

        pieces
    }

    /// Get overlap text from the end of a chunk
    fn get_overlap_text(&self, text: &str) -> String {
        if self.overlap == 0 {
            return String::new();
        }

        if text.len() <= self.overlap {
            return text.to_string();
        }

        let mut start = text.len() - self.overlap;
        while start > 0 && !text.is_char_boundary(start) {
            start -= 1;
        }

        let overlap_text = &text[start..];

        // Prefer starting at a sentence, then a word boundary
        if let Some(pos) = overlap_text.find(". ") {
            return overlap_text[pos + 2..].to_string();
        }

        if let Some(pos) = overlap_text.find(' ') {
            return overlap_text[pos + 1..].to_string();
        }

        overlap_text.to_string()
    }
}
