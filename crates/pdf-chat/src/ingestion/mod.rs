//! Document ingestion pipeline: PDF parsing and chunking

mod chunker;
mod parser;
mod processor;

pub use chunker::TextChunker;
pub use parser::{cleanup_pdf_text, hash_content, PageContent, ParsedDocument, PdfParser};
pub use processor::IngestPipeline;
