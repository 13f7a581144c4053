//! Document and chunk types with source tracking

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Media type declared for PDF uploads
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Leading bytes of every PDF file
const PDF_MAGIC: &[u8] = b"%PDF";

/// Data source kinds the knowledge base can ingest
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// A PDF file on local disk
    PdfFile,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PdfFile => "pdf_file",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf_file" => Ok(Self::PdfFile),
            other => Err(Error::UnsupportedDataType(other.to_string())),
        }
    }
}

/// A file as received from the upload control
///
/// Only lives between the upload event and the ingestion call.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Name the browser sent for the file
    pub filename: String,
    /// Declared media type
    pub media_type: String,
    /// Raw payload
    pub data: Bytes,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, media_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            media_type: media_type.into(),
            data,
        }
    }

    /// Shorthand for a PDF upload
    pub fn pdf(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::new(filename, PDF_MEDIA_TYPE, data.into())
    }

    /// Whether the declared type is PDF.
    ///
    /// Browsers sometimes send `application/octet-stream`; the `.pdf` extension
    /// counts as a declaration in that case.
    pub fn declares_pdf(&self) -> bool {
        let media_type = self.media_type.to_ascii_lowercase();
        media_type == PDF_MEDIA_TYPE
            || media_type == "pdf"
            || ((media_type == "application/octet-stream" || media_type.is_empty())
                && self.filename.to_ascii_lowercase().ends_with(".pdf"))
    }

    /// Whether the payload starts with the PDF magic bytes
    pub fn has_pdf_signature(&self) -> bool {
        self.data.starts_with(PDF_MAGIC)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A document that has been added to a knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Original filename as uploaded by the user
    pub filename: String,
    /// Data source kind
    pub data_type: DataType,
    /// Content hash for deduplication
    pub content_hash: String,
    /// Total number of pages
    pub total_pages: Option<u32>,
    /// Total number of chunks created
    pub total_chunks: u32,
    /// File size in bytes
    pub file_size: u64,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    pub fn new(filename: String, data_type: DataType, content_hash: String, file_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename,
            data_type,
            content_hash,
            total_pages: None,
            total_chunks: 0,
            file_size,
            ingested_at: chrono::Utc::now(),
        }
    }
}

/// Where a chunk came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkSource {
    /// Original filename
    pub filename: String,
    /// Page number (1-indexed)
    pub page_number: Option<u32>,
    /// Total pages in document
    pub page_count: Option<u32>,
}

impl ChunkSource {
    /// Format source for display in prompts
    pub fn format_reference(&self) -> String {
        match (self.page_number, self.page_count) {
            (Some(page), Some(count)) => format!("{}, page {} of {}", self.filename, page, count),
            (Some(page), None) => format!("{}, page {}", self.filename, page),
            _ => self.filename.clone(),
        }
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub content: String,
    /// Embedding vector
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Source information
    pub source: ChunkSource,
    /// Character position in the extracted text
    pub char_start: usize,
    pub char_end: usize,
    /// Chunk index within document
    pub chunk_index: u32,
}

impl Chunk {
    pub fn new(
        document_id: Uuid,
        content: String,
        source: ChunkSource,
        char_start: usize,
        char_end: usize,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content,
            embedding: Vec::new(),
            source,
            char_start,
            char_end,
            chunk_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_wire_name() {
        assert_eq!(DataType::PdfFile.as_str(), "pdf_file");
        assert_eq!("pdf_file".parse::<DataType>().unwrap(), DataType::PdfFile);
        assert_eq!(
            serde_json::to_string(&DataType::PdfFile).unwrap(),
            "\"pdf_file\""
        );
        assert!(matches!(
            "web_page".parse::<DataType>(),
            Err(Error::UnsupportedDataType(_))
        ));
    }

    #[test]
    fn test_declared_pdf() {
        assert!(UploadedDocument::pdf("doc.pdf", &b"%PDF-1.4"[..]).declares_pdf());
        assert!(UploadedDocument::new("doc.PDF", "application/octet-stream", Bytes::new()).declares_pdf());
        assert!(!UploadedDocument::new("notes.txt", "text/plain", Bytes::new()).declares_pdf());
        assert!(!UploadedDocument::new("notes.txt", "application/octet-stream", Bytes::new()).declares_pdf());
    }

    #[test]
    fn test_pdf_signature() {
        assert!(UploadedDocument::pdf("doc.pdf", &b"%PDF-1.7\n..."[..]).has_pdf_signature());
        assert!(!UploadedDocument::pdf("doc.pdf", &b"<html>"[..]).has_pdf_signature());
    }

    #[test]
    fn test_format_reference() {
        let source = ChunkSource {
            filename: "report.pdf".to_string(),
            page_number: Some(2),
            page_count: Some(10),
        };
        assert_eq!(source.format_reference(), "report.pdf, page 2 of 10");
    }
}
