//! PDF text extraction

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::{mpsc, OnceLock};
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// How long pdf-extract may run before we give up on it
const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Glyph names such as `(uni2019)` or `<uni00A0>` left behind by some PDF fonts
fn glyph_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[(<]?uni([0-9A-Fa-f]{4})[)>]?").expect("valid glyph regex"))
}

fn blank_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]{2,}").expect("valid whitespace regex"))
}

/// Clean up PDF text: decode glyph names, fold typographic characters to ASCII,
/// drop NULs and blank lines
pub fn cleanup_pdf_text(text: &str) -> String {
    let decoded = glyph_name_re().replace_all(text, |caps: &regex::Captures<'_>| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    let folded = decoded
        .replace('\0', "")
        .replace(['\u{2010}', '\u{2011}', '\u{2013}'], "-")
        .replace('\u{2014}', "--")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl");

    folded
        .lines()
        .map(|l| blank_run_re().replace_all(l.trim(), " ").into_owned())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Content hash used to recognise documents that were already added
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Parsed document with extracted text
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Extracted text content (all pages)
    pub content: String,
    /// Content hash for deduplication
    pub content_hash: String,
    /// Total pages (if known)
    pub total_pages: Option<u32>,
    /// Page-level content
    pub pages: Vec<PageContent>,
}

/// Content from a single page
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Text content of the page
    pub content: String,
    /// Character offset in full document
    pub char_offset: usize,
}

/// PDF parser: pdf-extract first, lopdf content streams as a fallback
pub struct PdfParser;

impl PdfParser {
    /// Parse a PDF held in memory
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let mut raw_pages = Self::extract_pages_with_timeout(filename, data)?;

        if raw_pages.iter().all(|p| cleanup_pdf_text(p).is_empty()) {
            tracing::debug!("pdf-extract found no text in '{}', trying fallback", filename);
            if let Ok(fallback) = Self::extract_pages_fallback(filename, data) {
                raw_pages = fallback;
            }
        }

        let mut pages = Vec::new();
        let mut content = String::new();

        for (i, raw) in raw_pages.iter().enumerate() {
            let text = cleanup_pdf_text(raw);
            if text.is_empty() {
                continue;
            }

            if !content.is_empty() {
                content.push('\n');
            }

            pages.push(PageContent {
                page_number: i as u32 + 1,
                content: text.clone(),
                char_offset: content.len(),
            });
            content.push_str(&text);
        }

        if content.trim().is_empty() {
            return Err(Error::file_parse(
                filename,
                "No text content could be extracted from PDF",
            ));
        }

        let total_pages = match lopdf::Document::load_mem(data) {
            Ok(doc) => Some(doc.get_pages().len() as u32),
            Err(_) => Some(raw_pages.len() as u32),
        };

        Ok(ParsedDocument {
            content_hash: hash_content(&content),
            content,
            total_pages,
            pages,
        })
    }

    /// Run pdf-extract on a separate thread so a hang on a problematic font
    /// cannot stall ingestion forever
    fn extract_pages_with_timeout(filename: &str, data: &[u8]) -> Result<Vec<String>> {
        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem_by_pages(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(EXTRACTION_TIMEOUT) {
            Ok(Ok(pages)) => {
                let _ = handle.join();
                Ok(pages)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                tracing::warn!("pdf-extract failed on '{}': {}, trying fallback", filename, e);
                Self::extract_pages_fallback(filename, data)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!(
                    "PDF extraction of '{}' timed out after {:?}",
                    filename,
                    EXTRACTION_TIMEOUT
                );
                Self::extract_pages_fallback(filename, data)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                // pdf-extract panicked
                tracing::error!("PDF extraction thread crashed on '{}'", filename);
                Self::extract_pages_fallback(filename, data)
            }
        }
    }

    /// Fallback extraction reading text operators from lopdf content streams
    fn extract_pages_fallback(filename: &str, data: &[u8]) -> Result<Vec<String>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let mut pages = Vec::new();

        for (page_num, page_id) in doc.get_pages() {
            match doc.get_page_content(page_id) {
                Ok(content) => pages.push(Self::extract_text_from_content(&content)),
                Err(e) => {
                    tracing::debug!("Could not get content for page {}: {}", page_num, e);
                    pages.push(String::new());
                }
            }
        }

        if pages.iter().all(|p| p.trim().is_empty()) {
            tracing::warn!("Fallback extraction produced no text for '{}'", filename);
            return Err(Error::file_parse(
                filename,
                "PDF appears to be image-based or has no extractable text",
            ));
        }

        Ok(pages)
    }

    /// Extract text between BT/ET operators of a content stream
    fn extract_text_from_content(content: &[u8]) -> String {
        let content_str = String::from_utf8_lossy(content);
        let mut text = String::new();
        let mut in_text_block = false;
        let mut current_text = String::new();

        for line in content_str.lines() {
            let line = line.trim();

            if line == "BT" {
                in_text_block = true;
                continue;
            }

            if line == "ET" {
                in_text_block = false;
                if !current_text.is_empty() {
                    text.push_str(&current_text);
                    text.push('\n');
                    current_text.clear();
                }
                continue;
            }

            if in_text_block && (line.ends_with("Tj") || line.ends_with("TJ")) {
                if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
                    if start < end {
                        let decoded = line[start + 1..end]
                            .replace("\\n", "\n")
                            .replace("\\r", "\r")
                            .replace("\\t", "\t")
                            .replace("\\(", "(")
                            .replace("\\)", ")")
                            .replace("\\\\", "\\");
                        current_text.push_str(&decoded);
                    }
                }
            }
        }

        text
    }
}
