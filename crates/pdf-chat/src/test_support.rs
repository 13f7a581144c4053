//! In-memory providers and fixtures shared by unit tests

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ChunkingConfig, KnowledgeBaseConfig};
use crate::error::{Error, Result};
use crate::generation::TokenStream;
use crate::knowledge_base::{KnowledgeBase, KnowledgeBaseFactory};
use crate::providers::{EmbeddingProvider, LlmProvider, VectorSearchResult, VectorStoreProvider};
use crate::retrieval::cosine_similarity;
use crate::types::{Chunk, Document};

/// Letter-frequency embedding: similar wording gives similar vectors
pub struct FakeEmbedder;

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; 27];
        for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
            vector[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        // Keeps the vector non-zero for text without letters
        vector[26] = 1.0;
        Ok(vector)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "letters"
    }
}

/// Scripted LLM that records every prompt it receives
pub struct FakeLlm {
    answer: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn generate_stream(&self, prompt: &str) -> Result<TokenStream> {
        self.prompts.lock().push(prompt.to_string());

        let answer = self
            .answer
            .clone()
            .ok_or_else(|| Error::llm("connection refused"))?;

        let fragments: Vec<Result<String>> = answer
            .split_inclusive(' ')
            .map(|word| Ok(word.to_string()))
            .collect();

        Ok(Box::pin(futures::stream::iter(fragments)))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.answer.is_some())
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Vector store kept entirely in memory
#[derive(Default)]
pub struct MemoryVectorStore {
    documents: Mutex<Vec<Document>>,
    chunks: Mutex<Vec<Chunk>>,
}

#[async_trait]
impl VectorStoreProvider for MemoryVectorStore {
    async fn insert_document(&self, document: &Document, chunks: &[Chunk]) -> Result<()> {
        self.documents.lock().push(document.clone());
        self.chunks.lock().extend_from_slice(chunks);
        Ok(())
    }

    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<Document>> {
        Ok(self
            .documents
            .lock()
            .iter()
            .find(|d| d.content_hash == content_hash)
            .cloned())
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let mut results: Vec<VectorSearchResult> = self
            .chunks
            .lock()
            .iter()
            .map(|chunk| VectorSearchResult {
                similarity: cosine_similarity(query_embedding, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .collect();
        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(top_k);
        Ok(results)
    }

    async fn documents(&self) -> Result<Vec<Document>> {
        Ok(self.documents.lock().clone())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.chunks.lock().len())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Knowledge base over fake providers; the LLM is returned for inspection
pub fn fake_kb(llm: FakeLlm) -> (KnowledgeBase, Arc<FakeLlm>) {
    let llm = Arc::new(llm);
    let kb = KnowledgeBase::with_providers(
        KnowledgeBaseConfig::default(),
        &ChunkingConfig::default(),
        Arc::new(FakeEmbedder),
        llm.clone(),
        Arc::new(MemoryVectorStore::default()),
    );
    (kb, llm)
}

/// Factory handing out fake knowledge bases and counting how many it built
pub struct FakeFactory {
    answer: Option<String>,
    created: AtomicUsize,
}

impl FakeFactory {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            created: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            created: AtomicUsize::new(0),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeBaseFactory for FakeFactory {
    async fn create(&self) -> Result<KnowledgeBase> {
        self.created.fetch_add(1, Ordering::SeqCst);
        // Widen the window in which concurrent first accesses overlap
        tokio::time::sleep(Duration::from_millis(20)).await;

        let llm = match &self.answer {
            Some(answer) => FakeLlm::answering(answer),
            None => FakeLlm::failing(),
        };
        Ok(fake_kb(llm).0)
    }
}

/// Build a one-page PDF showing `text`
pub fn sample_pdf(text: &str) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![50.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("encode content stream"),
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("serialize pdf");
    buffer
}
