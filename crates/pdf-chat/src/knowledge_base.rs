//! Knowledge base: a vector index plus the LLM configuration used to query it

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{
    ChunkingConfig, EmbedderProviderKind, KnowledgeBaseConfig, LlmProviderKind,
    VectorDbProviderKind,
};
use crate::error::{Error, Result};
use crate::generation::{PromptBuilder, TokenStream};
use crate::ingestion::IngestPipeline;
use crate::providers::{
    EmbeddingProvider, LlmProvider, LocalVectorStore, OllamaEmbedder, OllamaLlm,
    VectorStoreProvider,
};
use crate::types::{ConversationEntry, DataType, Document};

/// Result of adding a source to the knowledge base
#[derive(Debug, Clone)]
pub struct AddOutcome {
    /// The indexed document (the existing one for duplicates)
    pub document: Document,
    /// Chunks embedded by this call
    pub chunks_created: u32,
    /// Content was already indexed; nothing was embedded
    pub duplicate: bool,
}

/// Knowledge base handle
pub struct KnowledgeBase {
    config: KnowledgeBaseConfig,
    pipeline: Arc<IngestPipeline>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    vector_store: Arc<dyn VectorStoreProvider>,
    index_dir: Option<PathBuf>,
}

impl KnowledgeBase {
    /// Build the providers named by the configuration.
    ///
    /// Every knowledge base gets its own index directory, created under
    /// `vectordb.dir` or the system temp dir. The directory outlives the
    /// knowledge base.
    pub fn from_config(config: &KnowledgeBaseConfig, chunking: &ChunkingConfig) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> = match config.embedder.provider {
            EmbedderProviderKind::Ollama => Arc::new(OllamaEmbedder::new(&config.embedder, &config.llm)?),
        };

        let llm: Arc<dyn LlmProvider> = match config.llm.provider {
            LlmProviderKind::Ollama => Arc::new(OllamaLlm::new(&config.llm)?),
        };

        let parent = match &config.vectordb.dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                dir.clone()
            }
            None => std::env::temp_dir(),
        };
        let dir = tempfile::Builder::new()
            .prefix("pdf-chat-db-")
            .tempdir_in(&parent)?
            .keep();

        let vector_store: Arc<dyn VectorStoreProvider> = match config.vectordb.provider {
            VectorDbProviderKind::Local => Arc::new(LocalVectorStore::open(&dir)?),
        };

        tracing::info!(
            "Created knowledge base: llm={}/{}, embedder={}/{}, index={:?}",
            llm.name(),
            llm.model(),
            embedder.name(),
            embedder.model(),
            dir
        );

        let mut kb = Self::with_providers(config.clone(), chunking, embedder, llm, vector_store);
        kb.index_dir = Some(dir);
        Ok(kb)
    }

    /// Assemble a knowledge base from explicit providers
    pub fn with_providers(
        config: KnowledgeBaseConfig,
        chunking: &ChunkingConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        vector_store: Arc<dyn VectorStoreProvider>,
    ) -> Self {
        Self {
            config,
            pipeline: Arc::new(IngestPipeline::new(chunking)),
            embedder,
            llm,
            vector_store,
            index_dir: None,
        }
    }

    pub fn config(&self) -> &KnowledgeBaseConfig {
        &self.config
    }

    /// Directory holding the vector index, when it lives on disk
    pub fn index_dir(&self) -> Option<&Path> {
        self.index_dir.as_deref()
    }

    /// Add a file, naming the document after the file
    pub async fn add(&self, path: &Path, data_type: DataType) -> Result<AddOutcome> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.add_as(path, data_type, &filename).await
    }

    /// Add a file under the given display name
    pub async fn add_as(&self, path: &Path, data_type: DataType, filename: &str) -> Result<AddOutcome> {
        let start = Instant::now();
        let data = tokio::fs::read(path).await?;

        let pipeline = self.pipeline.clone();
        let name = filename.to_string();
        let (mut document, _parsed, mut chunks) =
            tokio::task::spawn_blocking(move || pipeline.ingest(&name, data_type, &data))
                .await
                .map_err(|e| Error::internal(format!("Task join error: {}", e)))??;

        if let Some(existing) = self.vector_store.find_by_hash(&document.content_hash).await? {
            tracing::info!("'{}' is already indexed as {}", filename, existing.id);
            return Ok(AddOutcome {
                document: existing,
                chunks_created: 0,
                duplicate: true,
            });
        }

        if chunks.is_empty() {
            return Err(Error::file_parse(filename, "Document has too little text to index"));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }
        document.total_chunks = chunks.len() as u32;

        self.vector_store.insert_document(&document, &chunks).await?;

        tracing::info!(
            "Indexed '{}': {} pages, {} chunks in {}ms",
            filename,
            document.total_pages.unwrap_or(0),
            chunks.len(),
            start.elapsed().as_millis()
        );

        Ok(AddOutcome {
            chunks_created: chunks.len() as u32,
            document,
            duplicate: false,
        })
    }

    /// Answer a query without conversational memory
    pub async fn chat(&self, query: &str) -> Result<String> {
        self.chat_with_history(query, &[]).await
    }

    /// Answer a query, passing earlier turns as conversational memory
    pub async fn chat_with_history(&self, query: &str, history: &[ConversationEntry]) -> Result<String> {
        let prompt = self.build_prompt(query, history).await?;
        self.llm.generate(&prompt).await
    }

    /// Answer a query as a stream of fragments
    pub async fn chat_stream(&self, query: &str, history: &[ConversationEntry]) -> Result<TokenStream> {
        let prompt = self.build_prompt(query, history).await?;
        self.llm.generate_stream(&prompt).await
    }

    /// Documents indexed so far
    pub async fn documents(&self) -> Result<Vec<Document>> {
        self.vector_store.documents().await
    }

    async fn build_prompt(&self, query: &str, history: &[ConversationEntry]) -> Result<String> {
        let context = if self.vector_store.is_empty().await? {
            String::new()
        } else {
            let query_embedding = self.embedder.embed(query).await?;
            let results = self
                .vector_store
                .search(&query_embedding, self.config.llm.number_documents)
                .await?;
            tracing::debug!("Retrieved {} chunks for query", results.len());
            PromptBuilder::build_context(&results)
        };

        let history = PromptBuilder::build_history(history, self.config.llm.history_window);
        Ok(PromptBuilder::build_chat_prompt(query, &context, &history))
    }
}

/// Creates the knowledge base for a new session
#[async_trait]
pub trait KnowledgeBaseFactory: Send + Sync {
    async fn create(&self) -> Result<KnowledgeBase>;
}

/// Factory building knowledge bases from configuration
pub struct ConfigFactory {
    config: KnowledgeBaseConfig,
    chunking: ChunkingConfig,
}

impl ConfigFactory {
    pub fn new(config: KnowledgeBaseConfig, chunking: ChunkingConfig) -> Self {
        Self { config, chunking }
    }
}

#[async_trait]
impl KnowledgeBaseFactory for ConfigFactory {
    async fn create(&self) -> Result<KnowledgeBase> {
        let config = self.config.clone();
        let chunking = self.chunking.clone();
        // Creating the index directory touches the filesystem
        tokio::task::spawn_blocking(move || KnowledgeBase::from_config(&config, &chunking))
            .await
            .map_err(|e| Error::internal(format!("Task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fake_kb, sample_pdf, FakeLlm};
    use std::io::Write;

    fn write_pdf(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&sample_pdf(text)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_add_indexes_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let (kb, _llm) = fake_kb(FakeLlm::answering("ok"));
        let path = write_pdf(dir.path(), "doc.pdf", "The quarterly summary reports steady growth.");

        let outcome = kb.add(&path, DataType::PdfFile).await.unwrap();
        assert!(!outcome.duplicate);
        assert!(outcome.chunks_created >= 1);
        assert_eq!(outcome.document.filename, "doc.pdf");
        assert_eq!(outcome.document.total_pages, Some(1));
        assert_eq!(kb.documents().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_same_content_is_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let (kb, _llm) = fake_kb(FakeLlm::answering("ok"));
        let text = "Identical content appears in both uploaded files.";
        let first = write_pdf(dir.path(), "a.pdf", text);
        let second = write_pdf(dir.path(), "b.pdf", text);

        let original = kb.add(&first, DataType::PdfFile).await.unwrap();
        let again = kb.add_as(&second, DataType::PdfFile, "copy.pdf").await.unwrap();

        assert!(again.duplicate);
        assert_eq!(again.chunks_created, 0);
        assert_eq!(again.document.id, original.document.id);
        assert_eq!(kb.documents().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_corrupted_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (kb, _llm) = fake_kb(FakeLlm::answering("ok"));
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4 garbage").unwrap();

        assert!(kb.add(&path, DataType::PdfFile).await.is_err());
        assert!(kb.documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_grounds_prompt_in_context_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let (kb, llm) = fake_kb(FakeLlm::answering("Growth was steady."));
        let path = write_pdf(dir.path(), "doc.pdf", "The quarterly summary reports steady growth.");
        kb.add(&path, DataType::PdfFile).await.unwrap();

        let history = vec![
            ConversationEntry::user("Hello"),
            ConversationEntry::assistant("Hi there"),
        ];
        assert_eq!(llm.calls(), 0);
        let answer = kb.chat_with_history("What is the summary?", &history).await.unwrap();
        assert_eq!(answer, "Growth was steady.");
        assert_eq!(llm.calls(), 1);

        let prompt = llm.last_prompt().unwrap();
        assert!(prompt.contains("doc.pdf, page 1 of 1"));
        assert!(prompt.contains("steady growth"));
        assert!(prompt.contains("Human: Hello\nAI: Hi there"));
        assert!(prompt.contains("Query: What is the summary?"));
    }

    #[tokio::test]
    async fn test_chat_on_empty_index_skips_retrieval() {
        let (kb, llm) = fake_kb(FakeLlm::answering("I don't know."));
        assert_eq!(kb.chat("Anything?").await.unwrap(), "I don't know.");
        assert!(llm.last_prompt().unwrap().contains("no matching content"));
    }

    #[tokio::test]
    async fn test_chat_propagates_llm_failure() {
        let (kb, _llm) = fake_kb(FakeLlm::failing());
        assert!(matches!(kb.chat("Anything?").await, Err(Error::Llm(_))));
    }

    #[tokio::test]
    async fn test_chat_stream_yields_fragments() {
        use futures::TryStreamExt;

        let (kb, _llm) = fake_kb(FakeLlm::answering("one two three"));
        let parts: Vec<String> = kb.chat_stream("q", &[]).await.unwrap().try_collect().await.unwrap();
        assert!(parts.len() > 1);
        assert_eq!(parts.concat(), "one two three");
    }

    #[tokio::test]
    async fn test_from_config_nests_index_under_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("db");
        let mut config = KnowledgeBaseConfig::default();
        config.vectordb.dir = Some(root.clone());

        let kb = KnowledgeBase::from_config(&config, &ChunkingConfig::default()).unwrap();
        let index_dir = kb.index_dir().unwrap();
        assert_eq!(index_dir.parent(), Some(root.as_path()));
        assert!(index_dir.is_dir());
    }

    #[tokio::test]
    async fn test_sessions_sharing_configured_dir_keep_separate_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = KnowledgeBaseConfig::default();
        config.vectordb.dir = Some(dir.path().to_path_buf());
        let factory = ConfigFactory::new(config, ChunkingConfig::default());

        let a = factory.create().await.unwrap();
        let b = factory.create().await.unwrap();
        let (dir_a, dir_b) = (a.index_dir().unwrap(), b.index_dir().unwrap());
        assert_ne!(dir_a, dir_b);

        // Writes through one session's index never reach the other's
        let doc = Document::new("a.pdf".to_string(), DataType::PdfFile, "h".to_string(), 1);
        let store_a = crate::retrieval::VectorStore::open(dir_a).unwrap();
        store_a.insert_document(&doc, &[]).unwrap();

        let store_b = crate::retrieval::VectorStore::open(dir_b).unwrap();
        assert!(store_b.documents().is_empty());
        assert_eq!(crate::retrieval::VectorStore::open(dir_a).unwrap().documents().len(), 1);
    }

    #[tokio::test]
    async fn test_from_config_without_dir_creates_fresh_index() {
        let factory = ConfigFactory::new(KnowledgeBaseConfig::default(), ChunkingConfig::default());
        let a = factory.create().await.unwrap();
        let b = factory.create().await.unwrap();

        let (dir_a, dir_b) = (a.index_dir().unwrap(), b.index_dir().unwrap());
        assert_ne!(dir_a, dir_b);
        assert!(dir_a.is_dir());

        let _ = std::fs::remove_dir_all(dir_a);
        let _ = std::fs::remove_dir_all(dir_b);
    }
}
