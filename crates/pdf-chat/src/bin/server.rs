//! PDF chat server binary
//!
//! Run with: cargo run -p pdf-chat --bin pdf-chat-server

use pdf_chat::{config::AppConfig, generation::OllamaClient, server::ChatServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_chat=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                      Chat with PDF                        ║
║        Grounded answers from a local Ollama model         ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let config = AppConfig::load()?;
    let llm = &config.knowledge_base.llm;

    tracing::info!("Configuration loaded");
    tracing::info!("  - LLM model: {} (stream: {})", llm.model, llm.stream);
    tracing::info!("  - Embedding model: {}", config.knowledge_base.embedder.model);
    tracing::info!("  - Max tokens: {}, temperature: {}", llm.max_tokens, llm.temperature);
    tracing::info!("  - Chunk size: {}", config.chunking.chunk_size);
    match &config.knowledge_base.vectordb.dir {
        Some(dir) => tracing::info!("  - Vector index: per-session directories under {:?}", dir),
        None => tracing::info!("  - Vector index: temporary directory per session"),
    }

    // Check Ollama
    tracing::info!("Checking Ollama at {}...", llm.base_url);
    let ollama = OllamaClient::new(&llm.base_url, 5, 0)?;
    if ollama.health_check().await.unwrap_or(false) {
        tracing::info!("Ollama is running");
    } else {
        tracing::warn!("Ollama not available at {}", llm.base_url);
        tracing::warn!("Please start Ollama:");
        tracing::warn!("  1. Start: ollama serve");
        tracing::warn!("  2. Pull the model: ollama pull {}", llm.model);
    }

    let server = ChatServer::new(config);

    println!("\nServer starting...");
    println!("  Chat: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
