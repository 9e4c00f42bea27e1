use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use ragmill::config::ConfigBuilder;
use ragmill::embeddings::EmbeddingOrchestrator;
use ragmill::pipeline::RetrievalPipeline;
use ragmill::providers::OllamaClient;
use ragmill::repl;
use ragmill::scrape::PageScraper;
use ragmill::stores::SqliteDocumentStore;
use ragmill::types::RagError;

const CONFIG_FILE: &str = "ragmill.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional; absence is not an error.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ragmill=info")),
        )
        .init();

    let config = ConfigBuilder::new()
        .with_file_if_present(CONFIG_FILE)?
        .with_env()
        .build()?;
    info!(
        base_url = %config.ollama.base_url,
        embedding_model = %config.ollama.embedding_model,
        chat_model = %config.ollama.chat_model,
        "configuration resolved"
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .map_err(RagError::Http)?;
    let ollama = OllamaClient::new(
        http.clone(),
        config.base_url()?,
        config.ollama.embedding_model.clone(),
        config.ollama.chat_model.clone(),
    );

    let store = Arc::new(SqliteDocumentStore::open_first(&config.storage.database_candidates).await?);
    let pipeline = RetrievalPipeline::new(
        &config,
        store,
        EmbeddingOrchestrator::new(
            Arc::new(ollama.clone()),
            Duration::from_millis(config.embed_pause_ms),
        ),
        Arc::new(ollama.clone()),
        PageScraper::new(http),
    )?;

    repl::run(&pipeline, &ollama).await?;
    Ok(())
}
