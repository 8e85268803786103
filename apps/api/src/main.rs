mod composition;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod pipeline;
mod portfolio;
mod routes;
mod scrape;
mod sessions;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::portfolio::embedding::{EmbeddingProvider, FastEmbedProvider, OpenAiEmbeddingProvider};
use crate::portfolio::store::LocalVectorStore;
use crate::routes::build_router;
use crate::scrape::HttpPageFetcher;
use crate::sessions::SessionRegistry;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("coldmail_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Coldmail API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(
        config.llm_api_key.clone(),
        config.llm_base_url.clone(),
        config.llm_model.clone(),
        config.http_timeout,
    )
    .context("building LLM client")?;
    info!("LLM client initialized (model: {})", llm.model());

    let fetcher = HttpPageFetcher::new(config.http_timeout).context("building page fetcher")?;

    // Initialize vector store and embedder
    let store = LocalVectorStore::open(&config.vectorstore_dir).with_context(|| {
        format!(
            "opening vector store at {}",
            config.vectorstore_dir.display()
        )
    })?;
    let embedder = build_embedder(&config).await?;
    info!(
        "Embedder initialized ({} dimensions)",
        embedder.dimensions()
    );

    // Build app state
    let state = AppState {
        llm: Arc::new(llm),
        fetcher: Arc::new(fetcher),
        sessions: SessionRegistry::new(
            Arc::new(store),
            embedder,
            config.portfolio_csv.clone(),
        ),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Remote embeddings when a key is configured, a local ONNX model otherwise.
async fn build_embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    match &config.embedding_api_key {
        Some(key) => {
            let provider = OpenAiEmbeddingProvider::new(
                key.clone(),
                config.embedding_base_url.clone(),
                config.embedding_model.clone(),
                config.http_timeout,
            )
            .context("building embedding client")?;
            info!("Using remote embeddings (model: {})", config.embedding_model);
            Ok(Arc::new(provider))
        }
        None => {
            info!("EMBEDDING_API_KEY not set, using local fastembed model");
            let provider = FastEmbedProvider::new(config.embedding_cache_dir.clone())
                .await
                .context("loading local embedding model")?;
            Ok(Arc::new(provider))
        }
    }
}
