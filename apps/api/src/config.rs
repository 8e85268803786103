use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    /// When unset, portfolios are embedded locally with fastembed.
    pub embedding_api_key: Option<String>,
    pub embedding_base_url: String,
    pub embedding_model: String,
    /// Where the local embedding model is downloaded on first start.
    pub embedding_cache_dir: PathBuf,
    pub portfolio_csv: PathBuf,
    pub vectorstore_dir: PathBuf,
    /// Upper bound applied to every external call (page fetch, model, embeddings).
    pub http_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let http_timeout_secs = std::env::var("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?;

        Ok(Config {
            llm_api_key: require_env("LLM_API_KEY")?,
            llm_base_url: env_or("LLM_BASE_URL", "https://api.groq.com/openai/v1"),
            llm_model: env_or("LLM_MODEL", "llama-3.3-70b-versatile"),
            embedding_api_key: std::env::var("EMBEDDING_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            embedding_base_url: env_or("EMBEDDING_BASE_URL", "https://api.openai.com/v1"),
            embedding_model: env_or("EMBEDDING_MODEL", "text-embedding-3-small"),
            embedding_cache_dir: PathBuf::from(env_or("EMBEDDING_CACHE_DIR", ".fastembed_cache")),
            portfolio_csv: PathBuf::from(env_or("PORTFOLIO_CSV", "resource/my_portfolio.csv")),
            vectorstore_dir: PathBuf::from(env_or("VECTORSTORE_DIR", "vectorstore")),
            http_timeout: Duration::from_secs(http_timeout_secs),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .map(|v| v.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| default.to_string())
}
