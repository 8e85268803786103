//! Embedding providers. Loading and querying a portfolio MUST use the same provider,
//! otherwise similarity scores are meaningless.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Texts per ONNX inference pass; bounds peak memory for large uploads.
const FASTEMBED_BATCH: usize = 16;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("embedding API returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("local embedding model failed: {0}")]
    Local(String),

    #[error("embedding task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Generates vector embeddings from text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds portfolio texts for indexing, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embeds search texts. Same as `embed_batch` unless the model is task-prefixed.
    async fn embed_queries(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize;
}

// ── Local ONNX embeddings (fastembed) ──────────────────────────────

/// Offline provider running nomic-embed-text-v1.5 through fastembed.
///
/// The model is downloaded into `cache_dir` on first start. Inference is
/// CPU-bound, so every call runs on a blocking thread.
pub struct FastEmbedProvider {
    model: Arc<fastembed::TextEmbedding>,
}

impl FastEmbedProvider {
    pub async fn new(cache_dir: PathBuf) -> Result<Self, EmbeddingError> {
        info!("Loading local embedding model into {}", cache_dir.display());
        let model = tokio::task::spawn_blocking(move || {
            let options = fastembed::InitOptions::new(fastembed::EmbeddingModel::NomicEmbedTextV15)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(false);
            fastembed::TextEmbedding::try_new(options)
        })
        .await?
        .map_err(|e| EmbeddingError::Local(format!("model initialization failed: {e}")))?;

        Ok(Self {
            model: Arc::new(model),
        })
    }

    async fn run(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let expected = inputs.len();
        let model = Arc::clone(&self.model);
        let vectors = tokio::task::spawn_blocking(move || model.embed(inputs, Some(FASTEMBED_BATCH)))
            .await?
            .map_err(|e| EmbeddingError::Local(e.to_string()))?;
        if vectors.len() != expected {
            return Err(EmbeddingError::CountMismatch {
                expected,
                got: vectors.len(),
            });
        }
        debug!("Embedded {expected} texts locally");
        Ok(vectors)
    }
}

/// nomic-embed-text expects indexed texts to carry this task prefix.
fn document_input(text: &str) -> String {
    format!("search_document: {text}")
}

fn query_input(text: &str) -> String {
    format!("search_query: {text}")
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.run(texts.iter().map(|t| document_input(t)).collect()).await
    }

    async fn embed_queries(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.run(texts.iter().map(|t| query_input(t)).collect()).await
    }

    fn dimensions(&self) -> usize {
        768
    }
}

// ── OpenAI-compatible embeddings API ───────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// [`EmbeddingProvider`] backed by an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbeddingProvider {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let dimensions = known_dimensions(&model);
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_key,
            base_url,
            model,
            dimensions,
        })
    }
}

fn known_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: parsed.data.len(),
            });
        }
        parsed.data.sort_by_key(|d| d.index);
        debug!("Embedded {} texts with {}", texts.len(), self.model);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
pub use self::hashing::HashingEmbedder;
