//! Similarity backend: named collections of embedded portfolio entries.
//!
//! `LocalVectorStore` keeps collections in memory behind a `tokio::sync::RwLock`
//! and, when opened on a directory, persists each collection as
//! `<dir>/<collection>.json`. Collections are re-read from disk on first access,
//! so a populated collection survives a process restart.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid collection name '{0}'")]
    InvalidName(String),

    #[error("collection '{0}' does not exist")]
    UnknownCollection(String),

    #[error("vector store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vector store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("vector store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub link: String,
}

/// A portfolio row as stored in a collection. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedEntry {
    pub id: Uuid,
    /// The text that was embedded (the row's techstack).
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: EntryMetadata,
}

#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: IndexedEntry,
    pub score: f32,
}

/// A storage backend for embedded entries with similarity search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str) -> Result<(), StoreError>;

    /// Number of entries in a collection; 0 if the collection does not exist.
    async fn count(&self, name: &str) -> Result<usize, StoreError>;

    /// Append entries to an existing collection. All or nothing.
    async fn insert(&self, name: &str, entries: Vec<IndexedEntry>) -> Result<(), StoreError>;

    /// Drop a collection from memory once no handle uses it. Persisted data stays.
    async fn release(&self, name: &str);

    /// The `top_k` entries most similar to `embedding`, by descending score.
    async fn search(
        &self,
        name: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredEntry>, StoreError>;
}

#[derive(Debug, Default)]
pub struct LocalVectorStore {
    dir: Option<PathBuf>,
    collections: RwLock<HashMap<String, Vec<IndexedEntry>>>,
}

impl LocalVectorStore {
    /// A store that never touches disk.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A store persisted under `dir`, created if missing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!("Vector store opened at {}", dir.display());
        Ok(Self {
            dir: Some(dir),
            collections: RwLock::default(),
        })
    }

    fn collection_path(&self, name: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(format!("{name}.json")))
    }

    /// Pulls a persisted collection into memory if it is not there yet.
    async fn ensure_loaded(&self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        if self.collections.read().await.contains_key(name) {
            return Ok(());
        }
        let Some(path) = self.collection_path(name) else {
            return Ok(());
        };
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let entries: Vec<IndexedEntry> = serde_json::from_slice(&bytes)?;
        debug!("Loaded collection '{name}' ({} entries) from disk", entries.len());
        self.collections
            .write()
            .await
            .entry(name.to_string())
            .or_insert(entries);
        Ok(())
    }

    async fn persist(&self, name: &str, entries: Vec<IndexedEntry>) -> Result<(), StoreError> {
        let (Some(dir), Some(path)) = (self.dir.clone(), self.collection_path(name)) else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || write_atomically(&dir, &path, &entries)).await??;
        Ok(())
    }
}

fn write_atomically(dir: &Path, path: &Path, entries: &[IndexedEntry]) -> Result<(), StoreError> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut tmp, entries)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

/// Cosine similarity; 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn create_collection(&self, name: &str) -> Result<(), StoreError> {
        self.ensure_loaded(name).await?;
        let created = {
            let mut collections = self.collections.write().await;
            if collections.contains_key(name) {
                false
            } else {
                collections.insert(name.to_string(), Vec::new());
                true
            }
        };
        if created {
            self.persist(name, Vec::new()).await?;
            info!("Created collection '{name}'");
        }
        Ok(())
    }

    async fn count(&self, name: &str) -> Result<usize, StoreError> {
        self.ensure_loaded(name).await?;
        Ok(self
            .collections
            .read()
            .await
            .get(name)
            .map(Vec::len)
            .unwrap_or(0))
    }

    async fn insert(&self, name: &str, entries: Vec<IndexedEntry>) -> Result<(), StoreError> {
        self.ensure_loaded(name).await?;
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))?;

        // Memory only changes once the new snapshot is on disk.
        let mut updated = collection.clone();
        updated.extend(entries);
        self.persist(name, updated.clone()).await?;
        *collection = updated;
        Ok(())
    }

    async fn release(&self, name: &str) {
        if self.collections.write().await.remove(name).is_some() {
            debug!("Released collection '{name}' from memory");
        }
    }

    async fn search(
        &self,
        name: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredEntry>, StoreError> {
        self.ensure_loaded(name).await?;
        let collections = self.collections.read().await;
        let collection = collections
            .get(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))?;

        let mut scored: Vec<ScoredEntry> = collection
            .iter()
            .map(|entry| ScoredEntry {
                score: cosine_similarity(&entry.embedding, embedding),
                entry: entry.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}
