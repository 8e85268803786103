//! Portfolio index: techstack descriptions embedded for similarity search,
//! each carrying the portfolio link it came from.
//!
//! A `Portfolio` is a caller-owned handle onto exactly one active collection.
//! Uploading a dataset never mutates the active collection: it fills a freshly
//! named one and only then swaps the handle over, so a query can never mix
//! rows from two uploads.

pub mod dataset;
pub mod embedding;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use self::dataset::{PortfolioDataset, PortfolioEntry, SchemaError};
use self::embedding::{EmbeddingError, EmbeddingProvider};
use self::store::{EntryMetadata, IndexedEntry, StoreError, VectorStore};

pub const DEFAULT_COLLECTION: &str = "portfolio";
/// Nearest entries returned per skill.
pub const DEFAULT_TOP_K: usize = 2;
/// Rows shown back to the caller after an upload.
const PREVIEW_ROWS: usize = 10;
/// Rows embedded per provider call.
const EMBED_BATCH: usize = 64;

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a query produced no links even though it was asked to look.
/// Callers collapse this into an empty link set; it is never fatal.
#[derive(Debug, Error)]
pub enum RetrievalDegradation {
    #[error("could not embed query skills: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("portfolio index query failed: {0}")]
    Backend(#[from] StoreError),
}

/// A portfolio link returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrievedLink {
    pub link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    Empty,
    Loaded,
}

/// Outcome of a load. `inserted == 0` with `state == Loaded` is a no-op load
/// or an upload with zero data rows.
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub collection: String,
    pub inserted: usize,
    pub skipped_blank: usize,
    pub total: usize,
    pub preview: Vec<PortfolioEntry>,
}

pub struct Portfolio {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    default_dataset: PathBuf,
    collection: String,
    loaded: bool,
    /// Serialises default loads across handles sharing the default collection.
    default_load: Arc<Mutex<()>>,
}

impl Portfolio {
    /// A handle on the shared default collection.
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        default_dataset: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            embedder,
            default_dataset: default_dataset.into(),
            collection: DEFAULT_COLLECTION.to_string(),
            loaded: false,
            default_load: Arc::default(),
        }
    }

    /// Shares `lock` with other handles so only one of them fills the default
    /// collection.
    pub fn with_default_load_lock(mut self, lock: Arc<Mutex<()>>) -> Self {
        self.default_load = lock;
        self
    }

    /// Name of the active collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn count(&self) -> Result<usize, PortfolioError> {
        Ok(self.store.count(&self.collection).await?)
    }

    pub async fn state(&self) -> Result<IndexState, PortfolioError> {
        if self.loaded || self.count().await? > 0 {
            Ok(IndexState::Loaded)
        } else {
            Ok(IndexState::Empty)
        }
    }

    /// Fills the active collection from the default dataset unless it is
    /// already loaded. Repeated calls insert nothing.
    pub async fn load_default(&mut self) -> Result<LoadSummary, PortfolioError> {
        let lock = self.default_load.clone();
        let _guard = lock.lock().await;
        self.store.create_collection(&self.collection).await?;

        if self.state().await? == IndexState::Loaded {
            self.loaded = true;
            debug!("Collection '{}' already loaded; skipping default load", self.collection);
            return Ok(LoadSummary {
                collection: self.collection.clone(),
                inserted: 0,
                skipped_blank: 0,
                total: self.count().await?,
                preview: Vec::new(),
            });
        }

        let dataset = PortfolioDataset::from_path(&self.default_dataset)?;
        let collection = self.collection.clone();
        let summary = self.insert_dataset(&collection, dataset).await?;
        self.loaded = true;
        Ok(summary)
    }

    /// Validates and indexes an uploaded CSV into a new collection, then makes
    /// it the active one. On any error the active collection is unchanged.
    pub async fn load_uploaded(&mut self, csv: &[u8]) -> Result<LoadSummary, PortfolioError> {
        let dataset = PortfolioDataset::from_csv(csv)?;
        self.load_uploaded_dataset(dataset).await
    }

    pub async fn load_uploaded_dataset(
        &mut self,
        dataset: PortfolioDataset,
    ) -> Result<LoadSummary, PortfolioError> {
        let collection = format!("{DEFAULT_COLLECTION}_{}", Uuid::new_v4().simple());
        self.store.create_collection(&collection).await?;
        let summary = self.insert_dataset(&collection, dataset).await?;

        let previous = std::mem::replace(&mut self.collection, collection);
        info!(
            "Active portfolio collection switched from '{previous}' to '{}'",
            self.collection
        );
        if previous != DEFAULT_COLLECTION {
            self.store.release(&previous).await;
        }
        self.loaded = true;
        Ok(summary)
    }

    /// Embeds every row before writing anything, then inserts them in one
    /// call, so a failed load leaves the collection untouched.
    async fn insert_dataset(
        &self,
        collection: &str,
        dataset: PortfolioDataset,
    ) -> Result<LoadSummary, PortfolioError> {
        let preview: Vec<PortfolioEntry> =
            dataset.entries.iter().take(PREVIEW_ROWS).cloned().collect();

        let embeddings = self.embed_rows(&dataset.entries).await?;
        let entries: Vec<IndexedEntry> = dataset
            .entries
            .iter()
            .zip(embeddings)
            .map(|(row, embedding)| IndexedEntry {
                id: Uuid::new_v4(),
                text: row.techstack.clone(),
                embedding,
                metadata: EntryMetadata {
                    link: row.link.clone(),
                },
            })
            .collect();
        let inserted = entries.len();
        if !entries.is_empty() {
            self.store.insert(collection, entries).await?;
        }

        info!(
            "Indexed {inserted} portfolio entries into '{collection}' ({} blank rows skipped)",
            dataset.skipped_blank
        );

        Ok(LoadSummary {
            collection: collection.to_string(),
            inserted,
            skipped_blank: dataset.skipped_blank,
            total: self.store.count(collection).await?,
            preview,
        })
    }

    /// One vector per row. Rows with only a link get a zero vector and are
    /// never sent to the provider.
    async fn embed_rows(&self, rows: &[PortfolioEntry]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let dimensions = self.embedder.dimensions();
        let mut embeddings = Vec::with_capacity(rows.len());

        for chunk in rows.chunks(EMBED_BATCH) {
            let texts: Vec<&str> = chunk
                .iter()
                .map(|row| row.techstack.as_str())
                .filter(|text| !text.trim().is_empty())
                .collect();
            let vectors = if texts.is_empty() {
                Vec::new()
            } else {
                self.embedder.embed_batch(&texts).await?
            };
            if vectors.len() != texts.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: texts.len(),
                    got: vectors.len(),
                });
            }

            let mut vectors = vectors.into_iter();
            for row in chunk {
                let embedding = if row.techstack.trim().is_empty() {
                    None
                } else {
                    vectors.next()
                };
                embeddings.push(embedding.unwrap_or_else(|| vec![0.0; dimensions]));
            }
        }
        Ok(embeddings)
    }

    /// Drops this handle's uploaded collection from memory. The shared default
    /// collection is never released.
    pub async fn close(&mut self) {
        if self.collection != DEFAULT_COLLECTION {
            self.store.release(&self.collection).await;
        }
    }

    /// Up to `k` nearest links per skill, concatenated in skill order.
    /// Duplicates across skills are kept. An empty index or empty skill list
    /// is `Ok(vec![])`; a failing backend is `Err`.
    pub async fn query(
        &self,
        skills: &[String],
        k: usize,
    ) -> Result<Vec<RetrievedLink>, RetrievalDegradation> {
        let skills: Vec<&str> = skills
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if skills.is_empty() || k == 0 || self.store.count(&self.collection).await? == 0 {
            return Ok(Vec::new());
        }

        let embeddings = self.embedder.embed_queries(&skills).await?;
        let mut links = Vec::new();
        for (skill, embedding) in skills.iter().zip(embeddings) {
            let hits = self.store.search(&self.collection, &embedding, k).await?;
            debug!("Skill '{skill}' matched {} portfolio entries", hits.len());
            links.extend(hits.into_iter().map(|hit| RetrievedLink {
                link: hit.entry.metadata.link,
            }));
        }
        Ok(links)
    }

    /// `query`, with degradation logged and collapsed to no links.
    pub async fn query_or_empty(&self, skills: &[String], k: usize) -> Vec<RetrievedLink> {
        match self.query(skills, k).await {
            Ok(links) => links,
            Err(e) => {
                warn!("Portfolio retrieval degraded, continuing without links: {e}");
                Vec::new()
            }
        }
    }
}
