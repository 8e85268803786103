//! Session registry: each caller session owns its own `Portfolio` handle.
//!
//! Handles are independent: an upload in one session swaps only that
//! session's active collection. Within a session the handle sits behind a
//! mutex, so loads and queries for one session never interleave.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::portfolio::embedding::EmbeddingProvider;
use crate::portfolio::store::VectorStore;
use crate::portfolio::Portfolio;

pub type SharedPortfolio = Arc<Mutex<Portfolio>>;

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SharedPortfolio>>>,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    default_dataset: PathBuf,
    default_load: Arc<Mutex<()>>,
}

impl SessionRegistry {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        default_dataset: PathBuf,
    ) -> Self {
        Self {
            sessions: Arc::default(),
            store,
            embedder,
            default_dataset,
            default_load: Arc::default(),
        }
    }

    /// Opens a session whose handle starts on the default collection.
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let portfolio = Portfolio::new(
            self.store.clone(),
            self.embedder.clone(),
            self.default_dataset.clone(),
        )
        .with_default_load_lock(self.default_load.clone());
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(portfolio)));
        info!("Opened session {id}");
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedPortfolio> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Closes a session and releases its uploaded collection. False if unknown.
    pub async fn remove(&self, id: Uuid) -> bool {
        let Some(portfolio) = self.sessions.write().await.remove(&id) else {
            return false;
        };
        portfolio.lock().await.close().await;
        info!("Closed session {id}");
        true
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
