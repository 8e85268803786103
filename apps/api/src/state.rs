use std::sync::Arc;

use crate::llm_client::CompletionModel;
use crate::scrape::PageFetcher;
use crate::sessions::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Language model used for both extraction and composition.
    pub llm: Arc<dyn CompletionModel>,
    pub fetcher: Arc<dyn PageFetcher>,
    /// Per-session portfolio handles over the shared vector store.
    pub sessions: SessionRegistry,
}
