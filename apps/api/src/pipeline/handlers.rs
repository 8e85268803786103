//! Axum route handlers for sessions, portfolios, and email generation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::composition::style::EmailStyleConfig;
use crate::errors::AppError;
use crate::extraction::job_extractor::{extract_jobs, JobRecord};
use crate::pipeline::{generate_emails, GeneratedEmail};
use crate::portfolio::{LoadSummary, RetrievedLink, DEFAULT_TOP_K};
use crate::scrape::normalize::normalize;
use crate::sessions::SharedPortfolio;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub collection: String,
}

#[derive(Debug, Deserialize)]
pub struct LinksRequest {
    pub skills: Vec<String>,
    #[serde(default = "default_top_k")]
    pub k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Serialize)]
pub struct LinksResponse {
    pub links: Vec<RetrievedLink>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateEmailsRequest {
    pub url: String,
    pub style: EmailStyleConfig,
}

#[derive(Debug, Serialize)]
pub struct GenerateEmailsResponse {
    pub emails: Vec<GeneratedEmail>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub jobs: Vec<JobRecord>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

async fn session(state: &AppState, id: Uuid) -> Result<SharedPortfolio, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let session_id = state.sessions.create().await;
    let portfolio = session(&state, session_id).await?;
    let collection = portfolio.lock().await.collection().to_string();
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            collection,
        }),
    ))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// POST /api/v1/sessions/:id/portfolio
///
/// Body is the raw CSV. Replaces the session's active collection on success.
pub async fn handle_upload_portfolio(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<LoadSummary>, AppError> {
    let portfolio = session(&state, id).await?;
    let summary = portfolio.lock().await.load_uploaded(&body).await?;
    Ok(Json(summary))
}

/// POST /api/v1/sessions/:id/portfolio/default
pub async fn handle_load_default(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LoadSummary>, AppError> {
    let portfolio = session(&state, id).await?;
    let summary = portfolio.lock().await.load_default().await?;
    Ok(Json(summary))
}

/// POST /api/v1/sessions/:id/links
pub async fn handle_query_links(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<LinksRequest>,
) -> Result<Json<LinksResponse>, AppError> {
    let portfolio = session(&state, id).await?;
    let links = portfolio
        .lock()
        .await
        .query_or_empty(&request.skills, request.k)
        .await;
    Ok(Json(LinksResponse { links }))
}

/// POST /api/v1/sessions/:id/emails
///
/// Full cycle: fetch → normalize → load → extract → retrieve → compose.
pub async fn handle_generate_emails(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<GenerateEmailsRequest>,
) -> Result<Json<GenerateEmailsResponse>, AppError> {
    let portfolio = session(&state, id).await?;
    let mut portfolio = portfolio.lock().await;
    let emails = generate_emails(
        &request.url,
        &request.style,
        &mut portfolio,
        state.fetcher.as_ref(),
        state.llm.as_ref(),
    )
    .await?;
    Ok(Json(GenerateEmailsResponse { emails }))
}

/// POST /api/v1/jobs/extract
pub async fn handle_extract_jobs(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    let text = normalize(&request.text);
    if text.is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }
    let jobs = extract_jobs(&text, state.llm.as_ref()).await?;
    Ok(Json(ExtractResponse { jobs }))
}
