//! Cold email pipeline: orchestrates one request end to end.
//!
//! Flow: fetch page → normalize → ensure portfolio loaded → extract jobs →
//!       per job: query portfolio → compose email → finalize.
//!
//! Strictly sequential. Page fetch, extraction, and composition failures
//! abort the cycle; portfolio retrieval failures only drop the links.

pub mod handlers;

use serde::Serialize;
use tracing::info;

use crate::composition::email::compose_email;
use crate::composition::style::EmailStyleConfig;
use crate::errors::AppError;
use crate::extraction::job_extractor::extract_jobs;
use crate::llm_client::CompletionModel;
use crate::portfolio::{Portfolio, RetrievedLink, DEFAULT_TOP_K};
use crate::scrape::normalize::normalize;
use crate::scrape::{FetchError, PageFetcher};

const UNKNOWN_ROLE: &str = "Unknown Role";

/// One finished email, ready to hand back as a downloadable text file.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedEmail {
    /// 1-based position within this extraction batch.
    pub index: usize,
    pub role: String,
    pub filename: String,
    pub links: Vec<String>,
    pub body: String,
}

pub fn email_filename(index: usize) -> String {
    format!("cold_email_job_{index}.txt")
}

/// Turns literal `\n` escapes into newlines and trims the body.
pub fn finalize_body(raw: &str) -> String {
    raw.replace("\\n", "\n").trim().to_string()
}

/// Removes repeated links, keeping first-seen order.
pub fn dedupe_links(links: Vec<RetrievedLink>) -> Vec<RetrievedLink> {
    let mut seen = std::collections::HashSet::new();
    links
        .into_iter()
        .filter(|l| seen.insert(l.link.clone()))
        .collect()
}

/// Runs one full cycle for `url` and returns an email per extracted job.
pub async fn generate_emails(
    url: &str,
    style: &EmailStyleConfig,
    portfolio: &mut Portfolio,
    fetcher: &dyn PageFetcher,
    llm: &dyn CompletionModel,
) -> Result<Vec<GeneratedEmail>, AppError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AppError::Validation("Please enter a valid URL".to_string()));
    }

    // Step 1: Fetch and normalize
    let raw = fetcher.fetch(url).await?;
    let page_text = normalize(&raw);
    if page_text.is_empty() {
        return Err(FetchError::Empty.into());
    }
    info!("Normalized page text: {} chars", page_text.len());

    // Step 2: Ensure the portfolio index is populated
    portfolio.load_default().await?;

    // Step 3: Extract jobs
    let jobs = extract_jobs(&page_text, llm).await?;

    // Step 4: One email per job
    let mut emails = Vec::with_capacity(jobs.len());
    for (i, job) in jobs.iter().enumerate() {
        let index = i + 1;
        let links = dedupe_links(portfolio.query_or_empty(&job.skills, DEFAULT_TOP_K).await);
        info!(
            "Job {index}/{}: '{}' with {} portfolio link(s)",
            jobs.len(),
            job.role,
            links.len()
        );

        let body = compose_email(job, &links, style, llm).await?;

        emails.push(GeneratedEmail {
            index,
            role: if job.role.trim().is_empty() {
                UNKNOWN_ROLE.to_string()
            } else {
                job.role.clone()
            },
            filename: email_filename(index),
            links: links.into_iter().map(|l| l.link).collect(),
            body: finalize_body(&body),
        });
    }

    Ok(emails)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::llm_client::{CompletionRequest, LlmError};
    use crate::portfolio::embedding::HashingEmbedder;
    use crate::portfolio::store::LocalVectorStore;

    struct StaticPage(Result<String, ()>);

    #[async_trait]
    impl PageFetcher for StaticPage {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            self.0.clone().map_err(|_| FetchError::Status(503))
        }
    }

    /// Answers each call with the next queued reply and keeps the prompts.
    struct QueuedModel {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl QueuedModel {
        fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionModel for QueuedModel {
        async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(request.prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }

    fn portfolio(csv: &str) -> (Portfolio, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my_portfolio.csv");
        std::fs::write(&path, csv).unwrap();
        let portfolio = Portfolio::new(
            Arc::new(LocalVectorStore::in_memory()),
            Arc::new(HashingEmbedder),
            path,
        );
        (portfolio, dir)
    }

    fn style() -> EmailStyleConfig {
        EmailStyleConfig {
            sender_name: "Ada".to_string(),
            company_name: "Acme".to_string(),
            ..EmailStyleConfig::default()
        }
    }

    const PAGE: &str = "<html><body><h1>Careers</h1><p>Frontend Engineer: Build UIs with React</p></body></html>";

    #[test]
    fn test_email_filename_is_one_based_pattern() {
        assert_eq!(email_filename(1), "cold_email_job_1.txt");
        assert_eq!(email_filename(12), "cold_email_job_12.txt");
    }

    #[test]
    fn test_finalize_body_unescapes_and_trims() {
        assert_eq!(finalize_body("  Hello\\nWorld \n"), "Hello\nWorld");
    }

    #[test]
    fn test_dedupe_links_keeps_first_seen_order() {
        let links = ["b", "a", "b", "c", "a"]
            .iter()
            .map(|l| RetrievedLink {
                link: l.to_string(),
            })
            .collect();
        let deduped: Vec<String> = dedupe_links(links).into_iter().map(|l| l.link).collect();
        assert_eq!(deduped, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_end_to_end_embeds_retrieved_link() {
        let (mut portfolio, _dir) =
            portfolio("Techstack,Links\n\"React, Node.js\",github.com/x/react-app\n");
        let model = QueuedModel::new(vec![
            Ok(r#"{"role": "Frontend Engineer", "experience": "", "skills": ["React"], "description": "Build UIs"}"#.to_string()),
            Ok("Hello,\\nI build React apps.".to_string()),
        ]);

        let emails = generate_emails(
            "https://jobs.example.com/frontend",
            &style(),
            &mut portfolio,
            &StaticPage(Ok(PAGE.to_string())),
            &model,
        )
        .await
        .unwrap();

        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].index, 1);
        assert_eq!(emails[0].filename, "cold_email_job_1.txt");
        assert_eq!(emails[0].role, "Frontend Engineer");
        assert_eq!(emails[0].links, vec!["github.com/x/react-app"]);
        assert_eq!(emails[0].body, "Hello,\nI build React apps.");

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("Frontend Engineer: Build UIs with React"));
        assert!(!prompts[0].contains("<h1>"));
        assert!(prompts[1].contains("Portfolio links (if any): github.com/x/react-app"));
    }

    #[tokio::test]
    async fn test_one_email_per_job_in_order() {
        let (mut portfolio, _dir) = portfolio("Techstack,Links\nGo,https://go.dev/me\n");
        let model = QueuedModel::new(vec![
            Ok(r#"[{"role": "A", "skills": ["Go"]}, {"skills": []}]"#.to_string()),
            Ok("first".to_string()),
            Ok("second".to_string()),
        ]);

        let emails = generate_emails(
            "https://x.dev",
            &style(),
            &mut portfolio,
            &StaticPage(Ok("Jobs page".to_string())),
            &model,
        )
        .await
        .unwrap();

        assert_eq!(emails.len(), 2);
        assert_eq!(emails[1].filename, "cold_email_job_2.txt");
        assert_eq!(emails[1].role, "Unknown Role");
        assert!(emails[1].links.is_empty());
        assert_eq!(emails[1].body, "second");
    }

    #[tokio::test]
    async fn test_blank_url_is_validation_error() {
        let (mut portfolio, _dir) = portfolio("Techstack,Links\n");
        let model = QueuedModel::new(vec![]);
        let err = generate_emails("   ", &style(), &mut portfolio, &StaticPage(Ok(String::new())), &model)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_before_extraction() {
        let (mut portfolio, _dir) = portfolio("Techstack,Links\n");
        let model = QueuedModel::new(vec![]);
        let err = generate_emails("https://x.dev", &style(), &mut portfolio, &StaticPage(Err(())), &model)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Fetch(FetchError::Status(503))));
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_markup_only_page_is_fetch_error() {
        let (mut portfolio, _dir) = portfolio("Techstack,Links\n");
        let model = QueuedModel::new(vec![]);
        let err = generate_emails(
            "https://x.dev",
            &style(),
            &mut portfolio,
            &StaticPage(Ok("<script>var a = 1;</script>".to_string())),
            &model,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Fetch(FetchError::Empty)));
    }

    #[tokio::test]
    async fn test_extraction_parse_error_returns_no_emails() {
        let (mut portfolio, _dir) = portfolio("Techstack,Links\n");
        let model = QueuedModel::new(vec![Ok("Here are the jobs!".to_string())]);
        let err = generate_emails("https://x.dev", &style(), &mut portfolio, &StaticPage(Ok("Jobs".to_string())), &model)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExtractionParse(_)));
    }

    #[tokio::test]
    async fn test_model_failure_mid_batch_aborts() {
        let (mut portfolio, _dir) = portfolio("Techstack,Links\n");
        let model = QueuedModel::new(vec![
            Ok(r#"[{"role": "A"}, {"role": "B"}]"#.to_string()),
            Ok("first".to_string()),
            Err(LlmError::Api {
                status: 500,
                message: "boom".to_string(),
            }),
        ]);
        let err = generate_emails("https://x.dev", &style(), &mut portfolio, &StaticPage(Ok("Jobs".to_string())), &model)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Model(_)));
    }
}
