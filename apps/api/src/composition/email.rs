//! Email Composer: one job, its retrieved links, and a style in; one email body out.
//!
//! The model's text is returned verbatim. Trimming and cleanup belong to the
//! caller, and a failed model call propagates rather than being retried here.

use tracing::info;

use crate::composition::prompts::{composition_system, EMAIL_PROMPT_TEMPLATE, NO_LINKS_CLAUSE};
use crate::composition::style::EmailStyleConfig;
use crate::extraction::job_extractor::JobRecord;
use crate::llm_client::prompts::render_template;
use crate::llm_client::{CompletionModel, CompletionRequest, LlmError};
use crate::portfolio::RetrievedLink;

/// Comma-joined non-empty links, or the fixed no-links clause.
pub fn render_links_clause(links: &[RetrievedLink]) -> String {
    let values: Vec<&str> = links
        .iter()
        .map(|l| l.link.trim())
        .filter(|l| !l.is_empty())
        .collect();
    if values.is_empty() {
        NO_LINKS_CLAUSE.to_string()
    } else {
        values.join(", ")
    }
}

/// "name, title at company", or "name at company" when no title is given.
pub fn render_sender_clause(style: &EmailStyleConfig) -> String {
    let title = style.sender_title.trim();
    if title.is_empty() {
        format!("{} at {}", style.sender_name, style.company_name)
    } else {
        format!("{}, {} at {}", style.sender_name, title, style.company_name)
    }
}

pub fn build_email_prompt(
    job: &JobRecord,
    links: &[RetrievedLink],
    style: &EmailStyleConfig,
) -> String {
    let sender_desc = render_sender_clause(style);
    let link_list = render_links_clause(links);
    render_template(
        EMAIL_PROMPT_TEMPLATE,
        &[
            ("job_role", job.role.as_str()),
            ("job_description", job.description.as_str()),
            ("sender_desc", sender_desc.as_str()),
            ("company_name", style.company_name.as_str()),
            ("email_type", style.email_type.label()),
            ("tone", style.tone.label()),
            ("length_guidance", style.length.guidance()),
            ("link_list", link_list.as_str()),
        ],
    )
}

/// Composes one email body with a single model call at default sampling.
pub async fn compose_email(
    job: &JobRecord,
    links: &[RetrievedLink],
    style: &EmailStyleConfig,
    llm: &dyn CompletionModel,
) -> Result<String, LlmError> {
    let prompt = build_email_prompt(job, links, style);
    let system = composition_system();
    let body = llm
        .complete(&CompletionRequest {
            system: &system,
            prompt: &prompt,
            temperature: None,
        })
        .await?;
    info!("Composed email for role '{}' ({} chars)", job.role, body.len());
    Ok(body)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::composition::style::{EmailLength, EmailType, Tone};

    struct EchoModel {
        prompts: Mutex<Vec<String>>,
        temperatures: Mutex<Vec<Option<f32>>>,
    }

    impl EchoModel {
        fn new() -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                temperatures: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionModel for EchoModel {
        async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(request.prompt.to_string());
            self.temperatures.lock().unwrap().push(request.temperature);
            Ok("  Dear hiring team,\nI build UIs.  \n".to_string())
        }
    }

    struct DownModel;

    #[async_trait]
    impl CompletionModel for DownModel {
        async fn complete(&self, _request: &CompletionRequest<'_>) -> Result<String, LlmError> {
            Err(LlmError::EmptyContent)
        }
    }

    fn link(value: &str) -> RetrievedLink {
        RetrievedLink {
            link: value.to_string(),
        }
    }

    fn style() -> EmailStyleConfig {
        EmailStyleConfig {
            sender_name: "Ada".to_string(),
            company_name: "Acme".to_string(),
            sender_title: "BDE".to_string(),
            tone: Tone::Friendly,
            length: EmailLength::Short,
            email_type: EmailType::Collaboration,
        }
    }

    fn frontend_job() -> JobRecord {
        JobRecord {
            role: "Frontend Engineer".to_string(),
            description: "Build UIs".to_string(),
            ..JobRecord::default()
        }
    }

    #[test]
    fn test_links_joined_with_comma() {
        assert_eq!(
            render_links_clause(&[link("a.dev"), link("b.dev")]),
            "a.dev, b.dev"
        );
    }

    #[test]
    fn test_empty_link_values_skipped() {
        assert_eq!(
            render_links_clause(&[link(""), link("a.dev"), link("  ")]),
            "a.dev"
        );
    }

    #[test]
    fn test_no_links_uses_fixed_clause() {
        assert_eq!(render_links_clause(&[]), NO_LINKS_CLAUSE);
    }

    #[test]
    fn test_only_empty_links_uses_fixed_clause() {
        assert_eq!(
            render_links_clause(&[link(""), link(""), link("")]),
            "no portfolio links provided"
        );
    }

    #[test]
    fn test_sender_clause_with_title() {
        assert_eq!(render_sender_clause(&style()), "Ada, BDE at Acme");
    }

    #[test]
    fn test_sender_clause_without_title_has_no_dangling_separator() {
        let mut s = style();
        s.sender_title = "   ".to_string();
        assert_eq!(render_sender_clause(&s), "Ada at Acme");
    }

    #[test]
    fn test_prompt_embeds_every_field() {
        let prompt = build_email_prompt(&frontend_job(), &[link("github.com/x/react-app")], &style());
        assert!(prompt.contains("Frontend Engineer"));
        assert!(prompt.contains("Build UIs"));
        assert!(prompt.contains("You are Ada, BDE at Acme."));
        assert!(prompt.contains("Company: Acme."));
        assert!(prompt.contains("Email Type: Collaboration."));
        assert!(prompt.contains("Desired Tone: Friendly."));
        assert!(prompt.contains("Desired Length: 2-4 sentences."));
        assert!(prompt.contains("Portfolio links (if any): github.com/x/react-app"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_prompt_uses_no_links_clause() {
        let prompt = build_email_prompt(&frontend_job(), &[], &style());
        assert!(prompt.contains("Portfolio links (if any): no portfolio links provided"));
    }

    #[test]
    fn test_description_braces_are_not_expanded() {
        let job = JobRecord {
            role: "Dev".to_string(),
            description: "Use {tone} templates".to_string(),
            ..JobRecord::default()
        };
        let prompt = build_email_prompt(&job, &[], &style());
        assert!(prompt.contains("Use {tone} templates"));
    }

    #[tokio::test]
    async fn test_compose_returns_model_text_verbatim() {
        let model = EchoModel::new();
        let body = compose_email(&frontend_job(), &[link("github.com/x/react-app")], &style(), &model)
            .await
            .unwrap();
        assert_eq!(body, "  Dear hiring team,\nI build UIs.  \n");
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
        assert_eq!(model.temperatures.lock().unwrap()[0], None);
    }

    #[tokio::test]
    async fn test_compose_propagates_model_failure() {
        let err = compose_email(&frontend_job(), &[], &style(), &DownModel)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }
}
