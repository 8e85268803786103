//! Job Extractor: turns normalized careers-page text into structured job records.
//!
//! The model is sampled at temperature 0 and must answer with JSON: one job
//! object or an array of them. Anything else is an `ExtractionParseError`;
//! no partial list is ever returned.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::extraction::prompts::{extraction_system, EXTRACTION_PROMPT_TEMPLATE};
use crate::llm_client::prompts::render_template;
use crate::llm_client::{strip_json_fences, CompletionModel, CompletionRequest};

/// The model produced something other than job JSON.
#[derive(Debug, Error)]
#[error("Content too large or malformed for structured parsing: {detail}")]
pub struct ExtractionParseError {
    pub detail: String,
}

impl ExtractionParseError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// One job posting. Fields the model left out are empty, never invented.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// Extracts job records from normalized page text with a single model call.
pub async fn extract_jobs(
    normalized_text: &str,
    llm: &dyn CompletionModel,
) -> Result<Vec<JobRecord>, AppError> {
    let prompt = render_template(EXTRACTION_PROMPT_TEMPLATE, &[("page_data", normalized_text)]);
    let system = extraction_system();

    let raw = llm
        .complete(&CompletionRequest {
            system: &system,
            prompt: &prompt,
            temperature: Some(0.0),
        })
        .await?;
    debug!("Extraction response: {} bytes", raw.len());

    let jobs = parse_jobs(&raw)?;
    info!("Extracted {} job(s) from page text", jobs.len());
    Ok(jobs)
}

/// Strict parse of the model's answer. A single object becomes a one-element list.
pub fn parse_jobs(raw: &str) -> Result<Vec<JobRecord>, ExtractionParseError> {
    let value: Value = serde_json::from_str(strip_json_fences(raw))
        .map_err(|e| ExtractionParseError::new(format!("response is not valid JSON ({e})")))?;

    match value {
        Value::Object(_) => Ok(vec![job_from_value(&value)?]),
        Value::Array(items) => items.iter().map(job_from_value).collect(),
        other => Err(ExtractionParseError::new(format!(
            "expected a job object or array, got {}",
            json_kind(&other)
        ))),
    }
}

fn job_from_value(value: &Value) -> Result<JobRecord, ExtractionParseError> {
    let Value::Object(fields) = value else {
        return Err(ExtractionParseError::new(format!(
            "expected each job to be an object, got {}",
            json_kind(value)
        )));
    };
    let text = |key: &str| fields.get(key).map(scalar_text).unwrap_or_default();

    Ok(JobRecord {
        role: text("role"),
        experience: text("experience"),
        skills: fields.get("skills").map(skill_list).unwrap_or_default(),
        description: text("description"),
    })
}

/// Strings verbatim; null as empty; other values as their JSON text.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A single skill string is a one-element list.
fn skill_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(scalar_text)
            .filter(|s| !s.trim().is_empty())
            .collect(),
        Value::Null => Vec::new(),
        other => {
            let skill = scalar_text(other);
            if skill.trim().is_empty() {
                Vec::new()
            } else {
                vec![skill]
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm_client::LlmError;

    /// Replays a canned completion and records what it was asked.
    struct ScriptedModel {
        reply: Result<String, u16>,
        seen: Mutex<Vec<(String, Option<f32>)>>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                reply: Err(status),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionModel for ScriptedModel {
        async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.prompt.to_string(), request.temperature));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(LlmError::Api {
                    status: *status,
                    message: "quota exceeded".to_string(),
                }),
            }
        }
    }

    #[test]
    fn test_single_object_wrapped_into_one_element() {
        let jobs = parse_jobs(
            r#"{"role": "SRE", "experience": "3+ years", "skills": ["Go", "Kubernetes"], "description": "Keep it up"}"#,
        )
        .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].role, "SRE");
        assert_eq!(jobs[0].skills, vec!["Go", "Kubernetes"]);
    }

    #[test]
    fn test_array_length_preserved() {
        let jobs = parse_jobs(
            r#"[{"role": "A"}, {"role": "B"}, {"role": "C", "skills": []}]"#,
        )
        .unwrap();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[2].role, "C");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let jobs = parse_jobs(r#"{"role": "Data Engineer"}"#).unwrap();
        assert_eq!(
            jobs[0],
            JobRecord {
                role: "Data Engineer".to_string(),
                ..JobRecord::default()
            }
        );
    }

    #[test]
    fn test_skills_string_becomes_single_element() {
        let jobs = parse_jobs(r#"{"role": "Dev", "skills": "Rust"}"#).unwrap();
        assert_eq!(jobs[0].skills, vec!["Rust"]);
    }

    #[test]
    fn test_null_fields_are_empty() {
        let jobs = parse_jobs(r#"{"role": null, "skills": null, "experience": null}"#).unwrap();
        assert_eq!(jobs[0], JobRecord::default());
    }

    #[test]
    fn test_numeric_experience_rendered_as_text() {
        let jobs = parse_jobs(r#"{"role": "Dev", "experience": 5}"#).unwrap();
        assert_eq!(jobs[0].experience, "5");
    }

    #[test]
    fn test_fenced_json_accepted() {
        let jobs = parse_jobs("```json\n[{\"role\": \"QA\"}]\n```").unwrap();
        assert_eq!(jobs[0].role, "QA");
    }

    #[test]
    fn test_prose_is_parse_error() {
        let err = parse_jobs("Sure! Here are the jobs I found: a Rust engineer.").unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Content too large or malformed for structured parsing"));
    }

    #[test]
    fn test_truncated_json_is_parse_error() {
        assert!(parse_jobs(r#"[{"role": "A"}, {"role": "#).is_err());
    }

    #[test]
    fn test_scalar_top_level_is_parse_error() {
        assert!(parse_jobs("42").is_err());
        assert!(parse_jobs(r#""just a string""#).is_err());
    }

    #[test]
    fn test_non_object_array_element_rejects_whole_batch() {
        let err = parse_jobs(r#"[{"role": "A"}, "B"]"#).unwrap_err();
        assert!(err.detail.contains("a string"));
    }

    #[tokio::test]
    async fn test_extract_jobs_uses_zero_temperature_and_embeds_text() {
        let model = ScriptedModel::replying(r#"[{"role": "ML Engineer"}]"#);
        let jobs = extract_jobs("We are hiring an ML Engineer", &model).await.unwrap();
        assert_eq!(jobs[0].role, "ML Engineer");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.contains("We are hiring an ML Engineer"));
        assert_eq!(seen[0].1, Some(0.0));
    }

    #[tokio::test]
    async fn test_extract_jobs_malformed_output_is_extraction_error() {
        let model = ScriptedModel::replying("I could not find any jobs.");
        let err = extract_jobs("text", &model).await.unwrap_err();
        assert!(matches!(err, AppError::ExtractionParse(_)));
    }

    #[tokio::test]
    async fn test_extract_jobs_model_failure_is_model_error() {
        let model = ScriptedModel::failing(429);
        let err = extract_jobs("text", &model).await.unwrap_err();
        assert!(matches!(err, AppError::Model(LlmError::Api { status: 429, .. })));
    }
}
