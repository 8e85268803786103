// All LLM prompt constants for job extraction.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

/// System prompt for job extraction. Built from the shared JSON-only fragment.
pub fn extraction_system() -> String {
    format!(
        "You extract job postings from text scraped off a careers page. {JSON_ONLY_SYSTEM}"
    )
}

/// Extraction prompt template. Replace `{page_data}` before sending.
pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"### SCRAPED TEXT FROM WEBSITE:
{page_data}

### INSTRUCTION:
The scraped text is from the careers page of a website.
Extract every job posting it contains and return them as valid JSON.
Each posting is an object with these keys:
  "role": the job title,
  "experience": the experience required, as written,
  "skills": an array of skill strings,
  "description": a short description of the position.
Use an array of objects when there is more than one posting.
Use an empty string or empty array for anything the text does not state. Do NOT invent values.
Only return the JSON (NO PREAMBLE).
"#;
