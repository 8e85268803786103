// All LLM prompt constants for email composition.

use crate::llm_client::prompts::BODY_ONLY_SYSTEM;

/// Links clause used when no retrieved link has a value.
pub const NO_LINKS_CLAUSE: &str = "no portfolio links provided";

pub fn composition_system() -> String {
    format!("You write concise, professional cold outreach emails. {BODY_ONLY_SYSTEM}")
}

/// Composition prompt template. Every `{placeholder}` is filled before sending.
pub const EMAIL_PROMPT_TEMPLATE: &str = r#"### JOB ROLE:
{job_role}

### JOB DESCRIPTION:
{job_description}

### CONTEXT:
You are {sender_desc}.
Company: {company_name}.
Email Type: {email_type}.
Desired Tone: {tone}.
Desired Length: {length_guidance}.
Portfolio links (if any): {link_list}

### INSTRUCTION:
Write a cold email tailored to the job role and description above.
- Start directly with the email content; no greeting preamble or explanation of what you are writing.
- Keep it professional and aligned with the desired tone.
- Make it suitable for sending to a hiring manager or recruiter.
- Mention the relevant portfolio links naturally where appropriate.
- Output only the finished email body, with no wrapper text before or after it.

### EMAIL (NO PREAMBLE):
"#;
