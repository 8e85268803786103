// Email composition: job record + portfolio links + style → cold email body.
// All LLM calls go through llm_client, no direct provider calls here.

pub mod email;
pub mod prompts;
pub mod style;
