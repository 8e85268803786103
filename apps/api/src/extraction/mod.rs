// Job extraction: careers-page text in, structured job records out.
// All LLM calls go through llm_client, no direct provider calls here.

pub mod job_extractor;
pub mod prompts;
