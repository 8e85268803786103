//! Email style options chosen by the caller.
//!
//! Tone and email type are closed sets: an unrecognized value is rejected at
//! deserialization. Length is cosmetic and fails open to `Medium`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    Formal,
    Friendly,
    Persuasive,
    Neutral,
}

impl Tone {
    pub fn label(&self) -> &'static str {
        match self {
            Tone::Formal => "Formal",
            Tone::Friendly => "Friendly",
            Tone::Persuasive => "Persuasive",
            Tone::Neutral => "Neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<Value>")]
pub enum EmailLength {
    Short,
    #[default]
    Medium,
    Detailed,
}

impl EmailLength {
    /// Unknown labels fall back to `Medium`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Short" => EmailLength::Short,
            "Detailed" => EmailLength::Detailed,
            _ => EmailLength::Medium,
        }
    }

    /// Sentence-count guidance handed to the model.
    pub fn guidance(&self) -> &'static str {
        match self {
            EmailLength::Short => "2-4 sentences",
            EmailLength::Medium => "4-8 sentences",
            EmailLength::Detailed => "8-15 sentences",
        }
    }
}

/// Anything but a recognized label, including null or a non-string, is `Medium`.
impl From<Option<Value>> for EmailLength {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(Value::String(label)) => Self::from_label(&label),
            _ => EmailLength::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmailType {
    #[default]
    #[serde(rename = "Job Application")]
    JobApplication,
    Collaboration,
    #[serde(rename = "Partnership/Pitch", alias = "Partnership / Pitch")]
    PartnershipPitch,
    Introductory,
}

impl EmailType {
    pub fn label(&self) -> &'static str {
        match self {
            EmailType::JobApplication => "Job Application",
            EmailType::Collaboration => "Collaboration",
            EmailType::PartnershipPitch => "Partnership/Pitch",
            EmailType::Introductory => "Introductory",
        }
    }
}

/// Who is writing and how the email should read. Supplied per request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailStyleConfig {
    pub sender_name: String,
    pub company_name: String,
    /// Empty means no title clause.
    #[serde(default)]
    pub sender_title: String,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub length: EmailLength,
    #[serde(default)]
    pub email_type: EmailType,
}
