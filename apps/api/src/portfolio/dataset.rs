//! Portfolio dataset: CSV rows of `Techstack` → `Links`.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub const TECHSTACK_COLUMN: &str = "Techstack";
pub const LINKS_COLUMN: &str = "Links";

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("portfolio CSV must contain 'Techstack' and 'Links' columns (missing: {})", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("portfolio CSV is malformed: {0}")]
    Malformed(#[from] csv::Error),
}

/// One portfolio row. At least one of the two fields is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioEntry {
    pub techstack: String,
    pub link: String,
}

/// Parsed dataset plus the count of blank rows that were dropped.
#[derive(Debug, Clone, Default)]
pub struct PortfolioDataset {
    pub entries: Vec<PortfolioEntry>,
    pub skipped_blank: usize,
}

impl PortfolioDataset {
    /// Parses CSV bytes, validating the header before reading any rows.
    pub fn from_csv(bytes: &[u8]) -> Result<Self, SchemaError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers = reader.headers()?.clone();
        let techstack_idx = headers.iter().position(|h| h == TECHSTACK_COLUMN);
        let links_idx = headers.iter().position(|h| h == LINKS_COLUMN);

        let (techstack_idx, links_idx) = match (techstack_idx, links_idx) {
            (Some(t), Some(l)) => (t, l),
            (t, l) => {
                let mut missing = Vec::new();
                if t.is_none() {
                    missing.push(TECHSTACK_COLUMN.to_string());
                }
                if l.is_none() {
                    missing.push(LINKS_COLUMN.to_string());
                }
                return Err(SchemaError::MissingColumns { missing });
            }
        };

        let mut dataset = PortfolioDataset::default();
        for record in reader.records() {
            let record = record?;
            let techstack = record.get(techstack_idx).unwrap_or_default().to_string();
            let link = record.get(links_idx).unwrap_or_default().to_string();
            if techstack.is_empty() && link.is_empty() {
                dataset.skipped_blank += 1;
                continue;
            }
            dataset.entries.push(PortfolioEntry { techstack, link });
        }

        Ok(dataset)
    }

    /// Reads the default dataset from disk. A missing file is an empty dataset.
    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        match std::fs::read(path) {
            Ok(bytes) => {
                let dataset = Self::from_csv(&bytes)?;
                info!(
                    "Read {} portfolio rows from {}",
                    dataset.entries.len(),
                    path.display()
                );
                Ok(dataset)
            }
            Err(e) => {
                warn!(
                    "Default portfolio {} unreadable ({e}); starting empty",
                    path.display()
                );
                Ok(Self::default())
            }
        }
    }
}
