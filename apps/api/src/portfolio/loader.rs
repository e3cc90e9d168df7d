//! Portfolio dataset loader: reads the `Techstack,Links` CSV that seeds the store.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

/// One row of the backing dataset: a tech-stack descriptor and the portfolio link for it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PortfolioRecord {
    #[serde(rename = "Techstack", alias = "tech_stack")]
    pub tech_stack: String,
    #[serde(rename = "Links", alias = "link")]
    pub link: String,
}

#[cfg(test)]
impl PortfolioRecord {
    pub fn new(tech_stack: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            tech_stack: tech_stack.into(),
            link: link.into(),
        }
    }
}

/// Reads the portfolio CSV at `path`. A missing or unreadable file is an error.
pub fn load_portfolio_csv(path: impl AsRef<Path>) -> Result<Vec<PortfolioRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open portfolio dataset {}", path.display()))?;
    let records = parse_portfolio_csv(file)
        .with_context(|| format!("Failed to parse portfolio dataset {}", path.display()))?;

    info!(
        "Loaded {} portfolio records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Parses CSV rows, skipping rows whose tech stack or link is blank.
pub fn parse_portfolio_csv<R: Read>(reader: R) -> Result<Vec<PortfolioRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (row, result) in csv_reader.deserialize::<PortfolioRecord>().enumerate() {
        let record = result.with_context(|| format!("Invalid portfolio row {}", row + 1))?;
        if record.tech_stack.is_empty() || record.link.is_empty() {
            warn!("Skipping portfolio row {} with a blank column", row + 1);
            continue;
        }
        records.push(record);
    }
    Ok(records)
}
