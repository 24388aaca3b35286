//! Already-structured UI requirement files:
//!
//! ```yaml
//! feature: "Cloud.ru Price Calculator"
//! requirements:
//!   - id: REQ_MAIN_PAGE_DISPLAY
//!     block: BLOCK_1_START_PAGE
//!     title: Main page shows the product catalog
//!     priority: CRITICAL
//! ```
//!
//! Free text goes through
//! [`GenerationClient::requirements_from_text`](crate::llm::GenerationClient::requirements_from_text)
//! instead.

use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::UiRequirementsDocument;

pub fn parse_yaml(text: &str) -> Result<UiRequirementsDocument> {
    let doc: UiRequirementsDocument = serde_yaml::from_str(text)
        .map_err(|e| Error::RequirementsParse(format!("invalid requirements file: {}", e)))?;
    info!(
        feature = %doc.feature,
        requirements = doc.requirements.len(),
        "Loaded structured UI requirements"
    );
    Ok(doc)
}

pub fn parse_file(path: &Path) -> Result<UiRequirementsDocument> {
    let text = std::fs::read_to_string(path)?;
    parse_yaml(&text)
}
