use super::Summary;
use anyhow::{Context, Result};

/// Converter between a `Summary` and its persisted JSON form.
pub struct SummaryConverter;

impl SummaryConverter {
    /// Pretty-printed JSON array, two-space indented.
    pub fn to_json(summary: &Summary) -> Result<String> {
        serde_json::to_string_pretty(summary).context("Failed to serialize metric summary")
    }

    pub fn from_json(json: &str) -> Result<Summary> {
        serde_json::from_str(json).context("Failed to parse metric summary")
    }
}
