//! Change record files written by the external diff engine

use crate::models::ChangeRecord;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse a JSON array of change records; an empty document means no changes
pub fn parse_change_records(content: &str) -> Result<Vec<ChangeRecord>> {
    if content.trim().is_empty() || content.trim() == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(content).context("Failed to parse change records")
}

pub fn load_change_records(path: &Path) -> Result<Vec<ChangeRecord>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    parse_change_records(&content).with_context(|| format!("Invalid change records in {:?}", path))
}
