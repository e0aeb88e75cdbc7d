//! OpenAPI document loading and writing
//!
//! Documents are accepted as JSON or YAML. The format is picked from the file
//! extension when there is one, otherwise sniffed from the first character.

use crate::models::{OutputFormat, Version};
use anyhow::{Context, Result};
use openapiv3::OpenAPI;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Strip a UTF-8 BOM and normalize line endings
pub fn normalize_content(content: &str) -> String {
    let s = content.strip_prefix('\u{FEFF}').unwrap_or(content);
    s.replace("\r\n", "\n").replace('\r', "\n")
}

/// Parse a document from JSON or YAML text
pub fn parse_document(content: &str) -> Result<OpenAPI> {
    let normalized = normalize_content(content);
    if normalized.trim_start().starts_with('{') {
        serde_json::from_str(&normalized).context("Failed to parse OpenAPI JSON")
    } else {
        serde_yaml::from_str(&normalized).context("Failed to parse OpenAPI YAML")
    }
}

/// Load a document from disk
pub fn load_document(path: &Path) -> Result<OpenAPI> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let normalized = normalize_content(&content);

    let doc = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&normalized).context("Failed to parse OpenAPI JSON"),
        Some("yaml") | Some("yml") => serde_yaml::from_str(&normalized).context("Failed to parse OpenAPI YAML"),
        _ => parse_document(&normalized),
    };
    doc.with_context(|| format!("Invalid OpenAPI document {:?}", path))
}

pub fn render_document(doc: &OpenAPI, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI JSON"),
        OutputFormat::Yaml => serde_yaml::to_string(doc).context("Failed to serialize OpenAPI YAML"),
    }
}

/// Write a document, creating parent directories as needed
pub fn save_document(doc: &OpenAPI, path: &Path, format: OutputFormat) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let content = render_document(doc, format)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))
}

/// Version encoded in a split document file name, `<prefix>-<version>.<ext>`
pub fn split_file_version(file_name: &str, prefix: &str) -> Option<Version> {
    let stem = file_name
        .strip_suffix(".json")
        .or_else(|| file_name.strip_suffix(".yaml"))
        .or_else(|| file_name.strip_suffix(".yml"))?;
    let label = stem.strip_prefix(prefix)?.strip_prefix('-')?;
    Version::parse(label).ok()
}

/// Load every split document found directly under `dir`, keyed by version
pub fn load_split_documents(dir: &Path, prefix: &str) -> Result<BTreeMap<Version, OpenAPI>> {
    if !dir.is_dir() {
        anyhow::bail!("Directory not found: {:?}", dir);
    }

    let mut docs = BTreeMap::new();
    for entry in walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let file_name = entry.file_name().to_string_lossy();
        let Some(version) = split_file_version(&file_name, prefix) else {
            continue;
        };
        debug!(version = %version, path = ?entry.path(), "Loading split document");
        docs.insert(version, load_document(entry.path())?);
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = "\u{FEFF}openapi: 3.0.1\r\ninfo:\r\n  title: Test\r\n  version: '2.0'\r\npaths: {}\r\n";

    #[test]
    fn test_parse_yaml_with_bom() {
        let doc = parse_document(MINIMAL).unwrap();
        assert_eq!(doc.info.title, "Test");
    }

    #[test]
    fn test_parse_json() {
        let doc = parse_document(r#"{"openapi": "3.0.1", "info": {"title": "J", "version": "1"}, "paths": {}}"#).unwrap();
        assert_eq!(doc.info.title, "J");
    }

    #[test]
    fn test_save_and_load_both_formats() {
        let dir = TempDir::new().unwrap();
        let doc = parse_document(MINIMAL).unwrap();

        for (name, format) in [("out/a.json", OutputFormat::Json), ("out/a.yaml", OutputFormat::Yaml)] {
            let path = dir.path().join(name);
            save_document(&doc, &path, format).unwrap();
            assert_eq!(load_document(&path).unwrap(), doc);
        }
    }

    #[test]
    fn test_load_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "openapi: [").unwrap();
        let err = load_document(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.yaml"));
    }

    #[test]
    fn test_split_file_version() {
        assert_eq!(
            split_file_version("openapi-2023-01-01.json", "openapi"),
            Some(Version::parse("2023-01-01").unwrap())
        );
        assert_eq!(
            split_file_version("openapi-preview.yaml", "openapi"),
            Some(Version::parse("preview").unwrap())
        );
        assert_eq!(split_file_version("openapi.json", "openapi"), None);
        assert_eq!(split_file_version("changelog.json", "openapi"), None);
        assert_eq!(split_file_version("openapi-2023-01-01.txt", "openapi"), None);
    }

    #[test]
    fn test_load_split_documents() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("openapi-2023-02-01.yaml"), MINIMAL).unwrap();
        std::fs::write(dir.path().join("openapi-2023-01-01.yaml"), MINIMAL).unwrap();
        std::fs::write(dir.path().join("metadata.json"), "{}").unwrap();

        let docs = load_split_documents(dir.path(), "openapi").unwrap();
        let labels: Vec<_> = docs.keys().map(|v| v.label().to_string()).collect();
        assert_eq!(labels, vec!["2023-01-01", "2023-02-01"]);
    }
}
