use crate::filter::resolver::variant_version;
use crate::models::document::{all_operations, content_variants};
use crate::models::extension::{get_date, X_SUNSET};
use crate::parser::load_document;
use crate::Result;
use chrono::NaiveDate;
use colored::Colorize;
use openapiv3::OpenAPI;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// An operation version scheduled for removal
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SunsetEntry {
    pub sunset: NaiveDate,
    pub path: String,
    pub http_method: String,
    pub operation_id: String,
    /// Version of the sunsetting variant, empty for operation-level sunsets
    pub version: String,
}

/// Every sunset in `[from, to]`, ordered by date
pub fn list_sunsets(doc: &OpenAPI, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Vec<SunsetEntry> {
    let in_range = |date: NaiveDate| from.map_or(true, |f| date >= f) && to.map_or(true, |t| date <= t);
    let mut entries = Vec::new();

    for (path, method, op) in all_operations(doc) {
        let entry = |sunset: NaiveDate, version: String| SunsetEntry {
            sunset,
            path: path.to_string(),
            http_method: method.to_string(),
            operation_id: op.operation_id.clone().unwrap_or_default(),
            version,
        };

        let mut found = false;
        for (content_type, media) in content_variants(op) {
            match get_date(&media.extensions, X_SUNSET) {
                Ok(Some(date)) => {
                    found = true;
                    if in_range(date) {
                        let version = variant_version(content_type).map(|v| v.to_string()).unwrap_or_default();
                        entries.push(entry(date, version));
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(path, method, error = %e, "Ignoring unreadable sunset"),
            }
        }
        if found {
            continue;
        }
        match get_date(&op.extensions, X_SUNSET) {
            Ok(Some(date)) if in_range(date) => entries.push(entry(date, String::new())),
            Ok(_) => {}
            Err(e) => warn!(path, method, error = %e, "Ignoring unreadable sunset"),
        }
    }

    entries.sort();
    entries.dedup();
    entries
}

pub fn run(spec: &Path, from: Option<NaiveDate>, to: Option<NaiveDate>, json: bool) -> Result<()> {
    let doc = load_document(spec)?;
    let entries = list_sunsets(&doc, from, to);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", "No sunsets found.".yellow());
        return Ok(());
    }
    println!("{}", "Scheduled sunsets:".green().bold());
    for entry in &entries {
        let version = if entry.version.is_empty() {
            String::new()
        } else {
            format!(" [{}]", entry.version)
        };
        println!(
            "   • {} {} {}{}",
            entry.sunset.to_string().yellow(),
            entry.http_method,
            entry.path,
            version.bright_black()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    const DOC: &str = r#"
openapi: 3.0.1
info: {title: t, version: '1'}
paths:
  /clusters:
    get:
      operationId: listClusters
      responses:
        "200":
          description: ok
          content:
            application/vnd.atlas.2023-01-01+json:
              x-sunset: "2024-06-01"
            application/vnd.atlas.2023-02-01+json: {}
  /teams:
    delete:
      operationId: deleteTeam
      x-sunset: "2023-12-01T00:00:00Z"
      responses:
        "204": {description: gone}
"#;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_lists_variant_and_operation_sunsets() {
        let doc = parse_document(DOC).unwrap();
        let entries = list_sunsets(&doc, None, None);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operation_id, "deleteTeam");
        assert_eq!(entries[0].sunset, date("2023-12-01"));
        assert_eq!(entries[0].version, "");
        assert_eq!(entries[1].version, "2023-01-01");
    }

    #[test]
    fn test_range_filter() {
        let doc = parse_document(DOC).unwrap();
        let entries = list_sunsets(&doc, Some(date("2024-01-01")), Some(date("2024-12-31")));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/clusters");
    }
}
