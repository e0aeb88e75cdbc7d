use crate::filter::collect_versions;
use crate::models::Version;
use crate::parser::load_document;
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// Versions of a document, oldest first
pub fn list_versions(spec: &Path, env: Option<&str>, stable_only: bool) -> Result<Vec<Version>> {
    let doc = load_document(spec)?;
    Ok(collect_versions(&doc, env)
        .into_iter()
        .filter(|v| !stable_only || v.is_stable())
        .collect())
}

pub fn run(spec: &Path, env: Option<&str>, stable_only: bool, json: bool) -> Result<()> {
    let versions = list_versions(spec, env, stable_only)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&versions)?);
        return Ok(());
    }

    if versions.is_empty() {
        println!("{}", "No versions found.".yellow());
        return Ok(());
    }
    println!("{}", "API versions:".green().bold());
    for version in &versions {
        println!("   • {} {}", version, format!("({})", version.stability()).bright_black());
    }
    Ok(())
}
