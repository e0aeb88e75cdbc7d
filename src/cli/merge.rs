use crate::merge::merge_all;
use crate::models::{OasplitConfig, OutputFormat};
use crate::parser::{load_document, save_document};
use crate::Result;
use colored::Colorize;
use std::env;
use std::path::{Path, PathBuf};

fn format_for(path: &Path, fallback: OutputFormat) -> OutputFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => OutputFormat::Json,
        Some("yaml") | Some("yml") => OutputFormat::Yaml,
        _ => fallback,
    }
}

pub fn run(base: &Path, externals: &[PathBuf], output: &Path) -> Result<()> {
    let config = OasplitConfig::load(&env::current_dir()?)?;

    println!("{}", format!("🔗 Merging {} document(s) into {:?}...", externals.len(), base).cyan());
    let base_doc = load_document(base)?;
    let external_docs = externals
        .iter()
        .map(|path| load_document(path))
        .collect::<Result<Vec<_>>>()?;

    let merged = merge_all(&base_doc, &external_docs)?;
    save_document(&merged, output, format_for(output, config.format))?;

    println!("{}", format!("✅ Merged document written to {}", output.display()).green().bold());
    Ok(())
}
