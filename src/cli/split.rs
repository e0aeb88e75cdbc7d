use crate::filter::{collect_versions, split};
use crate::models::{OasplitConfig, OutputFormat, Version};
use crate::parser::{load_document, save_document};
use crate::Result;
use anyhow::Context;
use colored::Colorize;
use std::env;
use std::path::{Path, PathBuf};

/// What to split and where the results go
#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub spec: PathBuf,
    pub env: String,
    /// Requested versions; every version visible in `env` when empty
    pub versions: Vec<String>,
    pub output: Option<PathBuf>,
    pub format: Option<OutputFormat>,
}

pub fn run(options: SplitOptions) -> Result<()> {
    let project_root = env::current_dir()?;

    println!("{}", format!("✂️  Splitting {:?} for {}...", options.spec, options.env).cyan());
    let written = split_to_dir(&project_root, &options)?;

    for path in &written {
        println!("   • {}", path.display());
    }
    println!("{}", format!("✅ Wrote {} document(s)", written.len()).green().bold());
    Ok(())
}

/// Write one filtered document per version, returning the written paths
pub fn split_to_dir(project_root: &Path, options: &SplitOptions) -> Result<Vec<PathBuf>> {
    let mut config = OasplitConfig::load(project_root)?;
    if let Some(format) = options.format {
        config.format = format;
    }
    config.validate_env(&options.env)?;

    let base = load_document(&options.spec)?;

    let versions: Vec<Version> = if options.versions.is_empty() {
        collect_versions(&base, Some(&options.env)).into_iter().collect()
    } else {
        options
            .versions
            .iter()
            .map(|v| Version::parse(v).with_context(|| format!("Invalid --version '{}'", v)))
            .collect::<Result<_>>()?
    };
    if versions.is_empty() {
        anyhow::bail!("No versions found in {:?} for environment '{}'", options.spec, options.env);
    }

    let output_dir = project_root.join(options.output.as_ref().unwrap_or(&config.output_dir));
    let mut written = Vec::with_capacity(versions.len());
    for version in &versions {
        let doc = split(&base, version, &options.env)
            .with_context(|| format!("Failed to filter version {}", version))?;
        let path = output_dir.join(config.split_file_name(version.label()));
        save_document(&doc, &path, config.format)?;
        written.push(path);
    }
    Ok(written)
}
