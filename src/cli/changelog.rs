//! Changelog CLI commands

use crate::changelog::{create, ChangelogInputs, ExemptionMatcher, JsonChangesSource};
use crate::models::{ChangelogStore, Metadata, OasplitConfig};
use crate::parser::load_split_documents;
use crate::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use colored::Colorize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum ChangelogCommands {
    /// Add the changes between two runs to the changelog
    Create {
        /// Previous run: changelog, metadata.json and split documents
        #[arg(long)]
        base: PathBuf,

        /// Split documents of this run
        #[arg(long)]
        revision: PathBuf,

        /// Change files from the diff engine (<base>_<revision>.json)
        #[arg(long)]
        changes: PathBuf,

        /// Exemption list (defaults to exemptions_path in oasplit.toml)
        #[arg(long)]
        exemptions: Option<PathBuf>,

        /// Date of this run (defaults to today)
        #[arg(long)]
        run_date: Option<NaiveDate>,

        /// Where to write the changelog (defaults to changelog_dir in oasplit.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Arguments of `changelog create`
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub base: PathBuf,
    pub revision: PathBuf,
    pub changes: PathBuf,
    pub exemptions: Option<PathBuf>,
    pub run_date: NaiveDate,
    pub output: Option<PathBuf>,
}

pub fn run(cmd: ChangelogCommands) -> Result<()> {
    let project_root = env::current_dir()?;

    match cmd {
        ChangelogCommands::Create {
            base,
            revision,
            changes,
            exemptions,
            run_date,
            output,
        } => {
            let options = CreateOptions {
                base,
                revision,
                changes,
                exemptions,
                run_date: run_date.unwrap_or_else(|| chrono::Local::now().date_naive()),
                output,
            };
            println!("{}", format!("📜 Creating changelog for {}...", options.run_date).cyan());
            let output_dir = create_changelog(&project_root, &options)?;
            println!(
                "{}",
                format!("✅ Changelog written to {}", output_dir.display()).green().bold()
            );
        }
    }
    Ok(())
}

/// Run the whole changelog pipeline, returning the output directory
///
/// Every input is read before anything is written.
pub fn create_changelog(project_root: &Path, options: &CreateOptions) -> Result<PathBuf> {
    let config = OasplitConfig::load(project_root)?;

    let history = ChangelogStore::new(&options.base).load()?;
    let previous = Metadata::load(&options.base)?;

    let exemptions = match options.exemptions.as_ref().or(config.exemptions_path.as_ref()) {
        Some(path) => ExemptionMatcher::load(&project_root.join(path), options.run_date, false)?,
        None => ExemptionMatcher::default(),
    };

    let inputs = ChangelogInputs {
        history,
        previous_run: Some(previous.run_date),
        run_date: options.run_date,
        base_specs: load_split_documents(&options.base, &config.file_prefix)?,
        revision_specs: load_split_documents(&options.revision, &config.file_prefix)?,
        exemptions,
    };
    if inputs.revision_specs.is_empty() {
        anyhow::bail!("No split documents found in {:?}", options.revision);
    }

    let engine = JsonChangesSource::new(&options.changes);
    let output = create(&inputs, &engine)?;

    let output_dir = project_root.join(options.output.as_ref().unwrap_or(&config.changelog_dir));
    ChangelogStore::new(&output_dir).save(&output.changelog)?;
    output.metadata.save(&output_dir)?;
    Ok(output_dir)
}
