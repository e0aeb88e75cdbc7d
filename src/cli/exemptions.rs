//! Exemption CLI commands

use crate::changelog::{export_descriptions, ExemptionMatcher};
use crate::models::OasplitConfig;
use crate::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use colored::Colorize;
use std::env;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ExemptionsCommands {
    /// Write the exemption descriptions as an ignore file for the diff engine
    Export {
        /// Exemption list (defaults to exemptions_path in oasplit.toml)
        #[arg(long)]
        exemptions: Option<PathBuf>,

        /// Include expired exemptions
        #[arg(long)]
        ignore_expiration: bool,

        /// Date expiry is checked against (defaults to today)
        #[arg(long)]
        run_date: Option<NaiveDate>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run(cmd: ExemptionsCommands) -> Result<()> {
    let project_root = env::current_dir()?;
    let config = OasplitConfig::load(&project_root)?;

    match cmd {
        ExemptionsCommands::Export {
            exemptions,
            ignore_expiration,
            run_date,
            output,
        } => {
            let Some(path) = exemptions.or(config.exemptions_path) else {
                anyhow::bail!("No exemption list given and exemptions_path is not configured");
            };
            let run_date = run_date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let matcher = ExemptionMatcher::load(&project_root.join(path), run_date, ignore_expiration)?;
            let content = export_descriptions(matcher.exemptions());

            match output {
                Some(output) => {
                    std::fs::write(&output, content)?;
                    eprintln!(
                        "{}",
                        format!("✅ Exported {} exemption(s) to {}", matcher.len(), output.display()).green()
                    );
                }
                None => print!("{}", content),
            }
        }
    }
    Ok(())
}
