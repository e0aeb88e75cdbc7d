use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use oasplit::models::OutputFormat;
use oasplit::Result;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oasplit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Per-version OpenAPI snapshots and API changelogs", long_about = None)]
struct Cli {
    /// Log filtering decisions (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write one filtered document per version for an environment
    Split {
        /// Multi-version OpenAPI document
        #[arg(short, long)]
        spec: PathBuf,

        /// Target environment
        #[arg(short, long)]
        env: String,

        /// Versions to produce (repeatable); all versions visible in the environment by default
        #[arg(long = "version", value_name = "VERSION")]
        versions: Vec<String>,

        /// Output directory (defaults to output_dir in oasplit.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// List the API versions of a document
    Versions {
        #[arg(short, long)]
        spec: PathBuf,

        /// Only versions visible in this environment
        #[arg(short, long)]
        env: Option<String>,

        /// Hide preview and upcoming versions
        #[arg(long)]
        stable_only: bool,

        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },

    /// List operations scheduled for removal
    Sunset {
        #[arg(short, long)]
        spec: PathBuf,

        /// Earliest sunset date to include
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Latest sunset date to include
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },

    /// Merge external documents into a base document
    Merge {
        #[arg(short, long)]
        base: PathBuf,

        /// Documents to merge in (repeatable)
        #[arg(short, long = "external", required = true)]
        externals: Vec<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Changelog operations
    #[command(subcommand)]
    Changelog(oasplit::cli::changelog::ChangelogCommands),

    /// Breaking change exemption operations
    #[command(subcommand)]
    Exemptions(oasplit::cli::exemptions::ExemptionsCommands),

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "oasplit=debug" } else { "oasplit=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Split {
            spec,
            env,
            versions,
            output,
            format,
        } => {
            oasplit::cli::split::run(oasplit::cli::split::SplitOptions {
                spec,
                env,
                versions,
                output,
                format,
            })?;
        }

        Commands::Versions {
            spec,
            env,
            stable_only,
            json,
        } => {
            oasplit::cli::versions::run(&spec, env.as_deref(), stable_only, json)?;
        }

        Commands::Sunset { spec, from, to, json } => {
            oasplit::cli::sunset::run(&spec, from, to, json)?;
        }

        Commands::Merge {
            base,
            externals,
            output,
        } => {
            oasplit::cli::merge::run(&base, &externals, &output)?;
        }

        Commands::Changelog(cmd) => {
            oasplit::cli::changelog::run(cmd)?;
        }

        Commands::Exemptions(cmd) => {
            oasplit::cli::exemptions::run(cmd)?;
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "oasplit", &mut io::stdout());
        }
    }

    Ok(())
}
