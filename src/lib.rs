// oasplit - per-version OpenAPI snapshots and API changelogs
// Splits a multi-version OpenAPI document by version and environment, and
// keeps a durable changelog of how the API evolves between runs

pub mod changelog;
pub mod cli;
pub mod filter;
pub mod merge;
pub mod models;
pub mod parser;

pub use anyhow::{Context, Result};
pub use colored::Colorize;

// Re-export commonly used types
pub use filter::{split, FilterContext, Pipeline};
pub use models::{ChangeRecord, Changelog, OasplitConfig, Version};
