//! Changelog synthesis
//!
//! Raw change records from the diff engine go through exemption matching and
//! squashing before the merger files them into the changelog. Sunset removals
//! and manual notes are synthesized from the specifications themselves.

pub mod diff;
pub mod exemptions;
pub mod merger;
pub mod squash;
pub mod synthetic;
pub mod tags;

use crate::models::{Changelog, Metadata, Version};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use openapiv3::OpenAPI;
use std::collections::BTreeMap;
use tracing::{info, info_span, warn};

pub use diff::{DiffEngine, JsonChangesSource, Snapshot};
pub use exemptions::{export_descriptions, ExemptionMatcher};
pub use merger::{ChangelogMerger, VersionDiff};
pub use squash::{squash, SquashError};
pub use synthetic::{DatedChange, RunWindow};
pub use tags::TagMapping;

/// Everything one changelog run reads, loaded before anything is merged
#[derive(Debug, Clone)]
pub struct ChangelogInputs {
    pub history: Changelog,
    /// Run date of the previous run, `None` on the first run
    pub previous_run: Option<NaiveDate>,
    pub run_date: NaiveDate,
    /// Split documents of the previous run, per version
    pub base_specs: BTreeMap<Version, OpenAPI>,
    /// Split documents of this run, per version
    pub revision_specs: BTreeMap<Version, OpenAPI>,
    pub exemptions: ExemptionMatcher,
}

/// Result of a changelog run
#[derive(Debug, Clone)]
pub struct ChangelogOutput {
    pub changelog: Changelog,
    pub metadata: Metadata,
}

fn tag_mapping(inputs: &ChangelogInputs) -> TagMapping {
    let mut tags = TagMapping::new();
    for doc in inputs.revision_specs.values().chain(inputs.base_specs.values()) {
        tags.extend_from(doc);
    }
    tags
}

/// Build the next changelog
///
/// Versions present in both runs are diffed against themselves. A version
/// new in this run is diffed against the previous stable version of this run.
pub fn create(inputs: &ChangelogInputs, engine: &dyn DiffEngine) -> Result<ChangelogOutput> {
    let _span = info_span!("changelog", run_date = %inputs.run_date).entered();

    if let Some(previous) = inputs.previous_run {
        if previous > inputs.run_date {
            anyhow::bail!(
                "Run date {} is before the previous run date {}",
                inputs.run_date,
                previous
            );
        }
    }

    let metadata = Metadata::new(inputs.run_date, inputs.revision_specs.keys().cloned().collect());
    let mut merger = ChangelogMerger::new(&inputs.history, inputs.run_date, tag_mapping(inputs));

    for (version, revision_doc) in &inputs.revision_specs {
        let revision = Snapshot::new(version, revision_doc);

        let base = match inputs.base_specs.get(version) {
            Some(base_doc) => Snapshot::new(version, base_doc),
            None => match metadata.previous_stable(version) {
                Some(previous) => match inputs.revision_specs.get(previous) {
                    Some(doc) => Snapshot::new(previous, doc),
                    None => continue,
                },
                None => {
                    info!(version = %version, "No earlier version to compare with");
                    continue;
                }
            },
        };

        let diff = VersionDiff::new(base, revision);
        let records = engine
            .diff(&diff.base, &diff.revision)
            .with_context(|| format!("Failed to diff {} against {}", diff.base.version, version))?;
        merger.merge_diff(&diff, records, &inputs.exemptions)?;
    }

    match inputs.previous_run {
        Some(previous) => {
            let window = RunWindow::new(previous, inputs.run_date);
            let mut dated = Vec::new();
            for (version, doc) in inputs.base_specs.iter().chain(inputs.revision_specs.iter()) {
                dated.extend(synthetic::sunset_removals(&inputs.history, window, version, doc));
            }
            for (version, doc) in &inputs.revision_specs {
                dated.extend(synthetic::manual_entries(window, version, doc));
            }
            let added = merger.add_dated(&dated);
            info!(added, "Added sunset removals and manual notes");
        }
        None => warn!("No previous run date, skipping sunset removals and manual notes"),
    }

    Ok(ChangelogOutput {
        changelog: merger.finish(),
        metadata,
    })
}
