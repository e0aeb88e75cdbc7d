//! Folding change records into the persistent changelog
//!
//! The merger works on a deep copy of the history. Every record lands in the
//! entry for its date, under the path for its operation and the version it
//! belongs to. The change type of a path and version is the highest priority
//! type of everything folded into it.

use super::diff::Snapshot;
use super::exemptions::ExemptionMatcher;
use super::squash::{squash, SquashError};
use super::synthetic::{operation_sunset, DatedChange};
use super::tags::TagMapping;
use crate::models::change_record::{ENDPOINT_ADDED, ENDPOINT_DEPRECATED, ENDPOINT_REACTIVATED, ENDPOINT_REMOVED};
use crate::models::document::find_operation;
use crate::models::{Change, ChangeRecord, ChangeType, Changelog, Severity, Version};
use chrono::NaiveDate;
use tracing::{debug, info};

/// The two snapshots a batch of change records was computed from
#[derive(Debug, Clone, Copy)]
pub struct VersionDiff<'a> {
    pub base: Snapshot<'a>,
    pub revision: Snapshot<'a>,
}

impl<'a> VersionDiff<'a> {
    pub fn new(base: Snapshot<'a>, revision: Snapshot<'a>) -> Self {
        Self { base, revision }
    }

    /// A newly released version compared with the one before it
    pub fn is_between_versions(&self) -> bool {
        self.base.version != self.revision.version
    }

    pub fn default_change_type(&self) -> ChangeType {
        if self.is_between_versions() {
            ChangeType::Release
        } else {
            ChangeType::Update
        }
    }
}

/// Change type a record contributes, given the default of its batch
pub fn change_type_for(id: &str, default: ChangeType) -> ChangeType {
    match id {
        ENDPOINT_ADDED => ChangeType::Release,
        ENDPOINT_REMOVED => ChangeType::Remove,
        ENDPOINT_DEPRECATED => ChangeType::Deprecate,
        _ => default,
    }
}

/// Split out `endpoint-reactivated` records of a between-versions diff
///
/// Such a record means the base version was superseded by the revision, so
/// it becomes an `endpoint-deprecated` record for the base version carrying
/// the base variant's sunset date. Same-version diffs are returned untouched.
pub fn rewrite_reactivated(diff: &VersionDiff<'_>, records: Vec<ChangeRecord>) -> (Vec<ChangeRecord>, Vec<ChangeRecord>) {
    if !diff.is_between_versions() {
        return (records, Vec::new());
    }

    let (reactivated, rest): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| r.id == ENDPOINT_REACTIVATED);
    let deprecations = reactivated
        .into_iter()
        .map(|record| {
            let sunset = find_operation(diff.base.doc, &record.path, &record.operation)
                .and_then(|op| operation_sunset(op, diff.base.version));
            let text = match sunset {
                Some(date) => format!(
                    "endpoint deprecated in favor of version '{}' and scheduled for removal on '{}'",
                    diff.revision.version, date
                ),
                None => format!("endpoint deprecated in favor of version '{}'", diff.revision.version),
            };
            let mut deprecated = ChangeRecord::new(
                ENDPOINT_DEPRECATED,
                text,
                Severity::Info,
                record.operation,
                record.operation_id,
                record.path,
            );
            deprecated.hide_from_changelog = record.hide_from_changelog;
            deprecated
        })
        .collect();
    (rest, deprecations)
}

/// Builds the next changelog from the history and this run's changes
#[derive(Debug, Clone)]
pub struct ChangelogMerger {
    changelog: Changelog,
    run_date: NaiveDate,
    tags: TagMapping,
}

impl ChangelogMerger {
    pub fn new(history: &Changelog, run_date: NaiveDate, tags: TagMapping) -> Self {
        Self {
            changelog: history.clone(),
            run_date,
            tags,
        }
    }

    pub fn run_date(&self) -> NaiveDate {
        self.run_date
    }

    pub fn changelog(&self) -> &Changelog {
        &self.changelog
    }

    /// File one record; false when an identical change was already there
    pub fn record(&mut self, date: NaiveDate, version: &Version, change_type: ChangeType, record: &ChangeRecord) -> bool {
        let tag = self.tags.get(&record.path, &record.operation).to_string();
        self.changelog
            .entry_mut(date)
            .path_mut(&record.path, &record.operation, &record.operation_id, &tag)
            .version_mut(version.label(), version.stability(), change_type)
            .add_change(Change {
                description: record.text.clone(),
                code: record.id.clone(),
                backward_compatible: record.is_backward_compatible(),
                hide_from_changelog: record.hide_from_changelog,
            })
    }

    /// Fold one diff's records in under the run date
    ///
    /// Exemptions are matched against the raw records and again after
    /// squashing. Returns the number of changes added.
    pub fn merge_diff(
        &mut self,
        diff: &VersionDiff<'_>,
        records: Vec<ChangeRecord>,
        exemptions: &ExemptionMatcher,
    ) -> Result<usize, SquashError> {
        let (mut records, mut deprecations) = rewrite_reactivated(diff, records);

        exemptions.apply(&mut records);
        let mut records = squash(records)?;
        exemptions.apply(&mut records);
        exemptions.apply(&mut deprecations);

        let default = diff.default_change_type();
        let date = self.run_date;
        let mut added = 0;
        for record in &records {
            let change_type = change_type_for(&record.id, default);
            if self.record(date, diff.revision.version, change_type, record) {
                added += 1;
            }
        }
        for record in &deprecations {
            if self.record(date, diff.base.version, ChangeType::Deprecate, record) {
                added += 1;
            }
        }

        info!(
            base = %diff.base.version,
            revision = %diff.revision.version,
            added,
            "Merged changes"
        );
        Ok(added)
    }

    /// Fold in sunset removals and manual notes
    pub fn add_dated(&mut self, changes: &[DatedChange]) -> usize {
        let mut added = 0;
        for change in changes {
            if self.record(change.date, &change.version, change.change_type, &change.record) {
                added += 1;
            } else {
                debug!(id = %change.record.id, path = %change.record.path, "Change already recorded");
            }
        }
        added
    }

    /// Sorted changelog
    pub fn finish(mut self) -> Changelog {
        self.changelog.sort();
        self.changelog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entry, StabilityLevel};
    use crate::parser::parse_document;
    use openapiv3::OpenAPI;

    const PATH: &str = "/api/atlas/v2/groups/{groupId}/clusters";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn v(label: &str) -> Version {
        Version::parse(label).unwrap()
    }

    fn doc() -> OpenAPI {
        parse_document(&format!(
            r#"
openapi: 3.0.1
info: {{title: t, version: '1'}}
paths:
  {}:
    get:
      operationId: listClusters
      tags: [Clusters]
      responses:
        "200":
          description: ok
          content:
            application/vnd.atlas.2023-01-01+json:
              x-sunset: "2025-06-01"
"#,
            PATH
        ))
        .unwrap()
    }

    fn history() -> Changelog {
        let mut entry = Entry::new(date("2023-05-01"));
        entry
            .path_mut(PATH, "GET", "listClusters", "Clusters")
            .version_mut("2023-01-01", StabilityLevel::Stable, ChangeType::Release)
            .add_change(Change {
                description: "endpoint added".to_string(),
                code: ENDPOINT_ADDED.to_string(),
                backward_compatible: true,
                hide_from_changelog: false,
            });
        Changelog::new(vec![entry])
    }

    fn record(id: &str, text: &str, level: Severity, method: &str, op_id: &str) -> ChangeRecord {
        ChangeRecord::new(id, text, level, method, op_id, PATH)
    }

    #[test]
    fn test_change_type_for() {
        assert_eq!(change_type_for(ENDPOINT_ADDED, ChangeType::Update), ChangeType::Release);
        assert_eq!(change_type_for(ENDPOINT_REMOVED, ChangeType::Update), ChangeType::Remove);
        assert_eq!(change_type_for("request-property-added", ChangeType::Update), ChangeType::Update);
    }

    #[test]
    fn test_same_version_change_creates_new_entry() {
        let doc = doc();
        let version = v("2023-01-01");
        let diff = VersionDiff::new(Snapshot::new(&version, &doc), Snapshot::new(&version, &doc));
        let mut merger = ChangelogMerger::new(&history(), date("2023-06-15"), TagMapping::from_document(&doc));

        let records = vec![record(
            "request-property-added",
            "added the new optional request property 'replicationSpecs'",
            Severity::Info,
            "POST",
            "createCluster",
        )];
        assert_eq!(merger.merge_diff(&diff, records, &ExemptionMatcher::default()).unwrap(), 1);

        let changelog = merger.finish();
        assert_eq!(changelog.len(), 2);
        let newest = &changelog.entries[0];
        assert_eq!(newest.date, date("2023-06-15"));
        assert_eq!(newest.paths.len(), 1);
        assert_eq!(newest.paths[0].operation_id, "createCluster");
        assert_eq!(newest.paths[0].versions.len(), 1);
        assert_eq!(newest.paths[0].versions[0].change_type, ChangeType::Update);
        assert!(newest.paths[0].versions[0].changes[0].backward_compatible);
    }

    #[test]
    fn test_history_not_mutated() {
        let history = history();
        let mut merger = ChangelogMerger::new(&history, date("2023-06-15"), TagMapping::new());
        merger.record(
            date("2023-05-01"),
            &v("2023-01-01"),
            ChangeType::Update,
            &record("request-property-removed", "removed 'a'", Severity::Error, "GET", "listClusters"),
        );
        assert_eq!(history.entries[0].paths[0].versions[0].changes.len(), 1);
        assert_eq!(merger.changelog().entries[0].paths[0].versions[0].changes.len(), 2);
    }

    #[test]
    fn test_priority_keeps_lowest_number() {
        let doc = doc();
        let (base, revision) = (v("2023-01-01"), v("2023-02-01"));
        let diff = VersionDiff::new(Snapshot::new(&base, &doc), Snapshot::new(&revision, &doc));
        let mut merger = ChangelogMerger::new(&Changelog::default(), date("2023-06-15"), TagMapping::new());

        let records = vec![
            record("request-property-removed", "removed the request property 'a'", Severity::Error, "GET", "listClusters"),
            record(ENDPOINT_REMOVED, "endpoint removed", Severity::Error, "GET", "listClusters"),
        ];
        merger.merge_diff(&diff, records, &ExemptionMatcher::default()).unwrap();
        let changelog = merger.finish();
        let version = changelog.entries[0].paths[0].version("2023-02-01").unwrap();
        assert_eq!(version.change_type, ChangeType::Release);
        assert_eq!(version.changes.len(), 2);
    }

    #[test]
    fn test_endpoint_added_forces_release_on_same_version() {
        let doc = doc();
        let version = v("2023-01-01");
        let diff = VersionDiff::new(Snapshot::new(&version, &doc), Snapshot::new(&version, &doc));
        let mut merger = ChangelogMerger::new(&Changelog::default(), date("2023-06-15"), TagMapping::new());
        let records = vec![
            record("request-property-added", "added the new optional request property 'a'", Severity::Info, "GET", "listClusters"),
            record(ENDPOINT_ADDED, "endpoint added", Severity::Info, "GET", "listClusters"),
        ];
        merger.merge_diff(&diff, records, &ExemptionMatcher::default()).unwrap();
        let changelog = merger.finish();
        assert_eq!(changelog.entries[0].paths[0].versions[0].change_type, ChangeType::Release);
    }

    #[test]
    fn test_reactivated_becomes_deprecation_of_base() {
        let doc = doc();
        let (base, revision) = (v("2023-01-01"), v("2023-02-01"));
        let diff = VersionDiff::new(Snapshot::new(&base, &doc), Snapshot::new(&revision, &doc));
        let mut merger = ChangelogMerger::new(&Changelog::default(), date("2023-06-15"), TagMapping::from_document(&doc));

        let records = vec![record(ENDPOINT_REACTIVATED, "endpoint reactivated", Severity::Info, "GET", "listClusters")];
        merger.merge_diff(&diff, records, &ExemptionMatcher::default()).unwrap();
        let changelog = merger.finish();

        let path = &changelog.entries[0].paths[0];
        assert_eq!(path.tag, "Clusters");
        assert!(path.version("2023-02-01").is_none());
        let deprecated = path.version("2023-01-01").unwrap();
        assert_eq!(deprecated.change_type, ChangeType::Deprecate);
        assert_eq!(deprecated.changes[0].code, ENDPOINT_DEPRECATED);
        assert!(deprecated.changes[0].description.contains("2025-06-01"));
    }

    #[test]
    fn test_same_version_keeps_reactivated() {
        let doc = doc();
        let version = v("2023-01-01");
        let diff = VersionDiff::new(Snapshot::new(&version, &doc), Snapshot::new(&version, &doc));
        let records = vec![record(ENDPOINT_REACTIVATED, "endpoint reactivated", Severity::Info, "GET", "listClusters")];
        let (rest, deprecations) = rewrite_reactivated(&diff, records);
        assert_eq!(rest.len(), 1);
        assert!(deprecations.is_empty());
    }

    #[test]
    fn test_duplicate_dated_change_skipped() {
        let change = DatedChange {
            date: date("2023-05-01"),
            version: v("2023-01-01"),
            change_type: ChangeType::Release,
            record: record(ENDPOINT_ADDED, "endpoint added", Severity::Info, "GET", "listClusters"),
        };
        let mut merger = ChangelogMerger::new(&history(), date("2023-06-15"), TagMapping::new());
        assert_eq!(merger.add_dated(&[change]), 0);
        assert_eq!(merger.finish(), history());
    }
}
