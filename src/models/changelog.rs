//! Persistent changelog graph
//!
//! `Entry(date) → PathEntry(uri, method) → VersionEntry(label) → Change`.
//! An entry holds at most one path per (uri, method) and a path at most one
//! version per label. The graph only grows between runs.

use super::config::ConfigurationError;
use super::version::StabilityLevel;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Public changelog file, hidden changes removed
pub const CHANGELOG_FILE: &str = "changelog.json";
/// Full changelog including hidden changes
pub const INTERNAL_CHANGELOG_FILE: &str = "internal/changelog-all.json";

/// Kind of change recorded for one path and version
///
/// When several changes land on the same path and version, the type with the
/// lowest priority number wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Release,
    Remove,
    Update,
    Deprecate,
}

impl ChangeType {
    pub fn priority(&self) -> u8 {
        match self {
            ChangeType::Release => 1,
            ChangeType::Remove => 2,
            ChangeType::Update => 3,
            ChangeType::Deprecate => 4,
        }
    }

    /// Pick between the current and a candidate type; ties keep `self`
    pub fn prefer(self, candidate: ChangeType) -> ChangeType {
        if candidate.priority() < self.priority() {
            candidate
        } else {
            self
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeType::Release => "release",
            ChangeType::Remove => "remove",
            ChangeType::Update => "update",
            ChangeType::Deprecate => "deprecate",
        };
        f.write_str(s)
    }
}

/// A single change line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub description: String,
    pub code: String,
    pub backward_compatible: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hide_from_changelog: bool,
}

/// Changes of one operation for one API version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub version: String,
    pub stability_level: StabilityLevel,
    pub change_type: ChangeType,
    pub changes: Vec<Change>,
}

impl VersionEntry {
    /// Add a change unless an identical one is already present
    pub fn add_change(&mut self, change: Change) -> bool {
        if self
            .changes
            .iter()
            .any(|c| c.code == change.code && c.description == change.description)
        {
            return false;
        }
        self.changes.push(change);
        true
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.changes.iter().any(|c| c.code == code)
    }
}

/// One operation in a changelog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathEntry {
    pub uri: String,
    pub http_method: String,
    #[serde(default)]
    pub operation_id: String,
    #[serde(default)]
    pub tag: String,
    pub versions: Vec<VersionEntry>,
}

impl PathEntry {
    /// Locate or create the version record, folding `change_type` into it
    pub fn version_mut(
        &mut self,
        label: &str,
        stability_level: StabilityLevel,
        change_type: ChangeType,
    ) -> &mut VersionEntry {
        let idx = match self.versions.iter().position(|v| v.version == label) {
            Some(idx) => {
                let existing = &mut self.versions[idx];
                existing.change_type = existing.change_type.prefer(change_type);
                idx
            }
            None => {
                self.versions.push(VersionEntry {
                    version: label.to_string(),
                    stability_level,
                    change_type,
                    changes: Vec::new(),
                });
                self.versions.len() - 1
            }
        };
        &mut self.versions[idx]
    }

    pub fn version(&self, label: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.version == label)
    }

    fn sort_key(&self) -> String {
        format!("{}{}", self.uri, self.http_method)
    }
}

/// All changes recorded on one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub date: NaiveDate,
    pub paths: Vec<PathEntry>,
}

impl Entry {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            paths: Vec::new(),
        }
    }

    /// Locate or create the path record for (uri, method); the method is matched case-insensitively
    pub fn path_mut(&mut self, uri: &str, http_method: &str, operation_id: &str, tag: &str) -> &mut PathEntry {
        let idx = match self
            .paths
            .iter()
            .position(|p| p.uri == uri && p.http_method.eq_ignore_ascii_case(http_method))
        {
            Some(idx) => {
                let existing = &mut self.paths[idx];
                if existing.operation_id.is_empty() {
                    existing.operation_id = operation_id.to_string();
                }
                if existing.tag.is_empty() {
                    existing.tag = tag.to_string();
                }
                idx
            }
            None => {
                self.paths.push(PathEntry {
                    uri: uri.to_string(),
                    http_method: http_method.to_uppercase(),
                    operation_id: operation_id.to_string(),
                    tag: tag.to_string(),
                    versions: Vec::new(),
                });
                self.paths.len() - 1
            }
        };
        &mut self.paths[idx]
    }

    pub fn path(&self, uri: &str, http_method: &str) -> Option<&PathEntry> {
        self.paths
            .iter()
            .find(|p| p.uri == uri && p.http_method.eq_ignore_ascii_case(http_method))
    }
}

/// The whole changelog, newest entry first once sorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Changelog {
    pub entries: Vec<Entry>,
}

impl Changelog {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, date: NaiveDate) -> Option<&Entry> {
        self.entries.iter().find(|e| e.date == date)
    }

    /// Locate or create the entry for `date`; new entries are prepended
    pub fn entry_mut(&mut self, date: NaiveDate) -> &mut Entry {
        match self.entries.iter().position(|e| e.date == date) {
            Some(idx) => &mut self.entries[idx],
            None => {
                self.entries.insert(0, Entry::new(date));
                &mut self.entries[0]
            }
        }
    }

    /// True when the change code is already recorded for this operation and
    /// version on `date`
    pub fn contains(&self, date: NaiveDate, uri: &str, http_method: &str, version: &str, code: &str) -> bool {
        self.entry(date)
            .and_then(|e| e.path(uri, http_method))
            .and_then(|p| p.version(version))
            .is_some_and(|v| v.has_code(code))
    }

    /// Dates descending, paths by `uri+method` ascending, versions by label
    /// descending
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| b.date.cmp(&a.date));
        for entry in &mut self.entries {
            entry.paths.sort_by_key(|p| p.sort_key());
            for path in &mut entry.paths {
                path.versions.sort_by(|a, b| b.version.cmp(&a.version));
            }
        }
    }

    /// Copy without hidden changes, pruning anything left empty
    pub fn public_view(&self) -> Changelog {
        let mut public = self.clone();
        for entry in &mut public.entries {
            for path in &mut entry.paths {
                for version in &mut path.versions {
                    version.changes.retain(|c| !c.hide_from_changelog);
                }
                path.versions.retain(|v| !v.changes.is_empty());
            }
            entry.paths.retain(|p| !p.versions.is_empty());
        }
        public.entries.retain(|e| !e.paths.is_empty());
        public
    }
}

/// Reads and writes a changelog directory
#[derive(Debug, Clone)]
pub struct ChangelogStore {
    dir: PathBuf,
}

impl ChangelogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the full history, preferring the internal file when present
    pub fn load(&self) -> Result<Changelog, ConfigurationError> {
        let internal = self.dir.join(INTERNAL_CHANGELOG_FILE);
        let path = if internal.exists() {
            internal
        } else {
            self.dir.join(CHANGELOG_FILE)
        };

        let content = ConfigurationError::read_required("changelog", &path)?;
        serde_json::from_str(&content).map_err(|e| ConfigurationError::malformed("changelog", &path, e))
    }

    /// Write the public view and the full changelog
    pub fn save(&self, changelog: &Changelog) -> anyhow::Result<()> {
        use anyhow::Context;

        let internal = self.dir.join(INTERNAL_CHANGELOG_FILE);
        if let Some(parent) = internal.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let full = serde_json::to_string_pretty(changelog)?;
        std::fs::write(&internal, full).with_context(|| format!("Failed to write {:?}", internal))?;

        let public = serde_json::to_string_pretty(&changelog.public_view())?;
        let public_path = self.dir.join(CHANGELOG_FILE);
        std::fs::write(&public_path, public)
            .with_context(|| format!("Failed to write {:?}", public_path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn change(code: &str, hidden: bool) -> Change {
        Change {
            description: format!("{} happened", code),
            code: code.to_string(),
            backward_compatible: true,
            hide_from_changelog: hidden,
        }
    }

    #[test]
    fn test_change_type_priority() {
        assert_eq!(ChangeType::Update.prefer(ChangeType::Release), ChangeType::Release);
        assert_eq!(ChangeType::Remove.prefer(ChangeType::Deprecate), ChangeType::Remove);
        assert_eq!(ChangeType::Update.prefer(ChangeType::Update), ChangeType::Update);
    }

    #[test]
    fn test_path_and_version_are_unique() {
        let mut entry = Entry::new(date("2023-06-15"));
        entry
            .path_mut("/clusters", "POST", "createCluster", "Clusters")
            .version_mut("2023-01-01", StabilityLevel::Stable, ChangeType::Update)
            .add_change(change("a", false));
        entry
            .path_mut("/clusters", "POST", "createCluster", "Clusters")
            .version_mut("2023-01-01", StabilityLevel::Stable, ChangeType::Release)
            .add_change(change("b", false));

        assert_eq!(entry.paths.len(), 1);
        assert_eq!(entry.paths[0].versions.len(), 1);
        let version = &entry.paths[0].versions[0];
        assert_eq!(version.change_type, ChangeType::Release);
        assert_eq!(version.changes.len(), 2);
        assert!(!entry.paths[0].versions[0].clone().add_change(change("a", false)));
    }

    #[test]
    fn test_method_case_shares_path_entry() {
        let mut entry = Entry::new(date("2023-06-15"));
        entry
            .path_mut("/clusters", "get", "listClusters", "Clusters")
            .version_mut("2023-01-01", StabilityLevel::Stable, ChangeType::Update)
            .add_change(change("a", false));
        entry
            .path_mut("/clusters", "GET", "listClusters", "Clusters")
            .version_mut("2023-01-01", StabilityLevel::Stable, ChangeType::Update)
            .add_change(change("b", false));

        assert_eq!(entry.paths.len(), 1);
        assert_eq!(entry.paths[0].http_method, "GET");
        assert!(entry.path("/clusters", "get").is_some());
        assert_eq!(entry.paths[0].versions[0].changes.len(), 2);
    }

    #[test]
    fn test_sort_order() {
        let mut changelog = Changelog::new(vec![Entry::new(date("2023-01-01")), Entry::new(date("2023-03-01"))]);
        {
            let entry = changelog.entry_mut(date("2023-01-01"));
            for (uri, method) in [("/b", "GET"), ("/a", "POST"), ("/a", "GET")] {
                let path = entry.path_mut(uri, method, "", "");
                for label in ["2023-01-01", "2023-02-01"] {
                    path.version_mut(label, StabilityLevel::Stable, ChangeType::Update);
                }
            }
        }
        changelog.sort();

        assert_eq!(changelog.entries[0].date, date("2023-03-01"));
        let entry = &changelog.entries[1];
        let keys: Vec<_> = entry.paths.iter().map(|p| format!("{} {}", p.http_method, p.uri)).collect();
        assert_eq!(keys, vec!["GET /a", "POST /a", "GET /b"]);
        assert_eq!(entry.paths[0].versions[0].version, "2023-02-01");
    }

    #[test]
    fn test_public_view_drops_hidden() {
        let mut changelog = Changelog::default();
        let entry = changelog.entry_mut(date("2023-06-15"));
        entry
            .path_mut("/hidden", "GET", "", "")
            .version_mut("2023-01-01", StabilityLevel::Stable, ChangeType::Update)
            .add_change(change("x", true));
        entry
            .path_mut("/visible", "GET", "", "")
            .version_mut("2023-01-01", StabilityLevel::Stable, ChangeType::Update)
            .add_change(change("y", false));

        let public = changelog.public_view();
        assert_eq!(public.entries[0].paths.len(), 1);
        assert_eq!(public.entries[0].paths[0].uri, "/visible");
        assert_eq!(changelog.entries[0].paths.len(), 2);
    }

    #[test]
    fn test_field_names() {
        let mut changelog = Changelog::default();
        changelog
            .entry_mut(date("2023-06-15"))
            .path_mut("/clusters", "POST", "createCluster", "Clusters")
            .version_mut("2023-01-01", StabilityLevel::Stable, ChangeType::Update)
            .add_change(change("request-property-added", false));

        let json = serde_json::to_value(&changelog).unwrap();
        let path = &json[0]["paths"][0];
        assert_eq!(json[0]["date"], "2023-06-15");
        assert_eq!(path["httpMethod"], "POST");
        assert_eq!(path["operationId"], "createCluster");
        assert_eq!(path["versions"][0]["stabilityLevel"], "stable");
        assert_eq!(path["versions"][0]["changeType"], "update");
        assert_eq!(path["versions"][0]["changes"][0]["backwardCompatible"], true);
        assert!(path["versions"][0]["changes"][0].get("hideFromChangelog").is_none());
    }

    #[test]
    fn test_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = ChangelogStore::new(dir.path());
        assert!(matches!(store.load(), Err(ConfigurationError::Missing { .. })));

        let mut changelog = Changelog::default();
        changelog
            .entry_mut(date("2023-06-15"))
            .path_mut("/a", "GET", "", "")
            .version_mut("2023-01-01", StabilityLevel::Stable, ChangeType::Update)
            .add_change(change("hidden-one", true));
        store.save(&changelog).unwrap();

        assert_eq!(store.load().unwrap(), changelog);
        let public: Changelog =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(CHANGELOG_FILE)).unwrap()).unwrap();
        assert!(public.is_empty());
    }
}
