//! Suppression of change records from the public changelog
//!
//! Hidden records stay in the internal changelog; only the public view drops
//! them.

use crate::models::{load_exemptions, ChangeRecord, ConfigurationError, Exemption};
use chrono::NaiveDate;
use std::path::Path;
use tracing::debug;

/// Identifiers of purely mechanical changes, never shown publicly
pub const ALWAYS_HIDDEN: &[&str] = &[
    "response-property-became-read-only",
    "request-property-became-write-only",
    "response-write-only-property-removed",
];

/// Matches change records against the exemption list
#[derive(Debug, Clone, Default)]
pub struct ExemptionMatcher {
    exemptions: Vec<Exemption>,
}

impl ExemptionMatcher {
    /// Keep the exemptions still active on `run_date`, or all of them with
    /// `ignore_expiration`
    pub fn new(exemptions: Vec<Exemption>, run_date: NaiveDate, ignore_expiration: bool) -> Self {
        let total = exemptions.len();
        let exemptions: Vec<Exemption> = exemptions
            .into_iter()
            .filter(|e| ignore_expiration || e.is_active(run_date))
            .collect();
        debug!(total, active = exemptions.len(), "Loaded exemptions");
        Self { exemptions }
    }

    pub fn load(path: &Path, run_date: NaiveDate, ignore_expiration: bool) -> Result<Self, ConfigurationError> {
        Ok(Self::new(load_exemptions(path)?, run_date, ignore_expiration))
    }

    pub fn exemptions(&self) -> &[Exemption] {
        &self.exemptions
    }

    pub fn len(&self) -> usize {
        self.exemptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exemptions.is_empty()
    }

    /// All three of path, identifier and rendered record must appear in the
    /// exemption description
    pub fn matches(exemption: &Exemption, record: &ChangeRecord) -> bool {
        let description = exemption.breaking_change_description.as_str();
        description.contains(&record.path)
            && description.contains(&record.id)
            && description.contains(&record.rendered())
    }

    pub fn find(&self, record: &ChangeRecord) -> Option<&Exemption> {
        self.exemptions.iter().find(|e| Self::matches(e, record))
    }

    pub fn is_exempt(&self, record: &ChangeRecord) -> bool {
        self.find(record).is_some()
    }

    /// Whether the record must be kept out of the public changelog
    pub fn should_hide(&self, record: &ChangeRecord) -> bool {
        if ALWAYS_HIDDEN.contains(&record.id.as_str()) {
            return true;
        }
        self.find(record).is_some_and(|e| e.hide_from_changelog)
    }

    /// Set the hide flag on matching records; returns how many were newly hidden
    pub fn apply(&self, records: &mut [ChangeRecord]) -> usize {
        let mut hidden = 0;
        for record in records.iter_mut().filter(|r| !r.hide_from_changelog) {
            if self.should_hide(record) {
                debug!(id = %record.id, path = %record.path, "Hiding change from public changelog");
                record.hide_from_changelog = true;
                hidden += 1;
            }
        }
        hidden
    }
}

/// The ignore file handed to the diff engine, one description per line
pub fn export_descriptions(exemptions: &[Exemption]) -> String {
    let mut out = String::new();
    for exemption in exemptions {
        out.push_str(exemption.breaking_change_description.trim());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn record() -> ChangeRecord {
        ChangeRecord::new(
            "response-property-enum-value-removed",
            "removed the 'M0' enum value from the 'instanceSize' response property for the response status '200'",
            Severity::Error,
            "GET",
            "getCluster",
            "/api/atlas/v2/groups/{groupId}/clusters/{clusterName}",
        )
    }

    fn exemption(description: impl Into<String>, until: &str, hide: bool) -> Exemption {
        Exemption {
            breaking_change_description: description.into(),
            exempt_until: NaiveDate::parse_from_str(until, "%Y-%m-%d").unwrap(),
            reason: "accepted".to_string(),
            hide_from_changelog: hide,
        }
    }

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_full_description_matches() {
        let e = exemption(record().rendered(), "2024-12-31", true);
        assert!(ExemptionMatcher::matches(&e, &record()));
    }

    #[test]
    fn test_all_three_conditions_required() {
        let rendered = record().rendered();

        let mut other_path = record();
        other_path.path = "/api/atlas/v2/groups/{groupId}/teams".to_string();
        let e = exemption(&rendered, "2024-12-31", true);
        assert!(!ExemptionMatcher::matches(&e, &other_path));

        let mut other_id = record();
        other_id.id = "response-property-enum-value-added".to_string();
        assert!(!ExemptionMatcher::matches(&e, &other_id));

        let e = exemption(
            format!("GET {} response-property-enum-value-removed", record().path),
            "2024-12-31",
            true,
        );
        assert!(!ExemptionMatcher::matches(&e, &record()));
    }

    #[test]
    fn test_expired_exemptions_ignored() {
        let exemptions = vec![exemption(record().rendered(), "2024-02-29", true)];
        let matcher = ExemptionMatcher::new(exemptions.clone(), run_date(), false);
        assert!(matcher.is_empty());
        assert!(!matcher.is_exempt(&record()));

        let matcher = ExemptionMatcher::new(exemptions, run_date(), true);
        assert!(matcher.is_exempt(&record()));
    }

    #[test]
    fn test_expiry_day_still_active() {
        let matcher = ExemptionMatcher::new(vec![exemption(record().rendered(), "2024-03-01", false)], run_date(), false);
        assert_eq!(matcher.len(), 1);
    }

    #[test]
    fn test_apply_marks_but_keeps_records() {
        let matcher = ExemptionMatcher::new(
            vec![
                exemption(record().rendered(), "2024-12-31", true),
            ],
            run_date(),
            false,
        );
        let mut read_only = record();
        read_only.id = "response-property-became-read-only".to_string();
        let mut unrelated = record();
        unrelated.path = "/other".to_string();

        let mut records = vec![record(), read_only, unrelated];
        assert_eq!(matcher.apply(&mut records), 2);
        assert_eq!(records.len(), 3);
        assert!(records[0].hide_from_changelog);
        assert!(records[1].hide_from_changelog);
        assert!(!records[2].hide_from_changelog);
    }

    #[test]
    fn test_match_without_hide_flag_keeps_public() {
        let matcher = ExemptionMatcher::new(vec![exemption(record().rendered(), "2024-12-31", false)], run_date(), false);
        assert!(matcher.is_exempt(&record()));
        assert!(!matcher.should_hide(&record()));
    }

    #[test]
    fn test_export_descriptions() {
        let exemptions = vec![
            exemption("GET /a removed [x]  ", "2024-12-31", false),
            exemption("POST /b added [y]", "2020-01-01", true),
        ];
        assert_eq!(export_descriptions(&exemptions), "GET /a removed [x]\nPOST /b added [y]\n");
    }
}
