//! API version model
//!
//! A version is either dated (`2023-01-01`, optionally suffixed with a
//! stability level such as `2023-01-01.upcoming`) or a bare stability keyword
//! (`preview`). Versions are parsed from labels or from versioned media types
//! like `application/vnd.atlas.2023-01-01+json`.
//!
//! Equality is label equality. `is_greater_than`/`is_less_than` only look at
//! the sort date, so two versions sharing a date but not a label are neither
//! equal nor ordered under those operations. `Ord` breaks that tie with the
//! stability rank and then the label, which keeps it consistent with `Eq`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Date format used by version labels and every date in the changelog
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static CONTENT_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<prefix>.+?)\.(?:(?P<date>\d{4}-\d{2}-\d{2})(?:\.(?P<stability>[a-z][a-z-]*))?|(?P<keyword>preview|upcoming|private-preview|public-preview))\+(?P<subtype>[A-Za-z0-9.-]+)$",
    )
    .expect("versioned content type pattern must compile")
});

/// Sort date for versions that carry no date of their own
fn undated_sort_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// Failure to read a version out of a label or a media type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse version from '{input}': {reason}")]
pub struct VersionParseError {
    pub input: String,
    pub reason: String,
}

impl VersionParseError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Stability level of a version
///
/// Declaration order is the tie-break rank used when two versions share a
/// sort date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StabilityLevel {
    Stable,
    Upcoming,
    PublicPreview,
    PrivatePreview,
    Preview,
}

impl StabilityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StabilityLevel::Stable => "stable",
            StabilityLevel::Upcoming => "upcoming",
            StabilityLevel::PublicPreview => "public-preview",
            StabilityLevel::PrivatePreview => "private-preview",
            StabilityLevel::Preview => "preview",
        }
    }

    /// Parse a stability keyword (`stable` is implicit and never a keyword)
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "upcoming" => Some(StabilityLevel::Upcoming),
            "public-preview" => Some(StabilityLevel::PublicPreview),
            "private-preview" => Some(StabilityLevel::PrivatePreview),
            "preview" => Some(StabilityLevel::Preview),
            _ => None,
        }
    }
}

impl fmt::Display for StabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An API version
#[derive(Debug, Clone)]
pub struct Version {
    label: String,
    sort_date: NaiveDate,
    stability: StabilityLevel,
}

impl Version {
    /// Parse a version label such as `2023-01-01`, `2023-01-01.upcoming` or
    /// `preview`
    pub fn parse(label: &str) -> Result<Self, VersionParseError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(VersionParseError::new(label, "empty version label"));
        }

        if let Some(stability) = StabilityLevel::from_keyword(label) {
            return Ok(Self {
                label: label.to_string(),
                sort_date: undated_sort_date(),
                stability,
            });
        }

        let (date_part, suffix) = match label.split_once('.') {
            Some((date, suffix)) => (date, Some(suffix)),
            None => (label, None),
        };

        let sort_date = parse_date(date_part)
            .ok_or_else(|| VersionParseError::new(label, "expected YYYY-MM-DD or a stability keyword"))?;

        let stability = match suffix {
            None => StabilityLevel::Stable,
            Some(s) => StabilityLevel::from_keyword(s)
                .ok_or_else(|| VersionParseError::new(label, format!("unknown stability level '{}'", s)))?,
        };

        Ok(Self {
            label: label.to_string(),
            sort_date,
            stability,
        })
    }

    /// Extract the version from a versioned media type
    ///
    /// Accepts `<prefix>.<YYYY>-<MM>-<DD>[.<stability>]+<subtype>` and
    /// `<prefix>.<keyword>+<subtype>`. Media type parameters such as
    /// `; charset=utf-8` are ignored.
    pub fn from_content_type(content_type: &str) -> Result<Self, VersionParseError> {
        let caps = CONTENT_TYPE_RE
            .captures(strip_parameters(content_type))
            .ok_or_else(|| VersionParseError::new(content_type, "not a versioned media type"))?;

        let label = match (caps.name("date"), caps.name("stability"), caps.name("keyword")) {
            (Some(date), Some(stability), _) => format!("{}.{}", date.as_str(), stability.as_str()),
            (Some(date), None, _) => date.as_str().to_string(),
            (None, _, Some(keyword)) => keyword.as_str().to_string(),
            _ => return Err(VersionParseError::new(content_type, "no version segment")),
        };

        Self::parse(&label).map_err(|e| VersionParseError::new(content_type, e.reason))
    }

    /// Build a stable version for a calendar date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            label: date.format(DATE_FORMAT).to_string(),
            sort_date: date,
            stability: StabilityLevel::Stable,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn sort_date(&self) -> NaiveDate {
        self.sort_date
    }

    pub fn stability(&self) -> StabilityLevel {
        self.stability
    }

    pub fn is_stable(&self) -> bool {
        self.stability == StabilityLevel::Stable
    }

    /// True when this version's sort date is strictly later
    pub fn is_greater_than(&self, other: &Version) -> bool {
        self.sort_date > other.sort_date
    }

    /// True when this version's sort date is strictly earlier
    pub fn is_less_than(&self, other: &Version) -> bool {
        self.sort_date < other.sort_date
    }

    /// Tag used in operation descriptions, e.g. `v2-{2023-01-01}`
    pub fn deprecation_tag(&self) -> String {
        format!("v2-{{{}}}", self.label)
    }
}

/// Media type without its `;` parameters
pub fn strip_parameters(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or(content_type).trim()
}

/// Parse a strict `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label.hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_date
            .cmp(&other.sort_date)
            .then(self.stability.cmp(&other.stability))
            .then_with(|| self.label.cmp(&other.label))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl std::str::FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Version::parse(&label).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn v(label: &str) -> Version {
        Version::parse(label).unwrap()
    }

    #[rstest]
    #[case("2023-01-01", StabilityLevel::Stable)]
    #[case("2023-11-15.upcoming", StabilityLevel::Upcoming)]
    #[case("preview", StabilityLevel::Preview)]
    #[case("private-preview", StabilityLevel::PrivatePreview)]
    #[case("public-preview", StabilityLevel::PublicPreview)]
    fn test_parse_labels(#[case] label: &str, #[case] stability: StabilityLevel) {
        let version = v(label);
        assert_eq!(version.label(), label);
        assert_eq!(version.stability(), stability);
    }

    #[rstest]
    #[case("")]
    #[case("2023-1-1")]
    #[case("2023-02-30")]
    #[case("latest")]
    #[case("2023-01-01.beta")]
    fn test_parse_rejects_invalid(#[case] label: &str) {
        assert!(Version::parse(label).is_err());
    }

    #[rstest]
    #[case("application/vnd.atlas.2023-01-01+json", "2023-01-01")]
    #[case("application/vnd.atlas.2024-08-05.upcoming+json", "2024-08-05.upcoming")]
    #[case("application/vnd.atlas.preview+json", "preview")]
    #[case("application/vnd.atlas.public-preview+json", "public-preview")]
    #[case("application/vnd.atlas.2023-02-01+csv", "2023-02-01")]
    #[case("application/vnd.atlas.2023-02-01+x-ndjson", "2023-02-01")]
    #[case("application/vnd.atlas.2023-01-01+json; charset=utf-8", "2023-01-01")]
    fn test_from_content_type(#[case] content_type: &str, #[case] label: &str) {
        assert_eq!(Version::from_content_type(content_type).unwrap().label(), label);
    }

    #[rstest]
    #[case("application/json")]
    #[case("application/vnd.atlas+json")]
    #[case("application/vnd.atlas.2023-13-01+json")]
    #[case("application/vnd.atlas.2023-01-01.nightly+json")]
    fn test_from_content_type_rejects(#[case] content_type: &str) {
        assert!(Version::from_content_type(content_type).is_err());
    }

    #[test]
    fn test_same_date_different_label_is_not_totally_ordered() {
        let stable = v("2024-08-05");
        let upcoming = v("2024-08-05.upcoming");

        assert_ne!(stable, upcoming);
        assert!(!stable.is_greater_than(&upcoming));
        assert!(!stable.is_less_than(&upcoming));
        assert!(!upcoming.is_greater_than(&stable));
        assert!(!upcoming.is_less_than(&stable));

        // The Ord impl still gives a deterministic answer
        assert!(stable < upcoming);
    }

    #[test]
    fn test_ordering_by_date() {
        let mut versions = vec![v("preview"), v("2023-11-15"), v("2023-01-01"), v("2023-02-01")];
        versions.sort();
        let labels: Vec<_> = versions.iter().map(|v| v.label()).collect();
        assert_eq!(labels, vec!["2023-01-01", "2023-02-01", "2023-11-15", "preview"]);
        assert!(v("2023-02-01").is_greater_than(&v("2023-01-01")));
    }

    #[test]
    fn test_deprecation_tag() {
        assert_eq!(v("2023-01-01").deprecation_tag(), "v2-{2023-01-01}");
    }

    #[test]
    fn test_serde_as_label() {
        let json = serde_json::to_string(&v("2023-01-01")).unwrap();
        assert_eq!(json, "\"2023-01-01\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("2023-01-01"));
        assert!(serde_json::from_str::<Version>("\"nope\"").is_err());
    }
}
