//! Breaking change exemptions
//!
//! An exemption acknowledges a specific breaking change until a given date.
//! The description is matched against the rendered change record, and the
//! optional hide flag keeps the change out of the public changelog.

use super::config::ConfigurationError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// A single entry of the exemption list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exemption {
    /// Rendered change, `"{METHOD} {path} {text} [{id}]"`
    pub breaking_change_description: String,

    pub exempt_until: NaiveDate,

    #[serde(default)]
    pub reason: String,

    #[serde(default, deserialize_with = "bool_or_string")]
    pub hide_from_changelog: bool,
}

fn bool_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Bool(bool),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Bool(b) => Ok(b),
        Repr::Text(s) => match s.trim().to_lowercase().as_str() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "hide_from_changelog must be true or false, got '{}'",
                other
            ))),
        },
    }
}

impl Exemption {
    /// Still in force on `run_date` (the expiry day itself included)
    pub fn is_active(&self, run_date: NaiveDate) -> bool {
        self.exempt_until >= run_date
    }
}

/// Load the exemption list from a YAML file
pub fn load_exemptions(path: &Path) -> Result<Vec<Exemption>, ConfigurationError> {
    let content = ConfigurationError::read_required("exemptions file", path)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(&content).map_err(|e| ConfigurationError::malformed("exemptions file", path, e))
}
