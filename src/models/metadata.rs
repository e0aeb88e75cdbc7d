//! Run metadata stored next to the changelog

use super::config::ConfigurationError;
use super::version::Version;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const METADATA_FILE: &str = "metadata.json";

/// What the last changelog run saw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub run_date: NaiveDate,
    /// Every version present in the specification at that run
    pub versions: Vec<Version>,
}

impl Metadata {
    pub fn new(run_date: NaiveDate, mut versions: Vec<Version>) -> Self {
        versions.sort();
        versions.dedup();
        Self { run_date, versions }
    }

    pub fn load(dir: &Path) -> Result<Self, ConfigurationError> {
        let path = dir.join(METADATA_FILE);
        let content = ConfigurationError::read_required("changelog metadata", &path)?;
        serde_json::from_str(&content).map_err(|e| ConfigurationError::malformed("changelog metadata", &path, e))
    }

    pub fn save(&self, dir: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(METADATA_FILE), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Latest stable version older than `version`, the base snapshot a newly
    /// released version is compared against
    pub fn previous_stable(&self, version: &Version) -> Option<&Version> {
        self.versions
            .iter()
            .filter(|v| v.is_stable() && v < &version)
            .max()
    }
}
