//! Boundary to the structural diff engine

use crate::models::{ChangeRecord, ConfigurationError, Version};
use crate::parser::parse_change_records;
use anyhow::{Context, Result};
use openapiv3::OpenAPI;
use std::path::{Path, PathBuf};

/// One side of a comparison
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub version: &'a Version,
    pub doc: &'a OpenAPI,
}

impl<'a> Snapshot<'a> {
    pub fn new(version: &'a Version, doc: &'a OpenAPI) -> Self {
        Self { version, doc }
    }
}

/// Produces the change records between two specifications
pub trait DiffEngine {
    fn diff(&self, base: &Snapshot<'_>, revision: &Snapshot<'_>) -> Result<Vec<ChangeRecord>>;
}

/// Reads change records precomputed by an external engine
///
/// Files are named `<base>_<revision>.json`, e.g.
/// `2023-01-01_2023-02-01.json` for a diff between versions or
/// `2023-01-01_2023-01-01.json` for one version over time.
#[derive(Debug, Clone)]
pub struct JsonChangesSource {
    dir: PathBuf,
}

impl JsonChangesSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_name(base: &Version, revision: &Version) -> String {
        format!("{}_{}.json", base, revision)
    }

    pub fn path_for(&self, base: &Version, revision: &Version) -> PathBuf {
        self.dir.join(Self::file_name(base, revision))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DiffEngine for JsonChangesSource {
    fn diff(&self, base: &Snapshot<'_>, revision: &Snapshot<'_>) -> Result<Vec<ChangeRecord>> {
        let path = self.path_for(base.version, revision.version);
        let content = ConfigurationError::read_required("change records", &path)?;
        parse_change_records(&content).with_context(|| format!("Invalid change records in {:?}", path))
    }
}
