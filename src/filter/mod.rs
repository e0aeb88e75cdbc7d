//! Filtering pipeline
//!
//! Produces the document for one (version, environment) pair by running a
//! fixed sequence of filters over a copy of the full multi-version document.
//! Each filter is idempotent; later filters rely on what earlier ones pruned
//! (tag and component cleanup only see surviving operations).

pub mod cleanup;
pub mod hidden_env;
pub mod reachability;
pub mod resolver;
pub mod sunset;
pub mod versioning;

use crate::models::{ExtensionTypeError, Version};
use openapiv3::OpenAPI;
use tracing::{debug, info_span};

pub use cleanup::{ComponentCleanupFilter, ComponentSection, TagsFilter};
pub use hidden_env::HiddenEnvFilter;
pub use reachability::{ComponentRef, ReferenceGraph};
pub use resolver::{collect_versions, find_latest_match, find_latest_match_in};
pub use sunset::SunsetFilter;
pub use versioning::VersioningFilter;

/// Target of a filtering run
#[derive(Debug, Clone)]
pub struct FilterContext {
    pub version: Version,
    pub env: String,
}

impl FilterContext {
    pub fn new(version: Version, env: impl Into<String>) -> Self {
        Self {
            version,
            env: env.into(),
        }
    }
}

/// Errors raised inside a single filter
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error(transparent)]
    Extension(#[from] ExtensionTypeError),

    #[error("failed to scan references: {0}")]
    References(#[from] serde_json::Error),
}

/// A filter failed; the document is left partially filtered
#[derive(Debug, thiserror::Error)]
#[error("filter '{filter}' failed: {source}")]
pub struct PipelineError {
    pub filter: &'static str,
    pub source: FilterError,
}

/// One transformation of the document tree
pub trait Filter {
    fn name(&self) -> &'static str;

    fn apply(&self, doc: &mut OpenAPI, ctx: &FilterContext) -> Result<(), FilterError>;
}

/// Ordered list of filters
pub struct Pipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl Pipeline {
    pub fn new(filters: Vec<Box<dyn Filter>>) -> Self {
        Self { filters }
    }

    /// The canonical pipeline
    ///
    /// Sunset handling runs first because it needs the newer variants that
    /// the versioning filter deletes.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(SunsetFilter),
            Box::new(VersioningFilter),
            Box::new(HiddenEnvFilter),
            Box::new(TagsFilter),
            Box::new(ComponentCleanupFilter::new(ComponentSection::Parameters)),
            Box::new(ComponentCleanupFilter::new(ComponentSection::Responses)),
            Box::new(ComponentCleanupFilter::new(ComponentSection::Schemas)),
        ])
    }

    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run every filter in order on `doc`
    pub fn run(&self, doc: &mut OpenAPI, ctx: &FilterContext) -> Result<(), PipelineError> {
        let _span = info_span!("filter", version = %ctx.version, env = %ctx.env).entered();
        for filter in &self.filters {
            debug!(filter = filter.name(), "Applying filter");
            filter.apply(doc, ctx).map_err(|source| PipelineError {
                filter: filter.name(),
                source,
            })?;
        }
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

/// Filter a copy of `base` for one version and environment
pub fn split(base: &OpenAPI, version: &Version, env: &str) -> Result<OpenAPI, PipelineError> {
    let mut doc = base.clone();
    Pipeline::standard().run(&mut doc, &FilterContext::new(version.clone(), env))?;
    Ok(doc)
}
