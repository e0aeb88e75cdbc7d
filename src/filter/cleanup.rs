//! Removal of tags and components no surviving operation uses

use super::reachability::{reachable_components, ComponentRef};
use super::{Filter, FilterContext, FilterError};
use crate::models::document::all_operations;
use indexmap::IndexMap;
use openapiv3::OpenAPI;
use std::collections::BTreeSet;
use tracing::debug;

/// Drops top-level tags that no operation references
pub struct TagsFilter;

impl Filter for TagsFilter {
    fn name(&self) -> &'static str {
        "tags"
    }

    fn apply(&self, doc: &mut OpenAPI, _ctx: &FilterContext) -> Result<(), FilterError> {
        let used: BTreeSet<String> = all_operations(doc)
            .into_iter()
            .flat_map(|(_, _, op)| op.tags.iter().cloned())
            .collect();

        let before = doc.tags.len();
        doc.tags.retain(|tag| used.contains(&tag.name));
        if doc.tags.len() != before {
            debug!(removed = before - doc.tags.len(), "Removed unused tags");
        }
        Ok(())
    }
}

/// Components section a cleanup pass works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentSection {
    Parameters,
    Responses,
    Schemas,
}

impl ComponentSection {
    pub fn name(&self) -> &'static str {
        match self {
            ComponentSection::Parameters => "parameters",
            ComponentSection::Responses => "responses",
            ComponentSection::Schemas => "schemas",
        }
    }
}

fn retain_reachable<V>(
    entries: &mut IndexMap<String, V>,
    section: ComponentSection,
    reachable: &BTreeSet<ComponentRef>,
) -> usize {
    let before = entries.len();
    entries.retain(|name, _| reachable.contains(&ComponentRef::new(section.name(), name.as_str())));
    before - entries.len()
}

/// Drops entries of one components section unreachable from the paths
pub struct ComponentCleanupFilter {
    section: ComponentSection,
}

impl ComponentCleanupFilter {
    pub fn new(section: ComponentSection) -> Self {
        Self { section }
    }
}

impl Filter for ComponentCleanupFilter {
    fn name(&self) -> &'static str {
        self.section.name()
    }

    fn apply(&self, doc: &mut OpenAPI, _ctx: &FilterContext) -> Result<(), FilterError> {
        if doc.components.is_none() {
            return Ok(());
        }
        let reachable = reachable_components(doc)?;
        let Some(components) = doc.components.as_mut() else {
            return Ok(());
        };

        let removed = match self.section {
            ComponentSection::Parameters => retain_reachable(&mut components.parameters, self.section, &reachable),
            ComponentSection::Responses => retain_reachable(&mut components.responses, self.section, &reachable),
            ComponentSection::Schemas => retain_reachable(&mut components.schemas, self.section, &reachable),
        };
        if removed > 0 {
            debug!(section = self.section.name(), removed, "Removed unreachable components");
        }
        Ok(())
    }
}
