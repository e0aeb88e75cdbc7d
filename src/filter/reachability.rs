//! Reference reachability over `#/components`
//!
//! Component entries reference each other through `$ref` (schemas through
//! `allOf`, `oneOf`, `anyOf`, `items`, `properties` and friends). The graph is
//! walked with a worklist and a visited set, so cyclic schemas terminate.

use openapiv3::OpenAPI;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const COMPONENTS_PREFIX: &str = "#/components/";
const REF_KEY: &str = "$ref";

/// A named entry of one components section
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentRef {
    pub section: String,
    pub name: String,
}

impl ComponentRef {
    pub fn new(section: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            name: name.into(),
        }
    }

    /// Parse `#/components/<section>/<name>[/...]`; other references yield `None`
    pub fn parse(reference: &str) -> Option<Self> {
        let rest = reference.strip_prefix(COMPONENTS_PREFIX)?;
        let mut segments = rest.split('/');
        let section = segments.next().filter(|s| !s.is_empty())?;
        let name = segments.next().filter(|s| !s.is_empty())?;
        Some(Self::new(section, unescape_pointer(name)))
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", COMPONENTS_PREFIX, self.section, self.name)
    }
}

/// JSON pointer segment unescaping (`~1` is `/`, `~0` is `~`)
fn unescape_pointer(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Collect every `$ref` string found anywhere under `value`
pub fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match (key.as_str(), child) {
                    (REF_KEY, Value::String(reference)) => out.push(reference.clone()),
                    _ => collect_refs(child, out),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_refs(item, out);
            }
        }
        _ => {}
    }
}

fn component_refs(value: &Value) -> BTreeSet<ComponentRef> {
    let mut raw = Vec::new();
    collect_refs(value, &mut raw);
    raw.iter().filter_map(|r| ComponentRef::parse(r)).collect()
}

/// Directed graph of references between component entries
#[derive(Debug, Default)]
pub struct ReferenceGraph {
    edges: BTreeMap<ComponentRef, BTreeSet<ComponentRef>>,
}

impl ReferenceGraph {
    /// Build the graph from a serialized `components` object
    pub fn from_components(components: &Value) -> Self {
        let mut edges = BTreeMap::new();
        let Some(sections) = components.as_object() else {
            return Self { edges };
        };

        for (section, entries) in sections {
            if section.starts_with("x-") {
                continue;
            }
            let Some(entries) = entries.as_object() else {
                continue;
            };
            for (name, entry) in entries {
                edges.insert(ComponentRef::new(section, name), component_refs(entry));
            }
        }
        Self { edges }
    }

    pub fn contains(&self, node: &ComponentRef) -> bool {
        self.edges.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Every node reachable from `roots`, roots included
    ///
    /// Dangling references are kept in the result but not expanded.
    pub fn reachable(&self, roots: impl IntoIterator<Item = ComponentRef>) -> BTreeSet<ComponentRef> {
        let mut visited = BTreeSet::new();
        let mut worklist: Vec<ComponentRef> = roots.into_iter().collect();

        while let Some(node) = worklist.pop() {
            if visited.contains(&node) {
                continue;
            }
            if let Some(targets) = self.edges.get(&node) {
                worklist.extend(targets.iter().filter(|t| !visited.contains(*t)).cloned());
            }
            visited.insert(node);
        }
        visited
    }
}

/// Component entries reachable from the document's paths
pub fn reachable_components(doc: &OpenAPI) -> Result<BTreeSet<ComponentRef>, serde_json::Error> {
    let components = match &doc.components {
        Some(components) => serde_json::to_value(components)?,
        None => Value::Null,
    };
    let graph = ReferenceGraph::from_components(&components);
    let roots = component_refs(&serde_json::to_value(&doc.paths)?);
    Ok(graph.reachable(roots))
}
