//! Operation tags for changelog paths
//!
//! Maps each (path, method) of a base document to its first tag.

use crate::models::document::all_operations;
use openapiv3::OpenAPI;
use std::collections::BTreeMap;

/// Operation to tag lookup used when recording changelog paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMapping {
    tags: BTreeMap<(String, String), String>,
}

impl TagMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// First tag of every operation of `doc`
    pub fn from_document(doc: &OpenAPI) -> Self {
        let mut mapping = Self::new();
        mapping.extend_from(doc);
        mapping
    }

    /// Add the operations of `doc`; existing entries win
    pub fn extend_from(&mut self, doc: &OpenAPI) {
        for (path, method, op) in all_operations(doc) {
            if let Some(tag) = op.tags.first() {
                self.tags
                    .entry((path.to_string(), method.to_string()))
                    .or_insert_with(|| tag.clone());
            }
        }
    }

    pub fn insert(&mut self, path: &str, method: &str, tag: impl Into<String>) {
        self.tags
            .insert((path.to_string(), method.to_uppercase()), tag.into());
    }

    /// Tag of an operation, empty when unknown
    pub fn get(&self, path: &str, method: &str) -> &str {
        self.tags
            .get(&(path.to_string(), method.to_uppercase()))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
