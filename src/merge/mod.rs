//! Merging external documents into a base document
//!
//! Entries only present in the external document are copied over. Entries
//! present in both must be identical; anything else is a conflict a human has
//! to resolve.

use crate::models::document::all_operations;
use anyhow::Result;
use indexmap::IndexMap;
use openapiv3::{OpenAPI, Tag};
use serde::Serialize;
use similar::TextDiff;
use std::fmt;
use tracing::{debug, info};

/// Kind of entry two documents disagree on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    Path,
    Tag,
    Parameter,
    Response,
    Schema,
    RequestBody,
    Header,
    SecurityScheme,
    Example,
    OperationId,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictKind::Path => "path",
            ConflictKind::Tag => "tag",
            ConflictKind::Parameter => "parameter",
            ConflictKind::Response => "response",
            ConflictKind::Schema => "schema",
            ConflictKind::RequestBody => "request body",
            ConflictKind::Header => "header",
            ConflictKind::SecurityScheme => "security scheme",
            ConflictKind::Example => "example",
            ConflictKind::OperationId => "operation id",
        };
        f.write_str(s)
    }
}

/// Two documents define the same name differently
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("conflicting {kind} '{name}':\n{diff}")]
pub struct StructuralConflictError {
    pub kind: ConflictKind,
    pub name: String,
    /// Unified diff of the base and external definitions
    pub diff: String,
}

fn to_pretty_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}

fn conflict<T: Serialize>(kind: ConflictKind, name: &str, base: &T, external: &T) -> StructuralConflictError {
    let base = to_pretty_json(base);
    let external = to_pretty_json(external);
    let diff = TextDiff::from_lines(&base, &external)
        .unified_diff()
        .context_radius(3)
        .header("base", "external")
        .to_string();
    StructuralConflictError {
        kind,
        name: name.to_string(),
        diff,
    }
}

fn same<T: Serialize>(a: &T, b: &T) -> bool {
    match (serde_json::to_value(a), serde_json::to_value(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copy entries of `external` missing from `base`; returns how many were added
fn merge_named<V: Serialize + Clone>(
    kind: ConflictKind,
    base: &mut IndexMap<String, V>,
    external: &IndexMap<String, V>,
) -> Result<usize, StructuralConflictError> {
    let mut added = 0;
    for (name, value) in external {
        match base.get(name) {
            Some(existing) if same(existing, value) => {}
            Some(existing) => return Err(conflict(kind, name, existing, value)),
            None => {
                base.insert(name.clone(), value.clone());
                added += 1;
            }
        }
    }
    Ok(added)
}

fn merge_tags(base: &mut Vec<Tag>, external: &[Tag]) -> Result<usize, StructuralConflictError> {
    let mut added = 0;
    for tag in external {
        match base.iter().find(|t| t.name == tag.name) {
            Some(existing) if same(existing, tag) => {}
            Some(existing) => return Err(conflict(ConflictKind::Tag, &tag.name, existing, tag)),
            None => {
                base.push(tag.clone());
                added += 1;
            }
        }
    }
    Ok(added)
}

/// Operation ids must stay unique across the merged document
fn check_operation_ids(base: &OpenAPI, external: &OpenAPI) -> Result<(), StructuralConflictError> {
    for (path, method, op) in all_operations(external) {
        let Some(id) = op.operation_id.as_deref() else {
            continue;
        };
        let clash = all_operations(base)
            .into_iter()
            .find(|(p, m, o)| o.operation_id.as_deref() == Some(id) && (*p, *m) != (path, method));
        if let Some((other_path, other_method, _)) = clash {
            let base_loc = format!("{} {}", other_method, other_path);
            let external_loc = format!("{} {}", method, path);
            return Err(conflict(ConflictKind::OperationId, id, &base_loc, &external_loc));
        }
    }
    Ok(())
}

/// Counts of what a merge copied into the base document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub paths: usize,
    pub tags: usize,
    pub components: usize,
}

/// Merge `external` into `base`
///
/// On conflict `base` may already hold part of the external entries; callers
/// should discard it.
pub fn merge_document(base: &mut OpenAPI, external: &OpenAPI) -> Result<MergeSummary, StructuralConflictError> {
    check_operation_ids(base, external)?;

    let mut summary = MergeSummary {
        paths: merge_named(ConflictKind::Path, &mut base.paths.paths, &external.paths.paths)?,
        tags: merge_tags(&mut base.tags, &external.tags)?,
        components: 0,
    };

    if let Some(ext) = &external.components {
        let components = base.components.get_or_insert_with(Default::default);
        summary.components += merge_named(ConflictKind::Parameter, &mut components.parameters, &ext.parameters)?;
        summary.components += merge_named(ConflictKind::Response, &mut components.responses, &ext.responses)?;
        summary.components += merge_named(ConflictKind::Schema, &mut components.schemas, &ext.schemas)?;
        summary.components += merge_named(ConflictKind::RequestBody, &mut components.request_bodies, &ext.request_bodies)?;
        summary.components += merge_named(ConflictKind::Header, &mut components.headers, &ext.headers)?;
        summary.components += merge_named(
            ConflictKind::SecurityScheme,
            &mut components.security_schemes,
            &ext.security_schemes,
        )?;
        summary.components += merge_named(ConflictKind::Example, &mut components.examples, &ext.examples)?;
    }

    debug!(?summary, "Merged document");
    Ok(summary)
}

/// Merge several external documents, in order, into a copy of `base`
pub fn merge_all(base: &OpenAPI, externals: &[OpenAPI]) -> Result<OpenAPI> {
    let mut merged = base.clone();
    for (idx, external) in externals.iter().enumerate() {
        let summary = merge_document(&mut merged, external)?;
        info!(
            document = idx + 1,
            paths = summary.paths,
            tags = summary.tags,
            components = summary.components,
            "Merged external document"
        );
    }
    Ok(merged)
}
