//! Version pruning
//!
//! Keeps exactly the content variants of the latest matched version. Older
//! versions met along the way are listed in the operation description as
//! deprecated; newer ones are simply dropped.

use super::hidden_env::is_visible;
use super::resolver::{classify, find_latest_match_in, VariantKind};
use super::{Filter, FilterContext, FilterError};
use crate::models::document::{has_operations, operation_slots_mut, path_items_mut};
use crate::models::Version;
use indexmap::IndexMap;
use openapiv3::{MediaType, OpenAPI, Operation, ReferenceOr};
use std::collections::BTreeSet;
use tracing::{debug, warn};

const DEPRECATED_VERSIONS_PREFIX: &str = "Deprecated versions:";

/// What pruning did to one content map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pruned {
    /// No versioned media types at all
    Unversioned,
    /// The latest match survived
    Kept,
    /// Versioned content existed but none matched
    Emptied,
}

fn prune_content(
    content: &mut IndexMap<String, MediaType>,
    latest: &Version,
    env: &str,
    deprecated: &mut BTreeSet<Version>,
) -> Pruned {
    let mut versioned = false;
    let mut kept = false;

    content.retain(|content_type, media| match classify(content_type) {
        VariantKind::Unversioned => true,
        VariantKind::Malformed => {
            warn!(content_type = %content_type, "Keeping media type with unreadable version");
            true
        }
        VariantKind::Versioned(version) => {
            versioned = true;
            if version == *latest {
                kept = true;
                true
            } else {
                if version < *latest && is_visible(&media.extensions, env).unwrap_or(true) {
                    deprecated.insert(version);
                }
                false
            }
        }
    });

    match (versioned, kept) {
        (false, _) => Pruned::Unversioned,
        (true, true) => Pruned::Kept,
        (true, false) => Pruned::Emptied,
    }
}

fn append_deprecated_versions(op: &mut Operation, deprecated: &BTreeSet<Version>) {
    if deprecated.is_empty() {
        return;
    }
    if op
        .description
        .as_deref()
        .is_some_and(|d| d.contains(DEPRECATED_VERSIONS_PREFIX))
    {
        return;
    }

    let tags: Vec<String> = deprecated.iter().map(Version::deprecation_tag).collect();
    let suffix = format!("{} {}", DEPRECATED_VERSIONS_PREFIX, tags.join(", "));
    op.description = Some(match op.description.take() {
        Some(desc) if !desc.trim().is_empty() => format!("{}\n\n{}", desc, suffix),
        _ => suffix,
    });
}

/// Prune one operation; returns false when the operation must be removed
///
/// The latest match is resolved among the variants visible in the target
/// environment.
pub fn filter_operation(op: &mut Operation, ctx: &FilterContext) -> bool {
    let latest = find_latest_match_in(op, &ctx.version, Some(ctx.env.as_str()));
    let env = ctx.env.as_str();
    let mut deprecated = BTreeSet::new();
    let mut had_versioned = false;
    let mut kept_versioned = false;

    let mut track = |outcome: Pruned| {
        match outcome {
            Pruned::Unversioned => {}
            Pruned::Kept => {
                had_versioned = true;
                kept_versioned = true;
            }
            Pruned::Emptied => had_versioned = true,
        }
        outcome != Pruned::Emptied
    };

    op.responses.responses.retain(|_, response| match response {
        ReferenceOr::Item(response) => track(prune_content(&mut response.content, &latest, env, &mut deprecated)),
        ReferenceOr::Reference { .. } => true,
    });

    if let Some(ReferenceOr::Item(response)) = op.responses.default.as_mut() {
        if !track(prune_content(&mut response.content, &latest, env, &mut deprecated)) {
            op.responses.default = None;
        }
    }

    if let Some(ReferenceOr::Item(body)) = op.request_body.as_mut() {
        if prune_content(&mut body.content, &latest, env, &mut deprecated) == Pruned::Emptied {
            op.request_body = None;
        }
    }

    append_deprecated_versions(op, &deprecated);

    !had_versioned || kept_versioned
}

/// Keeps only the latest matched version of every operation
pub struct VersioningFilter;

impl Filter for VersioningFilter {
    fn name(&self) -> &'static str {
        "versioning"
    }

    fn apply(&self, doc: &mut OpenAPI, ctx: &FilterContext) -> Result<(), FilterError> {
        let mut empty_paths = Vec::new();

        for (path, item) in path_items_mut(doc) {
            for (method, slot) in operation_slots_mut(item) {
                let Some(op) = slot.as_mut() else {
                    continue;
                };
                if !filter_operation(op, ctx) {
                    debug!(path = %path, method, version = %ctx.version, "Operation has no variant for version");
                    *slot = None;
                }
            }
            if !has_operations(item) {
                empty_paths.push(path.clone());
            }
        }

        for path in empty_paths {
            doc.paths.paths.shift_remove(&path);
        }
        Ok(())
    }
}
