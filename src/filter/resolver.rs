//! Latest-match version resolution
//!
//! An operation carries one content variant per supported version. For a
//! requested version the resolver finds the newest variant that is not newer
//! than the request; that version anchors every other filter decision.

use super::hidden_env::is_visible;
use crate::models::document::{all_operations, content_variants, request_body, responses};
use crate::models::extension::Extensions;
use crate::models::version::strip_parameters;
use crate::models::Version;
use openapiv3::{OpenAPI, Operation};
use std::collections::BTreeSet;
use tracing::warn;

/// How a media type key relates to versioning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantKind {
    /// Plain media type such as `application/json`
    Unversioned,
    Versioned(Version),
    /// Looks versioned but the version cannot be read
    Malformed,
}

/// `<type>/vnd.<vendor>.<segment>+<subtype>`; anything else is unversioned
fn looks_versioned(content_type: &str) -> bool {
    let Some((head, _)) = strip_parameters(content_type).split_once('+') else {
        return false;
    };
    head.contains("/vnd.") && head.matches('.').count() >= 2
}

/// Classify a media type without logging
pub fn classify(content_type: &str) -> VariantKind {
    if !looks_versioned(content_type) {
        return VariantKind::Unversioned;
    }
    match Version::from_content_type(content_type) {
        Ok(version) => VariantKind::Versioned(version),
        Err(_) => VariantKind::Malformed,
    }
}

/// Version of a media type, warning about malformed versioned ones
pub fn variant_version(content_type: &str) -> Option<Version> {
    if !looks_versioned(content_type) {
        return None;
    }
    match Version::from_content_type(content_type) {
        Ok(version) => Some(version),
        Err(e) => {
            warn!(content_type, error = %e, "Skipping malformed versioned content type");
            None
        }
    }
}

/// Visibility check that tolerates a malformed scope, which the
/// hidden-environment filter reports on its own
fn visible_in(ext: &Extensions, env: Option<&str>) -> bool {
    match env {
        None => true,
        Some(env) => is_visible(ext, env).unwrap_or(true),
    }
}

/// Content types of the variants visible in `env`, every variant without one
///
/// A variant is hidden when it, or the response or request body holding it,
/// is scoped away from `env`.
pub fn visible_variants<'a>(op: &'a Operation, env: Option<&str>) -> Vec<&'a str> {
    let mut variants = Vec::new();
    for (_, response) in responses(op) {
        if !visible_in(&response.extensions, env) {
            continue;
        }
        for (ct, media) in &response.content {
            if visible_in(&media.extensions, env) {
                variants.push(ct.as_str());
            }
        }
    }
    if let Some(body) = request_body(op) {
        if visible_in(&body.extensions, env) {
            for (ct, media) in &body.content {
                if visible_in(&media.extensions, env) {
                    variants.push(ct.as_str());
                }
            }
        }
    }
    variants
}

/// Greatest variant version not newer than `requested`
///
/// An exact match wins immediately. When every variant is newer than the
/// request (a future-dated operation) the requested version is returned
/// unchanged.
pub fn find_latest_match(op: &Operation, requested: &Version) -> Version {
    find_latest_match_in(op, requested, None)
}

/// Latest match among the variants visible in `env`
///
/// A variant scoped to other environments never anchors the result, so an
/// older variant served in `env` is not displaced by a newer hidden one.
pub fn find_latest_match_in(op: &Operation, requested: &Version, env: Option<&str>) -> Version {
    let mut latest: Option<Version> = None;

    for content_type in visible_variants(op, env) {
        let Some(version) = variant_version(content_type) else {
            continue;
        };
        if version == *requested {
            return version;
        }
        if version > *requested {
            continue;
        }
        if latest.as_ref().map_or(true, |l| version > *l) {
            latest = Some(version);
        }
    }

    latest.unwrap_or_else(|| requested.clone())
}

/// Sorted set of versions an operation has variants for
pub fn operation_versions(op: &Operation) -> BTreeSet<Version> {
    content_variants(op)
        .into_iter()
        .filter_map(|(ct, _)| variant_version(ct))
        .collect()
}

/// Every version present in the document, sorted ascending
///
/// With `env` set, variants scoped away from that environment (on the
/// operation, the response or the variant itself) are ignored.
pub fn collect_versions(doc: &OpenAPI, env: Option<&str>) -> BTreeSet<Version> {
    all_operations(doc)
        .into_iter()
        .filter(|(_, _, op)| visible_in(&op.extensions, env))
        .flat_map(|(_, _, op)| visible_variants(op, env))
        .filter_map(variant_version)
        .collect()
}
