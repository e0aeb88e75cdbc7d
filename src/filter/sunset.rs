//! Sunset and generated-version extensions
//!
//! Normalizes `x-sunset` and `x-xgen-version` to calendar dates and clears the
//! sunset of the resolved variant when the only newer variants are hidden in
//! the target environment. Those pre-release versions do not supersede
//! anything there, so the stable variant must not appear to be sunsetting.

use super::hidden_env::is_visible;
use super::resolver::{find_latest_match_in, variant_version};
use super::{Filter, FilterContext, FilterError};
use crate::models::document::{path_items_mut, request_body, responses};
use crate::models::extension::{normalize_date, remove, Extensions, ExtensionTypeError, X_GEN_VERSION, X_SUNSET};
use crate::models::Version;
use indexmap::IndexMap;
use openapiv3::{MediaType, OpenAPI, Operation, ReferenceOr};
use tracing::{debug, warn};

fn normalize(ext: &mut Extensions) {
    for key in [X_SUNSET, X_GEN_VERSION] {
        if let Err(e) = normalize_date(ext, key) {
            warn!(error = %e, "Leaving extension as is");
        }
    }
}

fn normalize_content(content: &mut IndexMap<String, MediaType>) {
    for media in content.values_mut() {
        normalize(&mut media.extensions);
    }
}

/// True when the operation has newer variants than `latest` and every one of
/// them is hidden in `env`
fn only_hidden_successors(op: &Operation, latest: &Version, env: &str) -> Result<bool, ExtensionTypeError> {
    let mut newer = 0usize;

    let mut scan = |parent: &Extensions, content: &IndexMap<String, MediaType>| -> Result<bool, ExtensionTypeError> {
        let parent_visible = is_visible(parent, env)?;
        for (ct, media) in content {
            let Some(version) = variant_version(ct) else {
                continue;
            };
            if version <= *latest {
                continue;
            }
            newer += 1;
            if parent_visible && is_visible(&media.extensions, env)? {
                return Ok(false);
            }
        }
        Ok(true)
    };

    for (_, response) in responses(op) {
        if !scan(&response.extensions, &response.content)? {
            return Ok(false);
        }
    }
    if let Some(body) = request_body(op) {
        if !scan(&body.extensions, &body.content)? {
            return Ok(false);
        }
    }
    Ok(newer > 0)
}

fn clear_sunset(content: &mut IndexMap<String, MediaType>, latest: &Version) {
    for (ct, media) in content.iter_mut() {
        if variant_version(ct).as_ref() == Some(latest) {
            remove(&mut media.extensions, X_SUNSET);
        }
    }
}

fn filter_operation(op: &mut Operation, ctx: &FilterContext) -> Result<(), FilterError> {
    normalize(&mut op.extensions);
    if let Some(ReferenceOr::Item(response)) = op.responses.default.as_mut() {
        normalize_content(&mut response.content);
    }
    for response in op.responses.responses.values_mut() {
        if let ReferenceOr::Item(response) = response {
            normalize_content(&mut response.content);
        }
    }
    if let Some(ReferenceOr::Item(body)) = op.request_body.as_mut() {
        normalize_content(&mut body.content);
    }

    let latest = find_latest_match_in(op, &ctx.version, Some(ctx.env.as_str()));
    if !only_hidden_successors(op, &latest, &ctx.env)? {
        return Ok(());
    }

    debug!(operation = ?op.operation_id, version = %latest, env = %ctx.env, "Clearing sunset superseded only by hidden versions");
    if let Some(ReferenceOr::Item(response)) = op.responses.default.as_mut() {
        clear_sunset(&mut response.content, &latest);
    }
    for response in op.responses.responses.values_mut() {
        if let ReferenceOr::Item(response) = response {
            clear_sunset(&mut response.content, &latest);
        }
    }
    if let Some(ReferenceOr::Item(body)) = op.request_body.as_mut() {
        clear_sunset(&mut body.content, &latest);
    }
    Ok(())
}

/// Normalizes sunset metadata for the target version and environment
pub struct SunsetFilter;

impl Filter for SunsetFilter {
    fn name(&self) -> &'static str {
        "sunset"
    }

    fn apply(&self, doc: &mut OpenAPI, ctx: &FilterContext) -> Result<(), FilterError> {
        for (_, item) in path_items_mut(doc) {
            for (_, slot) in crate::models::document::operation_slots_mut(item) {
                if let Some(op) = slot.as_mut() {
                    filter_operation(op, ctx)?;
                }
            }
        }
        Ok(())
    }
}
