//! Environment scoping
//!
//! Nodes tagged with `x-xgen-env` only exist in the listed environments. For
//! other environments the node is removed; for a listed one the extension is
//! stripped so it never reaches consumers.

use super::{Filter, FilterContext, FilterError};
use crate::models::document::{has_operations, operation_slots_mut, path_items_mut, response_count};
use crate::models::extension::{get_string_list, remove, Extensions, ExtensionTypeError, X_ENVIRONMENTS};
use indexmap::IndexMap;
use openapiv3::{MediaType, OpenAPI, Operation, PathItem, ReferenceOr, RequestBody, Response};
use tracing::debug;

/// Nodes that carry an extension bag
pub trait HasExtensions {
    fn extensions(&self) -> Option<&Extensions>;
    fn extensions_mut(&mut self) -> Option<&mut Extensions>;
}

macro_rules! impl_has_extensions {
    ($($ty:ty),*) => {
        $(impl HasExtensions for $ty {
            fn extensions(&self) -> Option<&Extensions> {
                Some(&self.extensions)
            }

            fn extensions_mut(&mut self) -> Option<&mut Extensions> {
                Some(&mut self.extensions)
            }
        })*
    };
}

impl_has_extensions!(PathItem, Operation, Response, RequestBody, MediaType);

impl<T: HasExtensions> HasExtensions for ReferenceOr<T> {
    fn extensions(&self) -> Option<&Extensions> {
        match self {
            ReferenceOr::Item(item) => item.extensions(),
            ReferenceOr::Reference { .. } => None,
        }
    }

    fn extensions_mut(&mut self) -> Option<&mut Extensions> {
        match self {
            ReferenceOr::Item(item) => item.extensions_mut(),
            ReferenceOr::Reference { .. } => None,
        }
    }
}

/// True unless the bag scopes the node to other environments
pub fn is_visible(ext: &Extensions, env: &str) -> Result<bool, ExtensionTypeError> {
    Ok(match get_string_list(ext, X_ENVIRONMENTS)? {
        None => true,
        Some(envs) => envs.iter().any(|e| e == env),
    })
}

/// Visibility check that strips the scope extension from visible nodes
fn keep_for_env<T: HasExtensions>(node: &mut T, env: &str) -> Result<bool, ExtensionTypeError> {
    let Some(ext) = node.extensions_mut() else {
        return Ok(true);
    };
    let visible = is_visible(ext, env)?;
    if visible {
        remove(ext, X_ENVIRONMENTS);
    }
    Ok(visible)
}

/// Drop map entries hidden for `env`
fn retain_for_env<K, V: HasExtensions>(map: &mut IndexMap<K, V>, env: &str) -> Result<(), ExtensionTypeError> {
    let mut error = None;
    map.retain(|_, value| {
        if error.is_some() {
            return true;
        }
        match keep_for_env(value, env) {
            Ok(keep) => keep,
            Err(e) => {
                error = Some(e);
                true
            }
        }
    });
    error.map_or(Ok(()), Err)
}

/// Filter content variants; false when content existed and none is left
fn retain_content(content: &mut IndexMap<String, MediaType>, env: &str) -> Result<bool, ExtensionTypeError> {
    let had_content = !content.is_empty();
    retain_for_env(content, env)?;
    Ok(!had_content || !content.is_empty())
}

/// Removes operations, responses, request bodies and content variants that are
/// not visible in the target environment
pub struct HiddenEnvFilter;

impl HiddenEnvFilter {
    /// Returns false when the operation itself must go
    fn filter_operation(op: &mut Operation, env: &str) -> Result<bool, ExtensionTypeError> {
        if !keep_for_env(op, env)? {
            return Ok(false);
        }

        let had_responses = response_count(op) > 0;

        retain_for_env(&mut op.responses.responses, env)?;
        let mut emptied = Vec::new();
        for (code, response) in op.responses.responses.iter_mut() {
            if let ReferenceOr::Item(response) = response {
                if !retain_content(&mut response.content, env)? {
                    emptied.push(code.clone());
                }
            }
        }
        for code in emptied {
            op.responses.responses.shift_remove(&code);
        }

        if let Some(default) = op.responses.default.as_mut() {
            let keep = match keep_for_env(default, env)? {
                false => false,
                true => match default {
                    ReferenceOr::Item(response) => retain_content(&mut response.content, env)?,
                    ReferenceOr::Reference { .. } => true,
                },
            };
            if !keep {
                op.responses.default = None;
            }
        }

        if let Some(body) = op.request_body.as_mut() {
            let keep = match keep_for_env(body, env)? {
                false => false,
                true => match body {
                    ReferenceOr::Item(body) => retain_content(&mut body.content, env)?,
                    ReferenceOr::Reference { .. } => true,
                },
            };
            if !keep {
                op.request_body = None;
            }
        }

        Ok(!had_responses || response_count(op) > 0)
    }
}

impl Filter for HiddenEnvFilter {
    fn name(&self) -> &'static str {
        "hidden-env"
    }

    fn apply(&self, doc: &mut OpenAPI, ctx: &FilterContext) -> Result<(), FilterError> {
        let env = ctx.env.as_str();
        let mut removed_paths = Vec::new();

        for (path, item) in path_items_mut(doc) {
            if !keep_for_env(item, env)? {
                removed_paths.push(path.clone());
                continue;
            }
            for (method, slot) in operation_slots_mut(item) {
                let Some(op) = slot.as_mut() else {
                    continue;
                };
                if !Self::filter_operation(op, env)? {
                    debug!(path = %path, method, env, "Removing operation hidden for environment");
                    *slot = None;
                }
            }
            if !has_operations(item) {
                removed_paths.push(path.clone());
            }
        }

        for path in removed_paths {
            doc.paths.paths.shift_remove(&path);
        }
        Ok(())
    }
}
