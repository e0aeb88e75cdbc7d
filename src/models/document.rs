//! Navigation helpers over the `openapiv3` document tree

use openapiv3::{MediaType, OpenAPI, Operation, PathItem, ReferenceOr, RequestBody, Response};

/// Mutable slots of every HTTP method on a path item, upper-case method names
pub fn operation_slots_mut(item: &mut PathItem) -> [(&'static str, &mut Option<Operation>); 8] {
    [
        ("GET", &mut item.get),
        ("PUT", &mut item.put),
        ("POST", &mut item.post),
        ("DELETE", &mut item.delete),
        ("OPTIONS", &mut item.options),
        ("HEAD", &mut item.head),
        ("PATCH", &mut item.patch),
        ("TRACE", &mut item.trace),
    ]
}

/// Operations present on a path item, in method order
pub fn operations(item: &PathItem) -> impl Iterator<Item = (&'static str, &Operation)> {
    [
        ("GET", &item.get),
        ("PUT", &item.put),
        ("POST", &item.post),
        ("DELETE", &item.delete),
        ("OPTIONS", &item.options),
        ("HEAD", &item.head),
        ("PATCH", &item.patch),
        ("TRACE", &item.trace),
    ]
    .into_iter()
    .filter_map(|(method, op)| op.as_ref().map(|op| (method, op)))
}

pub fn has_operations(item: &PathItem) -> bool {
    operations(item).next().is_some()
}

/// Inline path items (references to other path items are not followed)
pub fn path_items(doc: &OpenAPI) -> impl Iterator<Item = (&String, &PathItem)> {
    doc.paths.paths.iter().filter_map(|(path, item)| match item {
        ReferenceOr::Item(item) => Some((path, item)),
        ReferenceOr::Reference { .. } => None,
    })
}

pub fn path_items_mut(doc: &mut OpenAPI) -> impl Iterator<Item = (&String, &mut PathItem)> {
    doc.paths.paths.iter_mut().filter_map(|(path, item)| match item {
        ReferenceOr::Item(item) => Some((path, item)),
        ReferenceOr::Reference { .. } => None,
    })
}

/// Every (path, method, operation) triple of the document
pub fn all_operations(doc: &OpenAPI) -> Vec<(&str, &'static str, &Operation)> {
    path_items(doc)
        .flat_map(|(path, item)| operations(item).map(move |(method, op)| (path.as_str(), method, op)))
        .collect()
}

/// Find the operation for a path and an HTTP method (case-insensitive)
pub fn find_operation<'a>(doc: &'a OpenAPI, path: &str, method: &str) -> Option<&'a Operation> {
    let item = match doc.paths.paths.get(path)? {
        ReferenceOr::Item(item) => item,
        ReferenceOr::Reference { .. } => return None,
    };
    operations(item)
        .find(|(m, _)| m.eq_ignore_ascii_case(method))
        .map(|(_, op)| op)
}

/// The inline value of a `ReferenceOr`, `None` for references
pub fn inline<T>(value: &ReferenceOr<T>) -> Option<&T> {
    match value {
        ReferenceOr::Item(item) => Some(item),
        ReferenceOr::Reference { .. } => None,
    }
}

/// Inline responses of an operation, including `default`
pub fn responses(op: &Operation) -> impl Iterator<Item = (String, &Response)> {
    op.responses
        .default
        .iter()
        .map(|r| ("default".to_string(), r))
        .chain(op.responses.responses.iter().map(|(code, r)| (code.to_string(), r)))
        .filter_map(|(code, r)| inline(r).map(|r| (code, r)))
}

pub fn request_body(op: &Operation) -> Option<&RequestBody> {
    op.request_body.as_ref().and_then(inline)
}

pub fn request_body_mut(op: &mut Operation) -> Option<&mut RequestBody> {
    match op.request_body.as_mut()? {
        ReferenceOr::Item(rb) => Some(rb),
        ReferenceOr::Reference { .. } => None,
    }
}

/// Every inline content variant of an operation: responses first, then the
/// request body
pub fn content_variants(op: &Operation) -> Vec<(&str, &MediaType)> {
    let mut variants: Vec<(&str, &MediaType)> = Vec::new();
    for (_, response) in responses(op) {
        variants.extend(response.content.iter().map(|(ct, mt)| (ct.as_str(), mt)));
    }
    if let Some(body) = request_body(op) {
        variants.extend(body.content.iter().map(|(ct, mt)| (ct.as_str(), mt)));
    }
    variants
}

/// Visit every inline response of an operation mutably, default included
pub fn for_each_response_mut(op: &mut Operation, mut f: impl FnMut(&mut Response)) {
    if let Some(ReferenceOr::Item(response)) = op.responses.default.as_mut() {
        f(response);
    }
    for response in op.responses.responses.values_mut() {
        if let ReferenceOr::Item(response) = response {
            f(response);
        }
    }
}

/// Number of responses, inline or referenced, default included
pub fn response_count(op: &Operation) -> usize {
    op.responses.responses.len() + usize::from(op.responses.default.is_some())
}
