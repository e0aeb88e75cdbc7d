//! Typed access to OpenAPI `x-` extension bags
//!
//! Every node of the document carries an open `IndexMap<String, Value>` of
//! extensions. Reads go through these helpers so a value of the wrong shape
//! surfaces as one `ExtensionTypeError` instead of a silent `None`.

use super::version::{parse_date, DATE_FORMAT};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Extension bag as stored by `openapiv3`
pub type Extensions = IndexMap<String, Value>;

/// Sunset date of a content variant or operation
pub const X_SUNSET: &str = "x-sunset";
/// Echo of the version a content variant belongs to
pub const X_GEN_VERSION: &str = "x-xgen-version";
/// Environments a node is visible in
pub const X_ENVIRONMENTS: &str = "x-xgen-env";
/// Manual changelog notes keyed by date
pub const X_CHANGELOG: &str = "x-xgen-changelog";

/// An extension value did not have the expected JSON type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("extension '{key}' should be {expected}, found {found}")]
pub struct ExtensionTypeError {
    pub key: String,
    pub expected: &'static str,
    pub found: String,
}

impl ExtensionTypeError {
    fn new(key: &str, expected: &'static str, found: &Value) -> Self {
        Self {
            key: key.to_string(),
            expected,
            found: type_name(found).to_string(),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn get_string<'a>(bag: &'a Extensions, key: &str) -> Result<Option<&'a str>, ExtensionTypeError> {
    match bag.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ExtensionTypeError::new(key, "a string", other)),
    }
}

/// Read a boolean; `"true"`/`"false"` strings are accepted as well
pub fn get_bool(bag: &Extensions, key: &str) -> Result<Option<bool>, ExtensionTypeError> {
    match bag.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(other) => Err(ExtensionTypeError::new(key, "a boolean", other)),
    }
}

/// Read a list of strings, given either as an array or a comma separated string
pub fn get_string_list(bag: &Extensions, key: &str) -> Result<Option<Vec<String>>, ExtensionTypeError> {
    match bag.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )),
        Some(value @ Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.trim().to_string()),
                _ => Err(ExtensionTypeError::new(key, "an array of strings", value)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(other) => Err(ExtensionTypeError::new(key, "a list of strings", other)),
    }
}

pub fn get_object<'a>(
    bag: &'a Extensions,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ExtensionTypeError> {
    match bag.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(ExtensionTypeError::new(key, "an object", other)),
    }
}

/// Read a date stored either as `YYYY-MM-DD` or as a full timestamp
pub fn get_date(bag: &Extensions, key: &str) -> Result<Option<NaiveDate>, ExtensionTypeError> {
    match get_string(bag, key)? {
        None => Ok(None),
        Some(raw) => match to_date(raw) {
            Some(date) => Ok(Some(date)),
            None => Err(ExtensionTypeError {
                key: key.to_string(),
                expected: "a date",
                found: format!("'{}'", raw),
            }),
        },
    }
}

pub fn set_string(bag: &mut Extensions, key: &str, value: impl Into<String>) {
    bag.insert(key.to_string(), Value::String(value.into()));
}

pub fn remove(bag: &mut Extensions, key: &str) -> Option<Value> {
    bag.shift_remove(key)
}

/// Rewrite a timestamp-valued extension to a bare calendar date
///
/// Returns true when the stored value changed. Values that are neither a date
/// nor a timestamp are left untouched.
pub fn normalize_date(bag: &mut Extensions, key: &str) -> Result<bool, ExtensionTypeError> {
    let Some(raw) = get_string(bag, key)? else {
        return Ok(false);
    };
    if parse_date(raw).is_some() {
        return Ok(false);
    }
    match to_date(raw) {
        Some(date) => {
            set_string(bag, key, date.format(DATE_FORMAT).to_string());
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Convert `YYYY-MM-DD`, RFC 3339 or a naive `YYYY-MM-DDTHH:MM:SS` timestamp to
/// a date
pub fn to_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    parse_date(raw)
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}
