//! Raw change records produced by the structural diff engine

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const ENDPOINT_ADDED: &str = "endpoint-added";
pub const ENDPOINT_REMOVED: &str = "endpoint-removed";
pub const ENDPOINT_DEPRECATED: &str = "endpoint-deprecated";
pub const ENDPOINT_REACTIVATED: &str = "endpoint-reactivated";

/// Severity of a detected change (info < warning < error)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Numeric level used by the diff engine's JSON output
    pub fn level(&self) -> u8 {
        match self {
            Severity::Info => 1,
            Severity::Warning => 2,
            Severity::Error => 3,
        }
    }

    fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Severity::Info),
            2 => Some(Severity::Warning),
            3 => Some(Severity::Error),
            _ => None,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "info" => Some(Severity::Info),
            "warn" | "warning" => Some(Severity::Warning),
            "err" | "error" => Some(Severity::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.level())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Level(u8),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Level(level) => Severity::from_level(level)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown severity level {}", level))),
            Repr::Name(name) => Severity::from_name(&name)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown severity '{}'", name))),
        }
    }
}

/// One change detected between two specifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Stable identifier of the kind of change, e.g. `request-property-added`
    pub id: String,

    /// Human description; values are delimited by single quotes
    pub text: String,

    pub level: Severity,

    /// HTTP method, upper case
    #[serde(deserialize_with = "uppercase")]
    pub operation: String,

    #[serde(default)]
    pub operation_id: String,

    pub path: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hide_from_changelog: bool,
}

fn uppercase<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(String::deserialize(deserializer)?.to_uppercase())
}

impl ChangeRecord {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        level: Severity,
        operation: impl Into<String>,
        operation_id: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            level,
            operation: operation.into().to_uppercase(),
            operation_id: operation_id.into(),
            path: path.into(),
            hide_from_changelog: false,
        }
    }

    /// `"{METHOD} {path} {text} [{id}]"`, the form exemption descriptions use
    pub fn rendered(&self) -> String {
        format!("{} {} {} [{}]", self.operation, self.path, self.text, self.id)
    }

    pub fn is_backward_compatible(&self) -> bool {
        self.level == Severity::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_engine_output() {
        let json = r#"[
            {"id": "request-property-added", "text": "added the new optional request property 'name'",
             "level": 1, "operation": "POST", "operationId": "createCluster",
             "path": "/api/atlas/v2/groups/{groupId}/clusters", "source": "openapi.json"},
            {"id": "endpoint-removed", "text": "endpoint removed", "level": "error",
             "operation": "DELETE", "path": "/api/atlas/v2/groups/{groupId}"}
        ]"#;
        let records: Vec<ChangeRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].level, Severity::Info);
        assert_eq!(records[0].operation_id, "createCluster");
        assert!(records[0].is_backward_compatible());
        assert_eq!(records[1].level, Severity::Error);
        assert_eq!(records[1].operation_id, "");
    }

    #[test]
    fn test_deserialize_normalizes_method_case() {
        let json = r#"{"id": "x", "text": "t", "level": 1, "operation": "get", "path": "/"}"#;
        let record: ChangeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.operation, "GET");
        assert_eq!(record, ChangeRecord::new("x", "t", Severity::Info, "GET", "", "/"));
    }

    #[test]
    fn test_rejects_unknown_level() {
        let json = r#"{"id": "x", "text": "t", "level": 7, "operation": "GET", "path": "/"}"#;
        assert!(serde_json::from_str::<ChangeRecord>(json).is_err());
    }

    #[test]
    fn test_rendered() {
        let record = ChangeRecord::new(
            "response-success-status-removed",
            "removed the success response with the status '200'",
            Severity::Error,
            "get",
            "listClusters",
            "/api/atlas/v2/groups/{groupId}/clusters",
        );
        assert_eq!(
            record.rendered(),
            "GET /api/atlas/v2/groups/{groupId}/clusters removed the success response with the status '200' [response-success-status-removed]"
        );
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }
}
