//! Squashing of repeated change records
//!
//! The diff engine emits one record per enum value or property. Records with
//! the same identifier and operation that differ only in one quoted value are
//! collapsed into one record listing every value.

use crate::models::ChangeRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

static QUOTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']*)'").expect("valid quoted value regex"));

/// How records of one identifier are squashed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquashRule {
    pub id: &'static str,
    /// Number of quoted values every message of this kind carries
    pub quoted: usize,
    /// Position of the value that varies between squashable records
    pub squash_index: usize,
    pub singular: &'static str,
    pub plural: &'static str,
}

const fn rule(
    id: &'static str,
    quoted: usize,
    squash_index: usize,
    singular: &'static str,
    plural: &'static str,
) -> SquashRule {
    SquashRule {
        id,
        quoted,
        squash_index,
        singular,
        plural,
    }
}

/// Message shapes, e.g. `added the new 'X' enum value to the request property 'Y'`
pub const SQUASH_RULES: &[SquashRule] = &[
    rule("request-property-enum-value-added", 2, 0, "enum value", "enum values"),
    rule("request-property-enum-value-removed", 2, 0, "enum value", "enum values"),
    rule("response-property-enum-value-added", 3, 0, "enum value", "enum values"),
    rule("response-property-enum-value-removed", 3, 0, "enum value", "enum values"),
    rule("request-parameter-enum-value-added", 3, 0, "enum value", "enum values"),
    rule("request-parameter-enum-value-removed", 3, 0, "enum value", "enum values"),
    rule("response-mediatype-enum-value-removed", 2, 0, "enum value", "enum values"),
    rule("request-property-removed", 1, 0, "request property", "request properties"),
    rule("response-optional-property-added", 2, 0, "property", "properties"),
    rule("response-optional-property-removed", 2, 0, "property", "properties"),
    rule("response-required-property-added", 2, 0, "property", "properties"),
    rule("response-required-property-removed", 2, 0, "property", "properties"),
];

pub fn rule_for(id: &str) -> Option<&'static SquashRule> {
    SQUASH_RULES.iter().find(|r| r.id == id)
}

/// The message no longer has the shape its squash rule expects
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SquashError {
    #[error("change '{id}' should quote {expected} value(s) but quotes {found}: {text}")]
    PatternMismatch {
        id: String,
        expected: usize,
        found: usize,
        text: String,
    },
}

/// Every single-quoted value of a message, in order
pub fn quoted_values(text: &str) -> Vec<String> {
    QUOTED_RE
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

/// Replace the first occurrence of `from` that is not inside quotes
fn replace_unquoted(text: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(text.len() + to.len());
    let mut replaced = false;
    for (i, segment) in text.split('\'').enumerate() {
        if i > 0 {
            out.push('\'');
        }
        if !replaced && i % 2 == 0 {
            if let Some(pos) = segment.find(from) {
                out.push_str(&segment[..pos]);
                out.push_str(to);
                out.push_str(&segment[pos + from.len()..]);
                replaced = true;
                continue;
            }
        }
        out.push_str(segment);
    }
    out
}

/// Rewrite the template message with the merged value set
fn squashed_text(template: &str, rule: &SquashRule, values: &BTreeSet<String>) -> String {
    let joined = values.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
    let Some(target) = QUOTED_RE.find_iter(template).nth(rule.squash_index) else {
        return template.to_string();
    };

    let text = format!(
        "{}'{}'{}",
        &template[..target.start()],
        joined,
        &template[target.end()..]
    );
    if values.len() > 1 {
        replace_unquoted(&text, rule.singular, rule.plural)
    } else {
        text
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct PartitionKey {
    id: String,
    operation_id: String,
    operation: String,
    path: String,
    fixed_values: Vec<String>,
    hidden: bool,
}

struct Partition {
    position: usize,
    rule: &'static SquashRule,
    values: BTreeSet<String>,
}

/// Collapse squashable records, keeping first-appearance order
///
/// Records are grouped by identifier and operation, then partitioned by every
/// quoted value except the squashed one and by their hide flag.
pub fn squash(records: Vec<ChangeRecord>) -> Result<Vec<ChangeRecord>, SquashError> {
    let mut out: Vec<ChangeRecord> = Vec::with_capacity(records.len());
    let mut partitions: HashMap<PartitionKey, Partition> = HashMap::new();

    for record in records {
        let Some(rule) = rule_for(&record.id) else {
            out.push(record);
            continue;
        };

        let mut values = quoted_values(&record.text);
        if values.len() != rule.quoted {
            return Err(SquashError::PatternMismatch {
                id: record.id.clone(),
                expected: rule.quoted,
                found: values.len(),
                text: record.text.clone(),
            });
        }
        let squashed = values.remove(rule.squash_index);

        let key = PartitionKey {
            id: record.id.clone(),
            operation_id: record.operation_id.clone(),
            operation: record.operation.clone(),
            path: record.path.clone(),
            fixed_values: values,
            hidden: record.hide_from_changelog,
        };
        match partitions.get_mut(&key) {
            Some(partition) => {
                partition.values.insert(squashed);
            }
            None => {
                partitions.insert(
                    key,
                    Partition {
                        position: out.len(),
                        rule,
                        values: BTreeSet::from([squashed]),
                    },
                );
                out.push(record);
            }
        }
    }

    for partition in partitions.into_values() {
        if partition.values.len() > 1 {
            let record = &mut out[partition.position];
            record.text = squashed_text(&record.text, partition.rule, &partition.values);
        }
    }
    Ok(out)
}
