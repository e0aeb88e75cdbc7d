//! Changes that do not come from the diff engine
//!
//! Operations whose sunset date passed since the previous run get an
//! `endpoint-removed` record dated on the sunset. Operations may also carry
//! hand-written notes in `x-xgen-changelog`, keyed by date.

use crate::filter::resolver::{find_latest_match, variant_version};
use crate::models::change_record::ENDPOINT_REMOVED;
use crate::models::document::{all_operations, content_variants};
use crate::models::extension::{get_date, get_object, to_date, Extensions, X_CHANGELOG, X_SUNSET};
use crate::models::{ChangeRecord, ChangeType, Changelog, Severity, Version};
use chrono::NaiveDate;
use openapiv3::{OpenAPI, Operation};
use serde_json::Value;
use tracing::{debug, warn};

/// Identifier of hand-written changelog notes
pub const MANUAL_CHANGE: &str = "manual-change";

const ENDPOINT_REMOVED_TEXT: &str = "endpoint removed";

/// Dates after the previous run up to and including the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunWindow {
    pub previous: NaiveDate,
    pub current: NaiveDate,
}

impl RunWindow {
    pub fn new(previous: NaiveDate, current: NaiveDate) -> Self {
        Self { previous, current }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.previous < date && date <= self.current
    }
}

/// A record with the date and version it is filed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedChange {
    pub date: NaiveDate,
    pub version: Version,
    pub change_type: ChangeType,
    pub record: ChangeRecord,
}

fn read_date(ext: &Extensions) -> Option<NaiveDate> {
    match get_date(ext, X_SUNSET) {
        Ok(date) => date,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable sunset");
            None
        }
    }
}

/// Sunset of the operation's variant for `version`, falling back to the
/// operation level
pub fn operation_sunset(op: &Operation, version: &Version) -> Option<NaiveDate> {
    let latest = find_latest_match(op, version);
    content_variants(op)
        .into_iter()
        .filter(|(ct, _)| variant_version(ct).as_ref() == Some(&latest))
        .find_map(|(_, media)| read_date(&media.extensions))
        .or_else(|| read_date(&op.extensions))
}

/// `endpoint-removed` records for sunsets inside `window` not yet in `history`
pub fn sunset_removals(history: &Changelog, window: RunWindow, version: &Version, doc: &OpenAPI) -> Vec<DatedChange> {
    let mut changes = Vec::new();
    for (path, method, op) in all_operations(doc) {
        let Some(sunset) = operation_sunset(op, version) else {
            continue;
        };
        if !window.contains(sunset) {
            continue;
        }
        if history.contains(sunset, path, method, version.label(), ENDPOINT_REMOVED) {
            debug!(path, method, %sunset, "Sunset removal already recorded");
            continue;
        }
        changes.push(DatedChange {
            date: sunset,
            version: version.clone(),
            change_type: ChangeType::Remove,
            record: ChangeRecord::new(
                ENDPOINT_REMOVED,
                ENDPOINT_REMOVED_TEXT,
                Severity::Error,
                method,
                op.operation_id.clone().unwrap_or_default(),
                path,
            ),
        });
    }
    changes
}

/// Hand-written notes dated inside `window`
pub fn manual_entries(window: RunWindow, version: &Version, doc: &OpenAPI) -> Vec<DatedChange> {
    let mut changes = Vec::new();
    for (path, method, op) in all_operations(doc) {
        let notes = match get_object(&op.extensions, X_CHANGELOG) {
            Ok(Some(notes)) => notes,
            Ok(None) => continue,
            Err(e) => {
                warn!(path, method, error = %e, "Ignoring malformed changelog notes");
                continue;
            }
        };

        for (raw_date, note) in notes {
            let Some(date) = to_date(raw_date) else {
                warn!(path, method, date = %raw_date, "Ignoring changelog note with invalid date");
                continue;
            };
            let Value::String(text) = note else {
                warn!(path, method, date = %raw_date, "Ignoring changelog note that is not text");
                continue;
            };
            if !window.contains(date) {
                continue;
            }
            changes.push(DatedChange {
                date,
                version: version.clone(),
                change_type: ChangeType::Update,
                record: ChangeRecord::new(
                    MANUAL_CHANGE,
                    text.as_str(),
                    Severity::Info,
                    method,
                    op.operation_id.clone().unwrap_or_default(),
                    path,
                ),
            });
        }
    }
    changes
}
