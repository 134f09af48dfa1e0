//! Raw transaction → [`NormalizedEvent`] decoding.
//!
//! Decoding is per field kind: each [`TrackedField`] has one decode path,
//! selected by an exhaustive match. Transactions with untracked tags, and
//! column moves on some other team's board, are dropped without comment.
//! Transactions with a tracked tag but an unexpected payload are dropped
//! with a `debug!` line; one bad transaction never fails the log.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use tracing::debug;

use super::NormalizedEvent;
use super::raw::{RawEvent, RawEventError, Slot, json_kind};
use crate::model::{ObjectId, TrackedField, Value};

/// Normalize one task's raw transaction log.
///
/// Returns the decoded events in input order, plus every id referenced as
/// author, old value or new value. `team_scope` is the project whose
/// workboard columns are tracked; column changes on other boards are dropped.
#[must_use]
pub fn normalize(
    raw_events: &[RawEvent],
    team_scope: &ObjectId,
) -> (Vec<NormalizedEvent>, BTreeSet<ObjectId>) {
    let mut events = Vec::with_capacity(raw_events.len());
    let mut ids = BTreeSet::new();

    for raw in raw_events {
        match decode(raw, team_scope) {
            Ok(Some(event)) => {
                ids.extend(event.author.iter().cloned());
                ids.extend(event.old_value.as_id().cloned());
                ids.extend(event.new_value.as_id().cloned());
                events.push(event);
            }
            Ok(None) => {}
            Err(e) => {
                debug!(
                    transaction_type = %raw.transaction_type,
                    error = %e,
                    "dropping malformed transaction"
                );
            }
        }
    }

    (events, ids)
}

/// Decode a single transaction.
///
/// `Ok(None)` means the transaction is well-formed but not tracked.
///
/// # Errors
///
/// Returns a [`RawEventError`] describing the first malformed part.
pub fn decode(
    raw: &RawEvent,
    team_scope: &ObjectId,
) -> Result<Option<NormalizedEvent>, RawEventError> {
    let Some(field) = raw.tag().and_then(TrackedField::from_transaction_type) else {
        return Ok(None);
    };

    let timestamp = parse_timestamp(&raw.date_created)?;
    let author = decode_author(&raw.author_phid)?;

    let (old_value, new_value) = match field {
        TrackedField::Column => {
            let Some(values) = decode_column(&raw.old_value, &raw.new_value, team_scope)? else {
                return Ok(None);
            };
            values
        }
        TrackedField::Assignee => (
            decode_id(&raw.old_value, Slot::OldValue)?,
            decode_id(&raw.new_value, Slot::NewValue)?,
        ),
        TrackedField::Status | TrackedField::Title => (
            decode_text(&raw.old_value, Slot::OldValue)?,
            decode_text(&raw.new_value, Slot::NewValue)?,
        ),
    };

    Ok(Some(NormalizedEvent {
        field,
        timestamp,
        author,
        old_value,
        new_value,
    }))
}

/// `dateCreated` is epoch seconds, sent either as a number or a string.
fn parse_timestamp(value: &Json) -> Result<DateTime<Utc>, RawEventError> {
    let secs = match value {
        Json::Null => return Err(RawEventError::MissingTimestamp),
        Json::Number(n) => n.as_i64(),
        Json::String(s) => s.trim().parse::<i64>().ok(),
        other => return Err(RawEventError::InvalidTimestamp(json_kind(other))),
    };

    secs.and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| RawEventError::InvalidTimestamp(value.to_string()))
}

fn decode_author(value: &Json) -> Result<Option<ObjectId>, RawEventError> {
    match value {
        Json::Null => Ok(None),
        Json::String(s) => Ok(Some(ObjectId::parse(s)?)),
        other => Err(RawEventError::UnexpectedShape {
            slot: Slot::Author,
            expected: "id or null",
            found: json_kind(other),
        }),
    }
}

fn decode_id(value: &Json, slot: Slot) -> Result<Value, RawEventError> {
    match value {
        Json::Null => Ok(Value::Null),
        Json::String(s) => Ok(Value::Id(ObjectId::parse(s)?)),
        other => Err(RawEventError::UnexpectedShape {
            slot,
            expected: "id or null",
            found: json_kind(other),
        }),
    }
}

fn decode_text(value: &Json, slot: Slot) -> Result<Value, RawEventError> {
    match value {
        Json::Null => Ok(Value::Null),
        Json::String(s) => Ok(Value::Text(s.clone())),
        other => Err(RawEventError::UnexpectedShape {
            slot,
            expected: "string or null",
            found: json_kind(other),
        }),
    }
}

/// Decode a `projectcolumn` payload pair.
///
/// Both sides look like `{"projectPHID": …, "columnPHIDs": …}`. Returns
/// `Ok(None)` when the move happened on a board other than `team_scope`.
fn decode_column(
    old: &Json,
    new: &Json,
    team_scope: &ObjectId,
) -> Result<Option<(Value, Value)>, RawEventError> {
    let Json::Object(new_obj) = new else {
        return Err(RawEventError::UnexpectedShape {
            slot: Slot::NewValue,
            expected: "column object",
            found: json_kind(new),
        });
    };

    let project = new_obj
        .get("projectPHID")
        .and_then(Json::as_str)
        .ok_or(RawEventError::MissingProject)?;
    if project != team_scope.as_str() {
        return Ok(None);
    }

    let new_column = new_obj
        .get("columnPHIDs")
        .map(|v| first_column(v, Slot::NewValue))
        .transpose()?
        .flatten()
        .ok_or_else(|| RawEventError::UnexpectedShape {
            slot: Slot::NewValue,
            expected: "one column id",
            found: new_obj
                .get("columnPHIDs")
                .map_or_else(|| "nothing".into(), json_kind),
        })?;

    let old_column = match old {
        Json::Null => None,
        Json::Object(old_obj) => match old_obj.get("columnPHIDs") {
            Some(v) => first_column(v, Slot::OldValue)?,
            None => None,
        },
        // Some log versions record the bare column id.
        Json::String(_) | Json::Array(_) => first_column(old, Slot::OldValue)?,
        other => {
            return Err(RawEventError::UnexpectedShape {
                slot: Slot::OldValue,
                expected: "column object or null",
                found: json_kind(other),
            });
        }
    };

    Ok(Some((
        old_column.map_or(Value::Null, Value::Id),
        Value::Id(new_column),
    )))
}

/// First column id out of a `columnPHIDs` value.
///
/// Accepts a single id, an array of ids, or an object keyed by id (the old
/// side of a move is recorded this way). Empty collections and `null` yield
/// `None`.
fn first_column(value: &Json, slot: Slot) -> Result<Option<ObjectId>, RawEventError> {
    let candidate = match value {
        Json::Null => return Ok(None),
        Json::String(_) => Some(value),
        Json::Array(items) => items.first(),
        Json::Object(map) => map.values().next(),
        other => {
            return Err(RawEventError::UnexpectedShape {
                slot,
                expected: "column id collection",
                found: json_kind(other),
            });
        }
    };

    match candidate {
        None | Some(Json::Null) => Ok(None),
        Some(Json::String(s)) => Ok(Some(ObjectId::parse(s)?)),
        Some(other) => Err(RawEventError::UnexpectedShape {
            slot,
            expected: "column id",
            found: json_kind(other),
        }),
    }
}
