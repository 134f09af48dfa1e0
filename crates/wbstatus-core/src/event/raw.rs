//! Raw transaction records as returned by the remote task tracker.
//!
//! The shape of `oldValue`/`newValue` depends on `transactionType`, so both
//! are kept as untyped JSON here and decoded by the normalizer. Every field
//! is untyped and optional at this layer: a record that is missing something,
//! or carries the wrong JSON type somewhere, is still a `RawEvent`, and is
//! dropped later rather than failing the whole log.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors produced while decoding a single raw transaction.
///
/// These never escape normalization; they are logged and the offending
/// transaction is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RawEventError {
    #[error("missing dateCreated")]
    MissingTimestamp,

    #[error("invalid dateCreated {0}")]
    InvalidTimestamp(String),

    #[error(transparent)]
    InvalidId(#[from] crate::model::InvalidId),

    /// A value did not have the shape its transaction type requires.
    #[error("unexpected {slot} shape: expected {expected}, found {found}")]
    UnexpectedShape {
        slot: Slot,
        expected: &'static str,
        found: String,
    },

    #[error("column change has no projectPHID")]
    MissingProject,
}

/// Which part of a transaction a decode error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Author,
    OldValue,
    NewValue,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Author => "authorPHID",
            Self::OldValue => "oldValue",
            Self::NewValue => "newValue",
        })
    }
}

/// One transaction from the remote log, undecoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// String tag such as `projectcolumn`, `status`, `reassign`, `title`.
    #[serde(default)]
    pub transaction_type: serde_json::Value,

    /// Epoch seconds, as an integer or a decimal string.
    #[serde(default, alias = "timestamp")]
    pub date_created: serde_json::Value,

    #[serde(default, rename = "authorPHID")]
    pub author_phid: serde_json::Value,

    #[serde(default)]
    pub old_value: serde_json::Value,

    #[serde(default)]
    pub new_value: serde_json::Value,
}

impl RawEvent {
    /// The transaction tag, if it is a string at all.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.transaction_type.as_str()
    }
}

/// Short description of a JSON value's type, for error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".into(),
        serde_json::Value::Bool(_) => "bool".into(),
        serde_json::Value::Number(n) => format!("number {n}"),
        serde_json::Value::String(_) => "string".into(),
        serde_json::Value::Array(items) => format!("array of {}", items.len()),
        serde_json::Value::Object(_) => "object".into(),
    }
}
