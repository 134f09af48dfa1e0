//! Field-change events.
//!
//! Raw transactions ([`RawEvent`]) arrive from the remote tracker in log
//! order with kind-dependent payloads. [`normalize`] turns one task's raw log
//! into a uniform sequence of [`NormalizedEvent`]s and reports every id the
//! events mention, so the caller can resolve names in a single batch.

pub mod normalize;
pub mod raw;
pub mod types;

pub use normalize::normalize;
pub use raw::{RawEvent, RawEventError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{ObjectId, TrackedField, Value};

/// One decoded change to a tracked field.
///
/// Immutable once built. Sequences of these are expected to be sorted by
/// `timestamp`; replay trusts that order and never re-sorts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedEvent {
    /// The field this event changes.
    pub field: TrackedField,
    pub timestamp: DateTime<Utc>,
    /// Who made the change. `None` for system-authored transactions.
    pub author: Option<ObjectId>,
    pub old_value: Value,
    pub new_value: Value,
}

impl NormalizedEvent {
    /// Build an event from parts. Mostly useful in tests and fixtures.
    #[must_use]
    pub const fn new(
        field: TrackedField,
        timestamp: DateTime<Utc>,
        author: Option<ObjectId>,
        old_value: Value,
        new_value: Value,
    ) -> Self {
        Self {
            field,
            timestamp,
            author,
            old_value,
            new_value,
        }
    }
}

impl std::fmt::Display for NormalizedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{} -> {}",
            self.timestamp.to_rfc3339(),
            self.author.as_ref().map_or("-", ObjectId::as_str),
            self.field,
            self.old_value,
            self.new_value
        )
    }
}
