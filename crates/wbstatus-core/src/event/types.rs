//! Mapping between remote transaction-type tags and tracked fields.
//!
//! The remote log uses free-form string tags. Only the four tags below are
//! replayed; everything else (comments, subscribers, priority, …) is ignored.

use crate::model::TrackedField;

impl TrackedField {
    /// Map a remote transaction tag to the field it mutates.
    ///
    /// Returns `None` for tags that are not tracked.
    #[must_use]
    pub fn from_transaction_type(tag: &str) -> Option<Self> {
        match tag {
            "projectcolumn" => Some(Self::Column),
            "status" => Some(Self::Status),
            "reassign" => Some(Self::Assignee),
            "title" => Some(Self::Title),
            _ => None,
        }
    }
}
