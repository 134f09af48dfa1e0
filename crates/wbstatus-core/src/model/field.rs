use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::ids::ObjectId;

/// The task fields whose history is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackedField {
    /// Workboard column, scoped to one team project.
    Column,
    Status,
    /// Task owner.
    Assignee,
    Title,
}

impl TrackedField {
    /// All tracked fields in display order.
    pub const ALL: [Self; 4] = [Self::Column, Self::Status, Self::Assignee, Self::Title];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Column => "column",
            Self::Status => "status",
            Self::Assignee => "assignee",
            Self::Title => "title",
        }
    }
}

/// Named workflow stage mapped to a column id by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alias {
    Todo,
    InDev,
    Feedback,
    Done,
    Archive,
}

impl Alias {
    pub const ALL: [Self; 5] = [
        Self::Todo,
        Self::InDev,
        Self::Feedback,
        Self::Done,
        Self::Archive,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InDev => "indev",
            Self::Feedback => "feedback",
            Self::Done => "done",
            Self::Archive => "archive",
        }
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackedField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown field '{s}' (expected one of: {})",
                    Self::ALL.map(Self::as_str).join(", ")
                )
            })
    }
}

/// A field value carried by an event.
///
/// Column and assignee fields hold ids; status and title hold text. Absence
/// of a value altogether is modelled as `Option<Value>::None` by callers,
/// while [`Value::Null`] is an explicit "nothing" recorded in the log.
///
/// Serializes untagged (`null`, or the bare string). There is no
/// `Deserialize`: ids and text are indistinguishable on the wire, so values
/// are only ever built by the normalizer, which knows the field kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Id(ObjectId),
    Text(String),
}

impl Value {
    /// How an empty value is shown to people.
    pub const NONE_LABEL: &'static str = "(none)";

    /// The id carried by this value, if any.
    #[must_use]
    pub const fn as_id(&self) -> Option<&ObjectId> {
        match self {
            Self::Id(id) => Some(id),
            Self::Null | Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Null | Self::Id(_) => None,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True when this value is exactly the given id.
    #[must_use]
    pub fn is_id(&self, id: &ObjectId) -> bool {
        self.as_id() == Some(id)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str(Self::NONE_LABEL),
            Self::Id(id) => write!(f, "{id}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}
