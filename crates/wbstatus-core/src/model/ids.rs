//! Identifier newtypes.
//!
//! [`ObjectId`] is an opaque remote identifier (`PHID-USER-…`,
//! `PHID-PCOL-…`, `PHID-PROJ-…`). [`EntityId`] is the short task label that
//! appears on a workboard card (`T123`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when an identifier is empty or contains whitespace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{raw}': must be non-empty and contain no whitespace")]
pub struct InvalidId {
    /// Which identifier kind was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub raw: String,
}

fn validate(kind: &'static str, raw: &str) -> Result<(), InvalidId> {
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return Err(InvalidId {
            kind,
            raw: raw.to_string(),
        });
    }
    Ok(())
}

/// Opaque identifier of a user, column, project or other remote object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse a validated identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidId`] if `raw` is empty or contains whitespace.
    pub fn parse(raw: &str) -> Result<Self, InvalidId> {
        validate("object id", raw)?;
        Ok(Self(raw.to_string()))
    }

    /// Wrap a string without validation.
    ///
    /// Intended for tests and for values that already passed through
    /// [`ObjectId::parse`] elsewhere.
    #[must_use]
    pub fn new_unchecked(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty id, which no well-formed input can produce.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Task label as shown on the workboard (`T123`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Parse a validated task label.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidId`] if `raw` is empty or contains whitespace.
    pub fn parse(raw: &str) -> Result<Self, InvalidId> {
        validate("entity id", raw)?;
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn new_unchecked(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
