//! Identifier → display name resolution.
//!
//! Names are looked up in one batch per report run: callers gather every id
//! they will display first, call [`IdentifierResolver::resolve_batch`] once,
//! and then render against the resulting [`ResolvedNames`]. Reconstructed
//! state never holds a handle back to the resolver.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::warn;

use crate::model::ObjectId;

/// Source of display names for opaque ids.
pub trait IdentifierResolver {
    /// Resolve every id in `ids`. Ids the source does not know may simply be
    /// missing from the result.
    ///
    /// # Errors
    ///
    /// Any failure reaching the name source. The core does not retry.
    fn resolve_batch(&self, ids: &BTreeSet<ObjectId>) -> anyhow::Result<BTreeMap<ObjectId, String>>;
}

/// An in-memory resolver over a fixed name table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticResolver {
    names: BTreeMap<ObjectId, String>,
}

impl StaticResolver {
    #[must_use]
    pub const fn new(names: BTreeMap<ObjectId, String>) -> Self {
        Self { names }
    }
}

impl FromIterator<(ObjectId, String)> for StaticResolver {
    fn from_iter<T: IntoIterator<Item = (ObjectId, String)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IdentifierResolver for StaticResolver {
    fn resolve_batch(&self, ids: &BTreeSet<ObjectId>) -> anyhow::Result<BTreeMap<ObjectId, String>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.names.get(id).map(|name| (id.clone(), name.clone())))
            .collect())
    }
}

/// The result of the single batch lookup for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedNames {
    names: BTreeMap<ObjectId, String>,
}

impl ResolvedNames {
    /// Resolve `ids` through `resolver` in one call.
    ///
    /// Ids missing from the response are logged once here and render as a
    /// placeholder later.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's own failure.
    pub fn fetch(
        resolver: &dyn IdentifierResolver,
        ids: &BTreeSet<ObjectId>,
    ) -> anyhow::Result<Self> {
        let names = resolver.resolve_batch(ids)?;
        let missing = ids.iter().filter(|id| !names.contains_key(*id)).count();
        if missing > 0 {
            warn!(missing, requested = ids.len(), "some ids have no display name");
        }
        Ok(Self { names })
    }

    #[must_use]
    pub fn get(&self, id: &ObjectId) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Display name for `id`, or a placeholder naming the raw id.
    #[must_use]
    pub fn display(&self, id: &ObjectId) -> String {
        self.get(id)
            .map_or_else(|| format!("(unknown {id})"), str::to_string)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl From<BTreeMap<ObjectId, String>> for ResolvedNames {
    fn from(names: BTreeMap<ObjectId, String>) -> Self {
        Self { names }
    }
}
