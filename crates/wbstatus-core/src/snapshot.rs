//! Point-in-time workboard snapshots and their difference.
//!
//! A snapshot maps each task label on the board to the column header it sat
//! under. Diffing two snapshots yields the tasks whose column changed,
//! appeared or disappeared, which seeds the set of tasks a report looks at.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::EntityId;

/// Task label → column label at one instant.
pub type Snapshot = BTreeMap<EntityId, String>;

/// Source of workboard snapshots.
pub trait SnapshotProvider {
    /// Snapshot of the board as of `at`.
    ///
    /// # Errors
    ///
    /// Any failure to obtain the snapshot. The core does not retry.
    fn snapshot(&self, at: DateTime<Utc>) -> anyhow::Result<Snapshot>;
}

/// How one task's label differs between two snapshots.
///
/// `None` on either side means the task was not on the board then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelChange {
    pub before: Option<String>,
    pub after: Option<String>,
}

/// Tasks whose label differs between `before` and `after`.
///
/// A key is present iff `before.get(k) != after.get(k)`; presence versus
/// absence counts as a difference.
#[must_use]
pub fn diff(before: &Snapshot, after: &Snapshot) -> BTreeMap<EntityId, LabelChange> {
    let keys: BTreeSet<&EntityId> = before.keys().chain(after.keys()).collect();

    keys.into_iter()
        .filter_map(|key| {
            let old = before.get(key);
            let new = after.get(key);
            (old != new).then(|| {
                (
                    key.clone(),
                    LabelChange {
                        before: old.cloned(),
                        after: new.cloned(),
                    },
                )
            })
        })
        .collect()
}
