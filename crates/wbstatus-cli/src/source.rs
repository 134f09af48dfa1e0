//! File-backed collaborators.
//!
//! A data directory holds cached board scrapes and API responses:
//!
//! ```text
//! <data-dir>/
//!   workboard-2017-07-14T02.json   # {"T123": "In Development", ...}
//!   transactions.json              # {"T123": [<raw transaction>, ...], ...}
//!   names.json                     # {"PHID-USER-...": "dana", ...}
//! ```
//!
//! Snapshots are hourly. Asking for an instant picks the newest snapshot
//! taken at or before it. Transaction logs are decoded one entry at a time;
//! an entry that is not a transaction object is dropped on its own.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use tracing::{debug, warn};
use wbstatus_core::TransactionProvider;
use wbstatus_core::event::RawEvent;
use wbstatus_core::model::{EntityId, ObjectId};
use wbstatus_core::resolve::IdentifierResolver;
use wbstatus_core::snapshot::{Snapshot, SnapshotProvider};

const SNAPSHOT_PREFIX: &str = "workboard-";
const SNAPSHOT_SUFFIX: &str = ".json";
const SNAPSHOT_STAMP: &str = "%Y-%m-%dT%H";
pub const TRANSACTIONS_FILE: &str = "transactions.json";
pub const NAMES_FILE: &str = "names.json";

/// A directory of cached collaborator data.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            bail!("data directory {} does not exist", root.display());
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// File name of the snapshot taken in `at`'s hour.
    pub fn snapshot_file_name(at: DateTime<Utc>) -> String {
        format!(
            "{SNAPSHOT_PREFIX}{}{SNAPSHOT_SUFFIX}",
            at.format(SNAPSHOT_STAMP)
        )
    }

    /// Every snapshot in the directory, oldest first.
    fn snapshots(&self) -> Result<BTreeMap<DateTime<Utc>, PathBuf>> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read {}", self.root.display()))?;

        let mut found = BTreeMap::new();
        for entry in entries {
            let path = entry?.path();
            let Some(taken) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_snapshot_name)
            else {
                continue;
            };
            found.insert(taken, path);
        }
        Ok(found)
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// Snapshot time from a `workboard-<YYYY-MM-DDTHH>.json` file name.
fn parse_snapshot_name(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name
        .strip_prefix(SNAPSHOT_PREFIX)?
        .strip_suffix(SNAPSHOT_SUFFIX)?;
    NaiveDateTime::parse_from_str(&format!("{stamp}:00"), &format!("{SNAPSHOT_STAMP}:%M"))
        .ok()
        .map(|naive| naive.and_utc())
}

impl SnapshotProvider for DataDir {
    fn snapshot(&self, at: DateTime<Utc>) -> Result<Snapshot> {
        let snapshots = self.snapshots()?;
        let Some((taken, path)) = snapshots.range(..=at).next_back() else {
            bail!(
                "no workboard snapshot at or before {} in {} (expected {})",
                at.to_rfc3339(),
                self.root.display(),
                Self::snapshot_file_name(at)
            );
        };
        debug!(path = %path.display(), taken = %taken, "using snapshot");
        Self::read_json(path)
    }
}

impl TransactionProvider for DataDir {
    fn transactions_for(&self, entities: &[EntityId]) -> Result<BTreeMap<EntityId, Vec<RawEvent>>> {
        let mut all: BTreeMap<EntityId, Json> =
            Self::read_json(&self.root.join(TRANSACTIONS_FILE))?;
        Ok(entities
            .iter()
            .filter_map(|entity| all.remove_entry(entity))
            .map(|(entity, log)| {
                let events = decode_log(&entity, log);
                (entity, events)
            })
            .collect())
    }
}

/// Decode one task's log, skipping entries that are not transaction objects.
fn decode_log(entity: &EntityId, log: Json) -> Vec<RawEvent> {
    let Json::Array(entries) = log else {
        warn!(%entity, "transaction log is not an array; ignoring it");
        return Vec::new();
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(raw) => Some(raw),
            Err(err) => {
                debug!(%entity, index, error = %err, "dropping undecodable transaction");
                None
            }
        })
        .collect()
}

impl IdentifierResolver for DataDir {
    fn resolve_batch(&self, ids: &BTreeSet<ObjectId>) -> Result<BTreeMap<ObjectId, String>> {
        let path = self.root.join(NAMES_FILE);
        if !path.exists() {
            warn!(path = %path.display(), "no name table; ids will show unresolved");
            return Ok(BTreeMap::new());
        }
        let mut names: BTreeMap<ObjectId, String> = Self::read_json(&path)?;
        names.retain(|id, _| ids.contains(id));
        Ok(names)
    }
}
