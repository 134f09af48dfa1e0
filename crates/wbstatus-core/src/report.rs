//! The report pipeline.
//!
//! Wires the pieces together for one run:
//!
//! 1. snapshot the board at both window ends and diff them
//! 2. fetch every task's transaction log in one call
//! 3. normalize and replay each task on its own
//! 4. invert the per-task actor sets
//! 5. resolve every collected id in one batch
//! 6. render each actor's highlights
//!
//! Collaborator failures abort the run with the matching [`ReportError`].
//! Messy input never does: bad transactions are dropped per task and
//! unknown ids render as placeholders.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::actor::index_by_actor;
use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::event::{RawEvent, normalize};
use crate::model::{EntityId, ObjectId, TrackedField, Value};
use crate::narrative::{ActorReport, render};
use crate::replay::{EntityState, Window, reconstruct};
use crate::resolve::{IdentifierResolver, ResolvedNames};
use crate::snapshot::{LabelChange, SnapshotProvider, diff};

/// Source of raw transaction logs.
pub trait TransactionProvider {
    /// Logs for `entities`, each in log order.
    ///
    /// Tasks with no log may be missing from the result.
    ///
    /// # Errors
    ///
    /// Any failure reaching the log source. The core does not retry.
    fn transactions_for(
        &self,
        entities: &[EntityId],
    ) -> anyhow::Result<BTreeMap<EntityId, Vec<RawEvent>>>;
}

/// The three collaborators one run talks to.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub snapshots: &'a dyn SnapshotProvider,
    pub transactions: &'a dyn TransactionProvider,
    pub names: &'a dyn IdentifierResolver,
}

/// What to report on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub window: Window,
    /// Tasks to include even if the board did not change for them.
    pub entities: Vec<EntityId>,
    /// Caller-known titles. These win over replayed titles.
    pub titles: BTreeMap<EntityId, String>,
}

impl ReportRequest {
    #[must_use]
    pub const fn new(window: Window) -> Self {
        Self {
            window,
            entities: Vec::new(),
            titles: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_entities(mut self, entities: impl IntoIterator<Item = EntityId>) -> Self {
        self.entities.extend(entities);
        self
    }

    #[must_use]
    pub fn with_titles(mut self, titles: BTreeMap<EntityId, String>) -> Self {
        self.titles = titles;
        self
    }
}

/// A finished report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub window: Window,
    /// Tasks whose board column changed between the two snapshots.
    pub board_changes: BTreeMap<EntityId, LabelChange>,
    /// One section per actor with something to say, ordered by actor id.
    pub actors: Vec<ActorReport>,
}

impl Report {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

/// Normalize and replay one task's raw log.
///
/// Returns the reconstructed state and every id the log mentions.
#[must_use]
pub fn reconstruct_entity(
    raw: &[RawEvent],
    window: Window,
    config: &ReportConfig,
) -> (EntityState, BTreeSet<ObjectId>) {
    let (events, ids) = normalize(raw, &config.team_phid);
    let state = reconstruct(&events, window, &config.workboard_state_phids);
    (state, ids)
}

/// Run the whole pipeline for `request`.
///
/// # Errors
///
/// - [`ReportError::InvalidWindow`] if the window does not open before it closes
/// - [`ReportError::Snapshot`], [`ReportError::Transactions`] or
///   [`ReportError::Resolve`] when a collaborator fails
/// - [`ReportError::EmptyActorId`] if a reconstructed state is corrupt
pub fn build_report(
    request: &ReportRequest,
    sources: Sources<'_>,
    config: &ReportConfig,
) -> Result<Report, ReportError> {
    let window = request.window;
    if !window.is_ordered() {
        return Err(ReportError::InvalidWindow {
            start: window.start.to_rfc3339(),
            end: window.end.to_rfc3339(),
        });
    }

    let before = sources
        .snapshots
        .snapshot(window.start)
        .map_err(ReportError::Snapshot)?;
    let after = sources
        .snapshots
        .snapshot(window.end)
        .map_err(ReportError::Snapshot)?;
    let board_changes = diff(&before, &after);

    let universe: BTreeSet<EntityId> = board_changes
        .keys()
        .chain(request.entities.iter())
        .cloned()
        .collect();
    let entities: Vec<EntityId> = universe.into_iter().collect();
    info!(
        tasks = entities.len(),
        board_changes = board_changes.len(),
        "collected tasks"
    );

    let logs = sources
        .transactions
        .transactions_for(&entities)
        .map_err(ReportError::Transactions)?;

    let mut ids = BTreeSet::new();
    let mut states = BTreeMap::new();
    for entity in &entities {
        let raw = logs.get(entity).map_or(&[][..], Vec::as_slice);
        if raw.is_empty() {
            debug!(%entity, "no transactions for task");
        }
        let (state, seen) = reconstruct_entity(raw, window, config);
        ids.extend(seen);
        states.insert(entity.clone(), state);
    }

    let index = index_by_actor(&states)?;
    ids.extend(index.keys().cloned());

    let names = ResolvedNames::fetch(sources.names, &ids).map_err(ReportError::Resolve)?;
    let titles = titles_for(&states, &request.titles);

    let actors: Vec<ActorReport> = index
        .values()
        .map(|actor| render(actor, &states, &titles, &names, &config.workboard_state_phids))
        .filter(|section| !section.is_empty())
        .collect();

    info!(
        actors = actors.len(),
        names = names.len(),
        "report ready"
    );

    Ok(Report {
        window,
        board_changes,
        actors,
    })
}

/// Caller titles first, then each task's title at window close.
fn titles_for(
    states: &BTreeMap<EntityId, EntityState>,
    known: &BTreeMap<EntityId, String>,
) -> BTreeMap<EntityId, String> {
    states
        .iter()
        .filter_map(|(entity, state)| {
            let title = known.get(entity).cloned().or_else(|| {
                state
                    .field(TrackedField::Title)
                    .end
                    .as_ref()
                    .and_then(Value::as_text)
                    .map(str::to_string)
            })?;
            Some((entity.clone(), title))
        })
        .collect()
}
