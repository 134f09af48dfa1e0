//! Per-actor highlight rendering.
//!
//! Turns reconstructed task states into short, human-readable highlights for
//! one actor. The rules are evaluated top to bottom for every task the actor
//! touched; each rule contributes at most one highlight, and a task that
//! yields none is left out of the actor's section entirely.
//!
//! | Rule            | Condition                                              | Highlight                    |
//! |-----------------|--------------------------------------------------------|------------------------------|
//! | unassigned      | assignee was the actor at start, is not at end         | `Unassigned`                 |
//! | column moved    | actor is assignee, column changed (not done → archive) | `Started`, `Completed`, …    |
//! | status changed  | actor is assignee, column same, status changed         | `<old> → <new>`              |
//! | newly assigned  | actor is assignee, nothing else changed, was not before | `Assigned`                  |
//! | still working   | actor is assignee, in development at both ends         | `Still working on it …`      |
//! | waiting         | actor is assignee, in feedback at both ends            | `Waiting for feedback …`     |

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::actor::Actor;
use crate::config::WorkflowAliases;
use crate::model::{Alias, EntityId, ObjectId, TrackedField, Value};
use crate::replay::EntityState;
use crate::resolve::ResolvedNames;

/// One noteworthy thing that happened to a task, from an actor's view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Highlight {
    Unassigned,
    /// Moved into development from to-do or from no column.
    Started,
    /// Moved into done or archive.
    Completed,
    AskingForFeedback,
    /// Any other column move, with resolved column names.
    ColumnMoved { from: String, to: String },
    StatusChanged { from: String, to: String },
    Assigned,
    StillWorking { since: Option<DateTime<Utc>> },
    WaitingForFeedback { since: Option<DateTime<Utc>> },
}

fn fmt_since(since: Option<DateTime<Utc>>) -> String {
    since.map_or_else(|| "unknown".to_string(), |ts| ts.format("%Y-%m-%d").to_string())
}

impl fmt::Display for Highlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unassigned => f.write_str("Unassigned"),
            Self::Started => f.write_str("Started"),
            Self::Completed => f.write_str("Completed"),
            Self::AskingForFeedback => f.write_str("Asking for feedback"),
            Self::ColumnMoved { from, to } | Self::StatusChanged { from, to } => {
                write!(f, "{from} → {to}")
            }
            Self::Assigned => f.write_str("Assigned"),
            Self::StillWorking { since } => {
                write!(f, "Still working on it (since {})", fmt_since(*since))
            }
            Self::WaitingForFeedback { since } => {
                write!(f, "Waiting for feedback since {}", fmt_since(*since))
            }
        }
    }
}

/// All highlights for one task in an actor's section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityHighlights {
    pub entity: EntityId,
    pub title: String,
    pub highlights: Vec<Highlight>,
}

/// One actor's section of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorReport {
    pub actor: ObjectId,
    pub name: String,
    pub entries: Vec<EntityHighlights>,
}

impl ActorReport {
    /// Plain narrative lines, one per highlight: `T12 Fix login: Started`.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|entry| {
                entry
                    .highlights
                    .iter()
                    .map(move |h| format!("{} {}: {h}", entry.entity, entry.title))
            })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Render `actor`'s section.
///
/// Tasks are visited in `actor.entities` order. Titles fall back to the task
/// id when `titles` has none.
#[must_use]
pub fn render(
    actor: &Actor,
    states: &BTreeMap<EntityId, EntityState>,
    titles: &BTreeMap<EntityId, String>,
    names: &ResolvedNames,
    aliases: &WorkflowAliases,
) -> ActorReport {
    let entries = actor
        .entities
        .iter()
        .filter_map(|entity| {
            let Some(state) = states.get(entity) else {
                debug!(%entity, actor = %actor.id, "no reconstructed state for task");
                return None;
            };
            let highlights = highlights_for(&actor.id, state, names, aliases);
            if highlights.is_empty() {
                return None;
            }
            Some(EntityHighlights {
                entity: entity.clone(),
                title: titles
                    .get(entity)
                    .cloned()
                    .unwrap_or_else(|| entity.to_string()),
                highlights,
            })
        })
        .collect();

    ActorReport {
        actor: actor.id.clone(),
        name: names.display(&actor.id),
        entries,
    }
}

/// Apply every highlight rule for one actor and one task.
#[must_use]
pub fn highlights_for(
    actor: &ObjectId,
    state: &EntityState,
    names: &ResolvedNames,
    aliases: &WorkflowAliases,
) -> Vec<Highlight> {
    let mut out = Vec::new();
    let assignee = state.field(TrackedField::Assignee);
    let column = state.field(TrackedField::Column);
    let status = state.field(TrackedField::Status);

    let was_assignee = assignee.start_id() == Some(actor);
    let is_assignee = assignee.end_id() == Some(actor);
    let in_alias = |id: Option<&ObjectId>, alias: Alias| id == Some(aliases.column(alias));

    if was_assignee && !is_assignee {
        out.push(Highlight::Unassigned);
    }

    if is_assignee {
        let from = column.start_id();
        let to = column.end_id();

        if in_alias(from, Alias::Done) && in_alias(to, Alias::Archive) {
            // Archiving finished work is not news.
        } else if column.changed() {
            out.push(if in_alias(to, Alias::InDev) && (from.is_none() || in_alias(from, Alias::Todo)) {
                Highlight::Started
            } else if in_alias(to, Alias::Done) || in_alias(to, Alias::Archive) {
                Highlight::Completed
            } else if in_alias(to, Alias::Feedback) {
                Highlight::AskingForFeedback
            } else {
                Highlight::ColumnMoved {
                    from: value_name(column.start.as_ref(), names),
                    to: value_name(column.end.as_ref(), names),
                }
            });
        } else if status.changed() {
            out.push(Highlight::StatusChanged {
                from: value_name(status.start.as_ref(), names),
                to: value_name(status.end.as_ref(), names),
            });
        } else if !was_assignee {
            out.push(Highlight::Assigned);
        }

        if in_alias(from, Alias::InDev) && in_alias(to, Alias::InDev) {
            out.push(Highlight::StillWorking {
                since: state.since(Alias::InDev),
            });
        }
        if in_alias(from, Alias::Feedback) && in_alias(to, Alias::Feedback) {
            out.push(Highlight::WaitingForFeedback {
                since: state.since(Alias::Feedback),
            });
        }
    }

    out
}

fn value_name(value: Option<&Value>, names: &ResolvedNames) -> String {
    match value {
        None | Some(Value::Null) => Value::NONE_LABEL.to_string(),
        Some(Value::Id(id)) => names.display(id),
        Some(Value::Text(text)) => text.clone(),
    }
}
