//! Interval state reconstruction.
//!
//! Replays one task's normalized event log and answers, for every tracked
//! field, "what was it when the window opened, and what is it when the
//! window closes", using nothing but point-in-time deltas.
//!
//! # Algorithm
//!
//! A single forward pass over events sorted by timestamp:
//!
//! 1. Events strictly after `window.end` stop the pass.
//! 2. For each field, the first event at or after `window.start` fixes
//!    `start` to that event's old value, unless a pre-window event already
//!    set it. Every pre-window event overwrites `start` with its new value,
//!    so the last change before the window wins.
//! 3. Every processed event overwrites `end` with its new value.
//! 4. Authors of events strictly after `window.start` become actors.
//! 5. Column moves into an alias column (from a different column) record a
//!    dwell marker for that alias, overwriting earlier entries.
//!
//! After the pass the final assignee, if any, is also an actor.
//!
//! The input order is trusted. Out-of-order logs produce a best-effort
//! answer, never a panic.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::WorkflowAliases;
use crate::event::NormalizedEvent;
use crate::model::{Alias, ObjectId, TrackedField, Value};

/// The `[start, end]` query interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// True when `start` is strictly before `end`.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.start < self.end
    }
}

/// A field's value at both ends of the window.
///
/// `None` means nothing is known: the field had no event at or before the
/// window end. That is "no information", not "unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldInterval {
    pub start: Option<Value>,
    pub end: Option<Value>,
}

static ABSENT: FieldInterval = FieldInterval {
    start: None,
    end: None,
};

impl FieldInterval {
    /// Id held when the window opened, if the value is an id.
    #[must_use]
    pub fn start_id(&self) -> Option<&ObjectId> {
        self.start.as_ref().and_then(Value::as_id)
    }

    /// Id held when the window closed, if the value is an id.
    #[must_use]
    pub fn end_id(&self) -> Option<&ObjectId> {
        self.end.as_ref().and_then(Value::as_id)
    }

    /// True when at least one event touched this field.
    #[must_use]
    pub const fn is_observed(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// True when the value differs between the two window ends.
    ///
    /// An explicit `null` and an absent value compare equal here: neither
    /// names anything a reader could have seen.
    #[must_use]
    pub fn changed(&self) -> bool {
        significant(self.start.as_ref()) != significant(self.end.as_ref())
    }
}

fn significant(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Reconstructed state of one task over one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityState {
    /// One interval per [`TrackedField`]; every field is always present.
    pub fields: BTreeMap<TrackedField, FieldInterval>,
    /// Everyone attributed with this task during the window.
    pub actors: BTreeSet<ObjectId>,
    /// Most recent entry into each alias column.
    pub since_markers: BTreeMap<Alias, DateTime<Utc>>,
}

impl Default for EntityState {
    fn default() -> Self {
        Self {
            fields: TrackedField::ALL
                .into_iter()
                .map(|field| (field, FieldInterval::default()))
                .collect(),
            actors: BTreeSet::new(),
            since_markers: BTreeMap::new(),
        }
    }
}

impl EntityState {
    /// Interval for `field`.
    #[must_use]
    pub fn field(&self, field: TrackedField) -> &FieldInterval {
        self.fields.get(&field).unwrap_or(&ABSENT)
    }

    /// When the task most recently entered `alias`'s column, if it did.
    #[must_use]
    pub fn since(&self, alias: Alias) -> Option<DateTime<Utc>> {
        self.since_markers.get(&alias).copied()
    }

    /// The current assignee at the close of the window.
    #[must_use]
    pub fn assignee(&self) -> Option<&ObjectId> {
        self.field(TrackedField::Assignee).end_id()
    }
}

/// Reconstruct one task's state over `window`.
///
/// `events` must be sorted ascending by timestamp. Pure: the same inputs
/// always produce the same state.
#[must_use]
pub fn reconstruct(
    events: &[NormalizedEvent],
    window: Window,
    aliases: &WorkflowAliases,
) -> EntityState {
    let mut state = EntityState::default();

    for event in events {
        if event.timestamp > window.end {
            break;
        }

        let interval = state.fields.entry(event.field).or_default();
        if !interval.is_observed() && event.timestamp >= window.start {
            interval.start = Some(event.old_value.clone());
        } else if event.timestamp < window.start {
            interval.start = Some(event.new_value.clone());
        }
        interval.end = Some(event.new_value.clone());

        if let Some(author) = event
            .author
            .as_ref()
            .filter(|_| event.timestamp > window.start)
        {
            state.actors.insert(author.clone());
        }

        if event.field == TrackedField::Column {
            for (alias, column) in aliases.iter() {
                if event.new_value.is_id(column) && !event.old_value.is_id(column) {
                    state.since_markers.insert(alias, event.timestamp);
                }
            }
        }
    }

    if let Some(assignee) = state.assignee().cloned() {
        state.actors.insert(assignee);
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).expect("valid ts")
    }

    fn user(name: &str) -> ObjectId {
        ObjectId::new_unchecked(format!("PHID-USER-{name}"))
    }

    fn column(name: &str) -> Value {
        Value::Id(ObjectId::new_unchecked(format!("PHID-PCOL-{name}")))
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn aliases() -> WorkflowAliases {
        let col = |n: &str| ObjectId::new_unchecked(format!("PHID-PCOL-{n}"));
        WorkflowAliases {
            todo: col("todo"),
            indev: col("indev"),
            feedback: col("feedback"),
            done: col("done"),
            archive: col("archive"),
        }
    }

    fn title_event(at: i64, old: Option<&str>, new: &str) -> NormalizedEvent {
        NormalizedEvent::new(
            TrackedField::Title,
            ts(at),
            Some(user("blahblahblah")),
            old.map_or(Value::Null, text),
            text(new),
        )
    }

    fn title_chain() -> Vec<NormalizedEvent> {
        vec![
            title_event(1_500_000_000, None, "A"),
            title_event(1_500_050_000, Some("A"), "B"),
            title_event(1_500_100_000, Some("B"), "C"),
            title_event(1_500_150_000, Some("C"), "D"),
            title_event(1_500_200_000, Some("D"), "E"),
            title_event(1_500_400_000, Some("E"), "F"),
        ]
    }

    #[test]
    fn title_chain_window_yields_last_pre_window_and_last_in_window() {
        let window = Window::new(ts(1_500_100_001), ts(1_500_300_000));
        let state = reconstruct(&title_chain(), window, &aliases());

        let title = state.field(TrackedField::Title);
        assert_eq!(title.start, Some(text("C")));
        assert_eq!(title.end, Some(text("E")));
    }

    #[test]
    fn empty_log_yields_absent_everything() {
        let window = Window::new(ts(0), ts(100));
        let state = reconstruct(&[], window, &aliases());

        for field in TrackedField::ALL {
            assert_eq!(state.field(field), &FieldInterval::default());
        }
        assert!(state.actors.is_empty());
        assert!(state.since_markers.is_empty());
        assert_eq!(state, EntityState::default());
    }

    #[test]
    fn first_in_window_event_captures_old_value() {
        let events = vec![title_event(50, Some("before"), "after")];
        let state = reconstruct(&events, Window::new(ts(10), ts(100)), &aliases());
        let title = state.field(TrackedField::Title);
        assert_eq!(title.start, Some(text("before")));
        assert_eq!(title.end, Some(text("after")));
    }

    #[test]
    fn event_at_window_start_is_in_window() {
        let events = vec![title_event(10, Some("old"), "new")];
        let state = reconstruct(&events, Window::new(ts(10), ts(100)), &aliases());
        assert_eq!(state.field(TrackedField::Title).start, Some(text("old")));
        // Attribution needs a change strictly after the window opens.
        assert!(state.actors.is_empty());
    }

    #[test]
    fn event_at_window_end_is_included_and_later_ones_are_not() {
        let events = vec![
            title_event(50, Some("a"), "b"),
            title_event(100, Some("b"), "c"),
            title_event(101, Some("c"), "d"),
        ];
        let state = reconstruct(&events, Window::new(ts(10), ts(100)), &aliases());
        let title = state.field(TrackedField::Title);
        assert_eq!(title.start, Some(text("a")));
        assert_eq!(title.end, Some(text("c")));
    }

    #[test]
    fn pre_window_only_field_has_equal_ends() {
        let events = vec![title_event(5, None, "x")];
        let state = reconstruct(&events, Window::new(ts(10), ts(100)), &aliases());
        let title = state.field(TrackedField::Title);
        assert_eq!(title.start, Some(text("x")));
        assert_eq!(title.end, Some(text("x")));
        assert!(!title.changed());
        assert!(state.actors.is_empty(), "pre-window author is not an actor");
    }

    #[test]
    fn untouched_fields_stay_absent() {
        let events = vec![title_event(50, Some("a"), "b")];
        let state = reconstruct(&events, Window::new(ts(10), ts(100)), &aliases());
        let status = state.field(TrackedField::Status);
        assert!(!status.is_observed());
        assert!(!status.changed());
    }

    #[test]
    fn current_assignee_is_an_actor_without_in_window_events() {
        let events = vec![NormalizedEvent::new(
            TrackedField::Assignee,
            ts(5),
            Some(user("admin")),
            Value::Null,
            Value::Id(user("dev")),
        )];
        let state = reconstruct(&events, Window::new(ts(10), ts(100)), &aliases());
        assert_eq!(state.assignee(), Some(&user("dev")));
        assert_eq!(state.actors, BTreeSet::from([user("dev")]));
    }

    #[test]
    fn dwell_marker_tracks_most_recent_entry() {
        let move_col = |at: i64, from: Value, to: Value| {
            NormalizedEvent::new(TrackedField::Column, ts(at), Some(user("dev")), from, to)
        };
        let events = vec![
            move_col(5, Value::Null, column("todo")),
            move_col(20, column("todo"), column("indev")),
            move_col(30, column("indev"), column("feedback")),
            move_col(40, column("feedback"), column("indev")),
            // Re-recording the same column is not an entry.
            move_col(45, column("indev"), column("indev")),
        ];
        let state = reconstruct(&events, Window::new(ts(10), ts(100)), &aliases());

        assert_eq!(state.since(Alias::Todo), Some(ts(5)));
        assert_eq!(state.since(Alias::InDev), Some(ts(40)));
        assert_eq!(state.since(Alias::Feedback), Some(ts(30)));
        assert_eq!(state.since(Alias::Done), None);

        let col = state.field(TrackedField::Column);
        assert_eq!(col.start, Some(column("todo")));
        assert_eq!(col.end, Some(column("indev")));
    }

    #[test]
    fn changed_treats_null_like_absent() {
        let interval = FieldInterval {
            start: Some(Value::Null),
            end: None,
        };
        assert!(interval.is_observed());
        assert!(!interval.changed());

        let interval = FieldInterval {
            start: Some(Value::Null),
            end: Some(text("x")),
        };
        assert!(interval.changed());
    }

    #[test]
    fn reconstruct_is_deterministic() {
        let window = Window::new(ts(1_500_100_001), ts(1_500_300_000));
        let events = title_chain();
        assert_eq!(
            reconstruct(&events, window, &aliases()),
            reconstruct(&events, window, &aliases())
        );
    }
}
