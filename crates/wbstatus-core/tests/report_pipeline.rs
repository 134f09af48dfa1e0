//! Integration tests: the full report pipeline over in-memory collaborators.
//!
//! Covers:
//!   - board diff seeding the task set, plus explicitly requested tasks
//!   - one transaction fetch and one name lookup per run
//!   - every highlight class reaching the rendered report
//!   - reassignment attributing the new assignee, not the old one
//!   - malformed transactions and foreign boards being dropped per task
//!   - collaborator failures surfacing as typed errors

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde_json::json;
use wbstatus_core::config::{ReportConfig, parse_config};
use wbstatus_core::event::RawEvent;
use wbstatus_core::model::{EntityId, ObjectId};
use wbstatus_core::narrative::Highlight;
use wbstatus_core::replay::Window;
use wbstatus_core::resolve::{IdentifierResolver, StaticResolver};
use wbstatus_core::snapshot::{Snapshot, SnapshotProvider};
use wbstatus_core::{
    ErrorCode, Report, ReportError, ReportRequest, Sources, TransactionProvider, build_report,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const BASE: i64 = 1_500_000_000;
const TEAM: &str = "PHID-PROJ-team";

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).expect("valid ts")
}

fn window() -> Window {
    Window::new(ts(BASE + 100_000), ts(BASE + 400_000))
}

fn task(id: &str) -> EntityId {
    EntityId::new_unchecked(id)
}

fn user(name: &str) -> ObjectId {
    ObjectId::new_unchecked(format!("PHID-USER-{name}"))
}

fn config() -> ReportConfig {
    parse_config(
        r#"
team_phid = "PHID-PROJ-team"

[workboard_state_phids]
todo = "PHID-PCOL-todo"
indev = "PHID-PCOL-indev"
feedback = "PHID-PCOL-feedback"
done = "PHID-PCOL-done"
archive = "PHID-PCOL-archive"
"#,
    )
    .expect("config")
}

fn raw(value: serde_json::Value) -> RawEvent {
    serde_json::from_value(value).expect("raw event")
}

fn reassign(at: i64, author: &str, old: Option<&str>, new: &str) -> RawEvent {
    raw(json!({
        "transactionType": "reassign",
        "dateCreated": at.to_string(),
        "authorPHID": format!("PHID-USER-{author}"),
        "oldValue": old.map(|o| format!("PHID-USER-{o}")),
        "newValue": format!("PHID-USER-{new}"),
    }))
}

fn column_on(board: &str, at: i64, author: &str, from: Option<&str>, to: &str) -> RawEvent {
    raw(json!({
        "transactionType": "projectcolumn",
        "dateCreated": at,
        "authorPHID": format!("PHID-USER-{author}"),
        "oldValue": from.map(|f| json!({
            "projectPHID": board,
            "columnPHIDs": {format!("PHID-PCOL-{f}"): format!("PHID-PCOL-{f}")},
        })),
        "newValue": {"projectPHID": board, "columnPHIDs": [format!("PHID-PCOL-{to}")]},
    }))
}

fn column(at: i64, author: &str, from: Option<&str>, to: &str) -> RawEvent {
    column_on(TEAM, at, author, from, to)
}

fn text_change(kind: &str, at: i64, author: &str, old: Option<&str>, new: &str) -> RawEvent {
    raw(json!({
        "transactionType": kind,
        "dateCreated": at,
        "authorPHID": format!("PHID-USER-{author}"),
        "oldValue": old,
        "newValue": new,
    }))
}

struct Board {
    before: Snapshot,
    after: Snapshot,
    asked: RefCell<Vec<DateTime<Utc>>>,
}

impl SnapshotProvider for Board {
    fn snapshot(&self, at: DateTime<Utc>) -> anyhow::Result<Snapshot> {
        self.asked.borrow_mut().push(at);
        Ok(if at <= window().start {
            self.before.clone()
        } else {
            self.after.clone()
        })
    }
}

struct Logs {
    logs: BTreeMap<EntityId, Vec<RawEvent>>,
    calls: Cell<usize>,
    asked: RefCell<Vec<EntityId>>,
}

impl TransactionProvider for Logs {
    fn transactions_for(
        &self,
        entities: &[EntityId],
    ) -> anyhow::Result<BTreeMap<EntityId, Vec<RawEvent>>> {
        self.calls.set(self.calls.get() + 1);
        self.asked.borrow_mut().extend_from_slice(entities);
        Ok(entities
            .iter()
            .filter_map(|e| self.logs.get(e).map(|log| (e.clone(), log.clone())))
            .collect())
    }
}

struct Names {
    inner: StaticResolver,
    calls: Cell<usize>,
    asked: RefCell<BTreeSet<ObjectId>>,
}

impl IdentifierResolver for Names {
    fn resolve_batch(
        &self,
        ids: &BTreeSet<ObjectId>,
    ) -> anyhow::Result<BTreeMap<ObjectId, String>> {
        self.calls.set(self.calls.get() + 1);
        self.asked.borrow_mut().extend(ids.iter().cloned());
        self.inner.resolve_batch(ids)
    }
}

fn board() -> Board {
    let snap = |pairs: &[(&str, &str)]| -> Snapshot {
        pairs
            .iter()
            .map(|(k, v)| (task(k), (*v).to_string()))
            .collect()
    };
    Board {
        before: snap(&[
            ("T2", "To Do"),
            ("T3", "In Development"),
            ("T4", "In Development"),
        ]),
        after: snap(&[
            ("T2", "In Development"),
            ("T3", "In Development"),
            ("T4", "Done"),
        ]),
        asked: RefCell::new(Vec::new()),
    }
}

fn logs() -> Logs {
    let logs = BTreeMap::from([
        (
            task("T1"),
            vec![
                reassign(BASE + 1, "admin", None, "x"),
                reassign(BASE + 150_000, "y", Some("x"), "y"),
            ],
        ),
        (
            task("T2"),
            vec![
                text_change("title", BASE, "pm", None, "Fix login"),
                reassign(BASE + 10, "pm", None, "d"),
                column(BASE + 20, "pm", None, "todo"),
                column(BASE + 200_000, "d", Some("todo"), "indev"),
            ],
        ),
        (
            task("T3"),
            vec![
                reassign(BASE + 5, "d", None, "d"),
                column(BASE + 6, "d", None, "indev"),
            ],
        ),
        (
            task("T4"),
            vec![
                reassign(BASE + 1, "d", None, "d"),
                column(BASE + 2, "d", None, "indev"),
                column_on("PHID-PROJ-other", BASE + 250_000, "d", Some("x"), "elsewhere"),
                column(BASE + 300_000, "d", Some("indev"), "done"),
                text_change("status", BASE + 300_001, "d", Some("open"), "resolved"),
            ],
        ),
        (
            task("T5"),
            vec![
                reassign(BASE + 3, "d", None, "d"),
                raw(json!({
                    "transactionType": "status",
                    "dateCreated": "garbage",
                    "oldValue": "open",
                    "newValue": "invalid",
                })),
                text_change("status", BASE + 200_000, "d", Some("open"), "stalled"),
            ],
        ),
    ]);
    Logs {
        logs,
        calls: Cell::new(0),
        asked: RefCell::new(Vec::new()),
    }
}

fn names() -> Names {
    Names {
        inner: [
            (user("d"), "Dana".to_string()),
            (user("x"), "Xavier".to_string()),
        ]
        .into_iter()
        .collect(),
        calls: Cell::new(0),
        asked: RefCell::new(BTreeSet::new()),
    }
}

fn request() -> ReportRequest {
    ReportRequest::new(window())
        .with_entities([task("T1"), task("T3"), task("T5")])
        .with_titles(BTreeMap::from([(task("T3"), "Refactor auth".to_string())]))
}

fn run(board: &Board, logs: &Logs, names: &Names) -> Report {
    let sources = Sources {
        snapshots: board,
        transactions: logs,
        names,
    };
    build_report(&request(), sources, &config()).expect("report")
}

fn section<'a>(report: &'a Report, actor: &ObjectId) -> Option<&'a wbstatus_core::narrative::ActorReport> {
    report.actors.iter().find(|s| &s.actor == actor)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn board_diff_and_explicit_tasks_form_the_universe() {
    let (board, logs, names) = (board(), logs(), names());
    let report = run(&board, &logs, &names);

    assert_eq!(*board.asked.borrow(), vec![window().start, window().end]);
    assert_eq!(
        report.board_changes.keys().cloned().collect::<Vec<_>>(),
        vec![task("T2"), task("T4")]
    );
    assert_eq!(logs.calls.get(), 1);
    assert_eq!(
        *logs.asked.borrow(),
        vec![task("T1"), task("T2"), task("T3"), task("T4"), task("T5")]
    );
}

#[test]
fn names_are_resolved_once_for_every_collected_id() {
    let (board, logs, names) = (board(), logs(), names());
    let _ = run(&board, &logs, &names);

    assert_eq!(names.calls.get(), 1);
    let asked = names.asked.borrow();
    for id in [user("d"), user("x"), user("y"), user("pm")] {
        assert!(asked.contains(&id), "missing {id}");
    }
    assert!(asked.contains(&ObjectId::new_unchecked("PHID-PCOL-done")));
    assert!(
        !asked.contains(&ObjectId::new_unchecked("PHID-PCOL-elsewhere")),
        "columns on other boards are never collected"
    );
}

#[test]
fn assignee_sees_every_highlight_class() {
    let (board, logs, names) = (board(), logs(), names());
    let report = run(&board, &logs, &names);

    let dana = section(&report, &user("d")).expect("dana has a section");
    assert_eq!(dana.name, "Dana");
    assert_eq!(
        dana.lines(),
        vec![
            "T2 Fix login: Started".to_string(),
            "T3 Refactor auth: Still working on it (since 2017-07-14)".to_string(),
            "T4 T4: Completed".to_string(),
            "T5 T5: open → stalled".to_string(),
        ]
    );
}

#[test]
fn reassignment_credits_the_new_assignee_only() {
    let (board, logs, names) = (board(), logs(), names());
    let report = run(&board, &logs, &names);

    let y = section(&report, &user("y")).expect("new assignee has a section");
    assert_eq!(y.name, "(unknown PHID-USER-y)");
    assert_eq!(y.entries.len(), 1);
    assert_eq!(y.entries[0].entity, task("T1"));
    assert_eq!(y.entries[0].highlights, vec![Highlight::Assigned]);

    if let Some(x) = section(&report, &user("x")) {
        for entry in &x.entries {
            assert_eq!(entry.highlights, vec![Highlight::Unassigned]);
        }
    }
}

#[test]
fn pre_window_authors_without_highlights_are_left_out() {
    let (board, logs, names) = (board(), logs(), names());
    let report = run(&board, &logs, &names);

    assert!(section(&report, &user("pm")).is_none());
    assert!(section(&report, &user("admin")).is_none());
    assert!(report.actors.iter().all(|s| !s.is_empty()));
}

#[test]
fn report_serializes_to_structured_json() {
    let (board, logs, names) = (board(), logs(), names());
    let report = run(&board, &logs, &names);

    let json = serde_json::to_value(&report).expect("serialize");
    assert_eq!(json["board_changes"]["T2"]["before"], "To Do");
    let first = &json["actors"][0];
    assert_eq!(first["actor"], "PHID-USER-d");
    assert_eq!(first["entries"][0]["highlights"][0]["kind"], "started");
}

#[test]
fn transaction_failure_is_typed() {
    struct Down;
    impl TransactionProvider for Down {
        fn transactions_for(
            &self,
            _entities: &[EntityId],
        ) -> anyhow::Result<BTreeMap<EntityId, Vec<RawEvent>>> {
            anyhow::bail!("conduit timed out")
        }
    }

    let (board, names) = (board(), names());
    let sources = Sources {
        snapshots: &board,
        transactions: &Down,
        names: &names,
    };
    let err = build_report(&request(), sources, &config()).unwrap_err();
    assert!(matches!(err, ReportError::Transactions(_)));
    assert_eq!(err.code(), ErrorCode::TransactionFetchFailed);
    assert_eq!(names.calls.get(), 0);
}

#[test]
fn resolver_failure_is_typed() {
    struct Down;
    impl IdentifierResolver for Down {
        fn resolve_batch(
            &self,
            _ids: &BTreeSet<ObjectId>,
        ) -> anyhow::Result<BTreeMap<ObjectId, String>> {
            anyhow::bail!("user.query failed")
        }
    }

    let (board, logs) = (board(), logs());
    let sources = Sources {
        snapshots: &board,
        transactions: &logs,
        names: &Down,
    };
    let err = build_report(&request(), sources, &config()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NameResolutionFailed);
}
