//! `wbstatus diff`: compare two workboard snapshots.
//!
//! Lists every task on either board. Tasks whose column changed are marked
//! with `*` and shown as `old->new`.

use std::collections::BTreeSet;
use std::io::Write;

use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use wbstatus_core::model::{EntityId, Value};
use wbstatus_core::ReportError;
use wbstatus_core::snapshot::{SnapshotProvider, diff};

use super::{WindowArgs, fail};
use crate::output::{OutputMode, pretty_section, render_mode};

/// Arguments for `wbstatus diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Only list tasks whose column changed.
    #[arg(long)]
    pub changed_only: bool,
}

#[derive(Debug, Serialize)]
struct TaskRow {
    task: EntityId,
    before: Option<String>,
    after: Option<String>,
    changed: bool,
}

#[derive(Debug, Serialize)]
struct DiffOutput {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    tasks: Vec<TaskRow>,
}

/// Execute `wbstatus diff`.
pub fn run_diff(args: &DiffArgs, output: OutputMode) -> anyhow::Result<()> {
    let data = args.window.open(output)?;

    let before = data
        .snapshot(args.window.from)
        .map_err(|e| fail(output, ReportError::Snapshot(e)))?;
    let after = data
        .snapshot(args.window.to)
        .map_err(|e| fail(output, ReportError::Snapshot(e)))?;
    let changes = diff(&before, &after);

    let keys: BTreeSet<&EntityId> = before.keys().chain(after.keys()).collect();
    let tasks: Vec<TaskRow> = keys
        .into_iter()
        .map(|task| TaskRow {
            task: task.clone(),
            before: before.get(task).cloned(),
            after: after.get(task).cloned(),
            changed: changes.contains_key(task),
        })
        .filter(|row| row.changed || !args.changed_only)
        .collect();

    tracing::debug!(tasks = tasks.len(), changed = changes.len(), "diffed snapshots");

    let result = DiffOutput {
        from: args.window.from,
        to: args.window.to,
        tasks,
    };

    render_mode(
        output,
        &result,
        |r, w| render_rows(&r.tasks, w),
        |r, w| {
            pretty_section(
                w,
                &format!("Board changes {} → {}", r.from.to_rfc3339(), r.to.to_rfc3339()),
            )?;
            render_rows(&r.tasks, w)
        },
    )
}

fn render_rows(rows: &[TaskRow], w: &mut dyn Write) -> std::io::Result<()> {
    for row in rows {
        let before = row.before.as_deref().unwrap_or(Value::NONE_LABEL);
        let after = row.after.as_deref().unwrap_or(Value::NONE_LABEL);
        if row.changed {
            writeln!(w, "* {}: {before}->{after}", row.task)?;
        } else {
            writeln!(w, "  {}: {after}", row.task)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_mark_changes() {
        let rows = vec![
            TaskRow {
                task: EntityId::new_unchecked("T1"),
                before: Some("Foo".into()),
                after: Some("Foo".into()),
                changed: false,
            },
            TaskRow {
                task: EntityId::new_unchecked("T2"),
                before: Some("Bar".into()),
                after: Some("Foo2".into()),
                changed: true,
            },
            TaskRow {
                task: EntityId::new_unchecked("T3"),
                before: None,
                after: Some("Foo3".into()),
                changed: true,
            },
        ];
        let mut buf = Vec::new();
        render_rows(&rows, &mut buf).expect("render");
        assert_eq!(
            String::from_utf8(buf).expect("utf8"),
            "  T1: Foo\n* T2: Bar->Foo2\n* T3: (none)->Foo3\n"
        );
    }
}
