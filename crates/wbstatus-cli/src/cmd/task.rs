//! `wbstatus task <id>`: replay one task over the window.
//!
//! Shows each tracked field at both window ends, who is attributed with the
//! task, and when it last entered each workflow column.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use wbstatus_core::config::{ReportConfig, WorkflowAliases};
use wbstatus_core::model::{Alias, EntityId, ObjectId, TrackedField, Value};
use wbstatus_core::replay::{EntityState, Window};
use wbstatus_core::report::reconstruct_entity;
use wbstatus_core::resolve::ResolvedNames;
use wbstatus_core::{ReportError, TransactionProvider};

use super::{WindowArgs, fail, parse_task};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Shown for a field nothing is known about.
const UNKNOWN: &str = "?";

/// Arguments for `wbstatus task`.
#[derive(Args, Debug)]
pub struct TaskArgs {
    /// Task id, e.g. T123.
    pub task: String,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Only show these fields (column, status, assignee, title).
    #[arg(long = "field", value_name = "FIELD")]
    pub fields: Vec<TrackedField>,
}

#[derive(Debug, Serialize)]
struct FieldRow {
    field: TrackedField,
    start: Option<String>,
    end: Option<String>,
    changed: bool,
    /// Workflow stage of the column at each end, when it is a configured one.
    #[serde(skip_serializing_if = "Option::is_none")]
    start_stage: Option<Alias>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_stage: Option<Alias>,
}

#[derive(Debug, Serialize)]
struct ActorRow {
    id: ObjectId,
    name: String,
}

#[derive(Debug, Serialize)]
struct TaskOutput {
    task: EntityId,
    window: Window,
    transactions: usize,
    fields: Vec<FieldRow>,
    actors: Vec<ActorRow>,
    since: BTreeMap<Alias, DateTime<Utc>>,
}

/// Execute `wbstatus task`.
pub fn run_task(args: &TaskArgs, config: &ReportConfig, output: OutputMode) -> anyhow::Result<()> {
    args.window.check(output)?;
    let data = args.window.open(output)?;
    let task = parse_task(&args.task, output)?;
    let window = args.window.window();

    let raw = data
        .transactions_for(std::slice::from_ref(&task))
        .map_err(|e| fail(output, ReportError::Transactions(e)))?
        .remove(&task)
        .unwrap_or_default();
    if raw.is_empty() {
        tracing::info!(%task, "no transactions recorded for task");
    }

    let (state, mut ids) = reconstruct_entity(&raw, window, config);
    ids.extend(state.actors.iter().cloned());
    let names = ResolvedNames::fetch(&data, &ids).map_err(|e| fail(output, ReportError::Resolve(e)))?;

    let result = TaskOutput {
        task,
        window,
        transactions: raw.len(),
        fields: field_rows(&state, &names, &config.workboard_state_phids, &args.fields),
        actors: state
            .actors
            .iter()
            .map(|id| ActorRow {
                id: id.clone(),
                name: names.display(id),
            })
            .collect(),
        since: state.since_markers.clone(),
    };

    render_mode(output, &result, render_text, render_pretty)
}

/// One row per tracked field, or per field in `only` when it is non-empty.
fn field_rows(
    state: &EntityState,
    names: &ResolvedNames,
    aliases: &WorkflowAliases,
    only: &[TrackedField],
) -> Vec<FieldRow> {
    let describe = |value: Option<&Value>| {
        value.map(|v| match v {
            Value::Id(id) => names.display(id),
            other => other.to_string(),
        })
    };
    let stage = |field: TrackedField, value: Option<&Value>| {
        if field == TrackedField::Column {
            value.and_then(Value::as_id).and_then(|id| aliases.alias_of(id))
        } else {
            None
        }
    };
    TrackedField::ALL
        .into_iter()
        .filter(|field| only.is_empty() || only.contains(field))
        .map(|field| {
            let interval = state.field(field);
            FieldRow {
                field,
                start: describe(interval.start.as_ref()),
                end: describe(interval.end.as_ref()),
                changed: interval.changed(),
                start_stage: stage(field, interval.start.as_ref()),
                end_stage: stage(field, interval.end.as_ref()),
            }
        })
        .collect()
}

fn with_stage(label: Option<&str>, stage: Option<Alias>) -> String {
    let label = label.unwrap_or(UNKNOWN);
    stage.map_or_else(|| label.to_string(), |stage| format!("{label} [{stage}]"))
}

fn render_text(r: &TaskOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for row in &r.fields {
        writeln!(
            w,
            "{}\t{}\t{}",
            row.field,
            row.start.as_deref().unwrap_or(UNKNOWN),
            row.end.as_deref().unwrap_or(UNKNOWN)
        )?;
    }
    for actor in &r.actors {
        writeln!(w, "actor\t{}\t{}", actor.id, actor.name)?;
    }
    for (alias, at) in &r.since {
        writeln!(w, "since\t{alias}\t{}", at.to_rfc3339())?;
    }
    Ok(())
}

fn render_pretty(r: &TaskOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("{} ({} transactions)", r.task, r.transactions))?;
    pretty_kv(
        w,
        "window",
        format!("{} → {}", r.window.start.to_rfc3339(), r.window.end.to_rfc3339()),
    )?;
    for row in &r.fields {
        let marker = if row.changed { "*" } else { " " };
        pretty_kv(
            w,
            row.field.as_str(),
            format!(
                "{marker} {} → {}",
                with_stage(row.start.as_deref(), row.start_stage),
                with_stage(row.end.as_deref(), row.end_stage)
            ),
        )?;
    }
    let actors = r
        .actors
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    pretty_kv(w, "actors", if actors.is_empty() { "-" } else { actors.as_str() })?;
    for (alias, at) in &r.since {
        pretty_kv(w, &format!("in {alias}"), format!("since {}", at.format("%Y-%m-%d %H:%M")))?;
    }
    Ok(())
}
