//! `wbstatus report`: per-person activity highlights for a window.

use std::io::Write;

use clap::Args;
use wbstatus_core::config::ReportConfig;
use wbstatus_core::{Report, ReportRequest, Sources, build_report};

use super::{WindowArgs, fail, parse_task};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `wbstatus report`.
#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Also report on these tasks even if their column did not change.
    #[arg(long = "task", value_name = "ID")]
    pub tasks: Vec<String>,
}

/// Execute `wbstatus report`.
pub fn run_report(
    args: &ReportArgs,
    config: &ReportConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    let data = args.window.open(output)?;
    let tasks = args
        .tasks
        .iter()
        .map(|t| parse_task(t, output))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let request = ReportRequest::new(args.window.window()).with_entities(tasks);
    let sources = Sources {
        snapshots: &data,
        transactions: &data,
        names: &data,
    };
    let report = build_report(&request, sources, config).map_err(|e| fail(output, e))?;

    render_mode(output, &report, render_text, render_pretty)
}

/// One tab-separated line per highlight: actor, task, title, highlight.
fn render_text(report: &Report, w: &mut dyn Write) -> std::io::Result<()> {
    for section in &report.actors {
        for entry in &section.entries {
            for highlight in &entry.highlights {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{highlight}",
                    section.name, entry.entity, entry.title
                )?;
            }
        }
    }
    Ok(())
}

fn render_pretty(report: &Report, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_kv(
        w,
        "window",
        format!(
            "{} → {}",
            report.window.start.to_rfc3339(),
            report.window.end.to_rfc3339()
        ),
    )?;
    pretty_kv(w, "moved", report.board_changes.len().to_string())?;
    if report.is_empty() {
        writeln!(w)?;
        writeln!(w, "Nothing to report.")?;
        return Ok(());
    }

    for section in &report.actors {
        writeln!(w)?;
        pretty_section(w, &section.name)?;
        for entry in &section.entries {
            writeln!(w, "{} {}", entry.entity, entry.title)?;
            for highlight in &entry.highlights {
                writeln!(w, "  - {highlight}")?;
            }
        }
    }
    Ok(())
}
