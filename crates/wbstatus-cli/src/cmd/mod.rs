pub mod diff;
pub mod report;
pub mod task;

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Args;
use wbstatus_core::{ErrorCode, ReportError};
use wbstatus_core::config::{ConfigNotFound, ReportConfig, resolve_config};
use wbstatus_core::model::EntityId;
use wbstatus_core::replay::Window;

use crate::output::{CliError, OutputMode, render_error};
use crate::source::DataDir;

/// Data source and time window shared by every command.
#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Directory holding workboard snapshots, transactions.json and names.json.
    #[arg(long, short = 'd', default_value = ".")]
    pub data_dir: PathBuf,

    /// Window start: RFC 3339, `YYYY-MM-DDTHH`, `YYYY-MM-DD`, or epoch seconds.
    #[arg(long, value_parser = parse_instant)]
    pub from: DateTime<Utc>,

    /// Window end, same formats as --from.
    #[arg(long, value_parser = parse_instant)]
    pub to: DateTime<Utc>,
}

impl WindowArgs {
    pub const fn window(&self) -> Window {
        Window::new(self.from, self.to)
    }

    /// Open the data directory, reporting failure in `output`'s format.
    pub fn open(&self, output: OutputMode) -> anyhow::Result<DataDir> {
        DataDir::open(&self.data_dir).or_else(|err| {
            render_error(
                output,
                &CliError::with_details(
                    format!("{err:#}"),
                    "pass --data-dir pointing at a directory of cached workboard data",
                    "data_dir_missing",
                ),
            )?;
            Err(err)
        })
    }

    /// Reject windows that do not open before they close.
    pub fn check(&self, output: OutputMode) -> anyhow::Result<()> {
        if self.from < self.to {
            return Ok(());
        }
        let message = format!(
            "--from {} is not before --to {}",
            self.from.to_rfc3339(),
            self.to.to_rfc3339()
        );
        render_error(output, &CliError::from_code(ErrorCode::InvalidWindow, &message))?;
        anyhow::bail!(message)
    }
}

/// Parse a window bound.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(&format!("{raw}:00"), "%Y-%m-%dT%H:%M") {
        return Ok(naive.and_utc());
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| {
            format!("invalid instant '{raw}': expected RFC 3339, YYYY-MM-DDTHH, YYYY-MM-DD or epoch seconds")
        })
}

/// Parse a task id from the command line, reporting failure in `output`'s format.
pub fn parse_task(raw: &str, output: OutputMode) -> anyhow::Result<EntityId> {
    EntityId::parse(raw).or_else(|err| {
        render_error(
            output,
            &CliError::from_code(ErrorCode::InvalidTaskId, err.to_string()),
        )?;
        Err(err.into())
    })
}

/// Report a pipeline error in `output`'s format and hand it back for exit.
pub fn fail(output: OutputMode, err: ReportError) -> anyhow::Error {
    let code = err.code();
    tracing::debug!(%code, summary = code.message(), "command failed");
    if let Err(render_err) = render_error(output, &CliError::from(&err)) {
        tracing::warn!(error = %render_err, "failed to render error");
    }
    anyhow::Error::new(err)
}

/// Load the run's config, reporting failure in `output`'s format.
pub fn load_config(
    explicit: Option<&Path>,
    cwd: &Path,
    output: OutputMode,
) -> anyhow::Result<ReportConfig> {
    resolve_config(explicit, cwd).or_else(|err| {
        let code = if err.downcast_ref::<ConfigNotFound>().is_some() {
            ErrorCode::ConfigNotFound
        } else {
            ErrorCode::ConfigParseError
        };
        render_error(output, &CliError::from_code(code, format!("{err:#}")))?;
        Err(err)
    })
}
