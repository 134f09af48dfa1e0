use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::model::{Alias, ObjectId};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "WBSTATUS_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "wbstatus.toml";

/// No config file exists at any candidate location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no wbstatus config found (tried: {})", tried.join(", "))]
pub struct ConfigNotFound {
    pub tried: Vec<String>,
}

/// Read-only settings for one report run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Project whose workboard columns are tracked.
    pub team_phid: ObjectId,
    /// Column ids for each named workflow stage.
    pub workboard_state_phids: WorkflowAliases,
}

/// Column id for every workflow alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowAliases {
    pub todo: ObjectId,
    pub indev: ObjectId,
    pub feedback: ObjectId,
    pub done: ObjectId,
    pub archive: ObjectId,
}

impl WorkflowAliases {
    /// Column id configured for `alias`.
    #[must_use]
    pub const fn column(&self, alias: Alias) -> &ObjectId {
        match alias {
            Alias::Todo => &self.todo,
            Alias::InDev => &self.indev,
            Alias::Feedback => &self.feedback,
            Alias::Done => &self.done,
            Alias::Archive => &self.archive,
        }
    }

    /// Reverse lookup: which alias, if any, a column id belongs to.
    ///
    /// If two aliases share a column the first in [`Alias::ALL`] order wins.
    #[must_use]
    pub fn alias_of(&self, column: &ObjectId) -> Option<Alias> {
        Alias::ALL
            .into_iter()
            .find(|alias| self.column(*alias) == column)
    }

    /// Iterate `(alias, column)` pairs in [`Alias::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Alias, &ObjectId)> {
        Alias::ALL
            .into_iter()
            .map(move |alias| (alias, self.column(alias)))
    }
}

/// Parse a config document.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or a required key is missing.
pub fn parse_config(content: &str) -> Result<ReportConfig> {
    let config: ReportConfig = toml::from_str(content).context("invalid wbstatus config")?;
    if config.team_phid.is_empty() {
        bail!("team_phid must not be empty");
    }
    Ok(config)
}

/// Load config from an explicit path.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<ReportConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    parse_config(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Candidate config locations, highest precedence first.
///
/// 1. `explicit` (the `--config` flag)
/// 2. `$WBSTATUS_CONFIG`
/// 3. `./wbstatus.toml`
/// 4. `<user config dir>/wbstatus/config.toml`
#[must_use]
pub fn config_candidates(explicit: Option<&Path>, cwd: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(4);
    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }
    if let Some(path) = env::var_os(CONFIG_ENV) {
        candidates.push(PathBuf::from(path));
    }
    candidates.push(cwd.join(LOCAL_CONFIG_FILE));
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("wbstatus/config.toml"));
    }
    candidates
}

/// Load config from the first candidate location that exists.
///
/// An explicit path is never skipped: if it was given and does not exist,
/// that is an error rather than a fallthrough.
///
/// # Errors
///
/// Returns an error naming every location tried when none exists, or the
/// read/parse error of the first one that does.
pub fn resolve_config(explicit: Option<&Path>, cwd: &Path) -> Result<ReportConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigNotFound {
                tried: vec![path.display().to_string()],
            }
            .into());
        }
        return load_config(path);
    }

    let candidates = config_candidates(None, cwd);
    for path in &candidates {
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading config");
            return load_config(path);
        }
    }

    Err(ConfigNotFound {
        tried: candidates.iter().map(|p| p.display().to_string()).collect(),
    }
    .into())
}
