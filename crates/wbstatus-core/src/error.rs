use std::fmt;

use crate::model::EntityId;

/// Machine-readable error codes for the CLI's structured error output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigNotFound,
    ConfigParseError,
    InvalidWindow,
    InvalidTaskId,
    SnapshotUnavailable,
    TransactionFetchFailed,
    NameResolutionFailed,
    InvariantViolation,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigNotFound => "E1001",
            Self::ConfigParseError => "E1002",
            Self::InvalidWindow => "E1003",
            Self::InvalidTaskId => "E1004",
            Self::SnapshotUnavailable => "E4001",
            Self::TransactionFetchFailed => "E4002",
            Self::NameResolutionFailed => "E4003",
            Self::InvariantViolation => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigNotFound => "Config file not found",
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidWindow => "Invalid report window",
            Self::InvalidTaskId => "Invalid task id",
            Self::SnapshotUnavailable => "Workboard snapshot unavailable",
            Self::TransactionFetchFailed => "Transaction fetch failed",
            Self::NameResolutionFailed => "Name resolution failed",
            Self::InvariantViolation => "Internal invariant violated",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound => {
                Some("Pass --config, set WBSTATUS_CONFIG, or create ./wbstatus.toml.")
            }
            Self::ConfigParseError => Some("Fix the syntax or missing keys in the config file."),
            Self::InvalidWindow => Some("The --from instant must be earlier than --to."),
            Self::InvalidTaskId => Some("Task ids are workboard labels such as T123."),
            Self::SnapshotUnavailable => {
                Some("Check that a workboard snapshot exists for both window ends.")
            }
            Self::TransactionFetchFailed => Some("Check the transaction log source and retry."),
            Self::NameResolutionFailed => Some("Check the name source and retry."),
            Self::InvariantViolation => Some("This is a bug. Report it with the input that triggered it."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by the report pipeline itself.
///
/// Input problems (bad transactions, unknown ids) are recovered locally and
/// never show up here. What does show up is either a broken internal
/// contract or a collaborator failure the caller has to decide about.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// An actor set contained an empty id. Replay never produces one, so
    /// this means a reconstructed state was built or edited incorrectly.
    #[error("entity {entity} has an empty id in its actor set")]
    EmptyActorId { entity: EntityId },

    #[error("report window is empty: start {start} is not before end {end}")]
    InvalidWindow { start: String, end: String },

    #[error("failed to take workboard snapshot")]
    Snapshot(#[source] anyhow::Error),

    #[error("failed to fetch transactions")]
    Transactions(#[source] anyhow::Error),

    #[error("failed to resolve names")]
    Resolve(#[source] anyhow::Error),
}

impl ReportError {
    /// The [`ErrorCode`] this error maps to.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyActorId { .. } => ErrorCode::InvariantViolation,
            Self::InvalidWindow { .. } => ErrorCode::InvalidWindow,
            Self::Snapshot(_) => ErrorCode::SnapshotUnavailable,
            Self::Transactions(_) => ErrorCode::TransactionFetchFailed,
            Self::Resolve(_) => ErrorCode::NameResolutionFailed,
        }
    }
}
