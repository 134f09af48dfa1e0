//! wbstatus-core library.
//!
//! Reconstructs what happened to workboard tasks between two instants from
//! their field-change logs, and folds the result into per-actor highlights.
//!
//! # Conventions
//!
//! - **Errors**: `anyhow::Result` at collaborator and config boundaries,
//!   typed `thiserror` enums ([`ReportError`], [`event::RawEventError`])
//!   inside the pipeline.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).
//! - **Purity**: everything between the collaborator calls is synchronous
//!   and deterministic.

pub mod actor;
pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod narrative;
pub mod replay;
pub mod report;
pub mod resolve;
pub mod snapshot;

pub use error::{ErrorCode, ReportError};
pub use report::{Report, ReportRequest, Sources, TransactionProvider, build_report};
