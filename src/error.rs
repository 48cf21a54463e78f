use std::io;

use thiserror::Error;

/// Errors surfaced by catalog loading, validation, and generation runs.
///
/// User cancellation is deliberately absent: a cancelled run is a normal
/// outcome reported through `RunOutcome::Cancelled`.
#[derive(Debug, Error)]
pub enum UpsellError {
    #[error("invalid catalog: {0}")]
    Validation(String),
    #[error("batch size must be at least 1 (got {0})")]
    InvalidBatchSize(usize),
    #[error("worker concurrency must be at least 1 (got {0})")]
    InvalidConcurrency(usize),
    #[error("inference service unreachable: {0}")]
    Transport(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("xlsx read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),
    #[error("xlsx write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UpsellError {
    /// True for faults that mean no further model call can succeed.
    pub fn is_transport(&self) -> bool {
        matches!(self, UpsellError::Transport(_))
    }
}

/// Failure of a single raw model call, classified by blast radius.
#[derive(Debug, Error)]
pub enum CallError {
    /// Only this batch is affected (timeout, 5xx, throttling, bad payload).
    #[error("batch call failed: {0}")]
    Batch(String),
    /// The service cannot be used at all (connect failure, rejected credentials).
    #[error("transport failure: {0}")]
    Transport(String),
}

pub type Result<T, E = UpsellError> = std::result::Result<T, E>;
