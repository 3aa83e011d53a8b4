use crate::models::UploadKind;
use thiserror::Error;

/// Failure talking to the upstream parsing/lookup backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    /// The backend answered 2xx but with an `{"error": ...}` payload
    #[error("{0}")]
    Upstream(String),
}

/// A single `/zoek_films` call failed; aborts the reconciliation pass
#[derive(Debug, Error)]
#[error("lookup failed for row {row} (\"{title}\", {play_week}): {source}")]
pub struct LookupError {
    /// 1-based position in the invoice list
    pub row: usize,
    pub title: String,
    pub play_week: String,
    #[source]
    pub source: BackendError,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected locally, no network call was made
    #[error("{0}")]
    Validation(String),
    #[error("another operation is still running")]
    Busy,
    #[error("{}: {}", .kind.failure_reason(), .source)]
    Upload {
        kind: UploadKind,
        #[source]
        source: BackendError,
    },
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("internal error: {0}")]
    Internal(String),
}
