//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors from the remote progress service.
///
/// The progress store logs these and carries on with local state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("remote sync is not configured")]
    NotConfigured,
    #[error("remote request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("remote returned errors: {0}")]
    GraphQl(String),
    #[error("remote returned no result for {operation}")]
    Rejected { operation: &'static str },
}

/// Errors from the device notification scheduler.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NotificationError {
    #[error("notification scheduler unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted by `ProgressStore`.
///
/// Remote failures never appear here; local persistence and scheduler
/// failures do.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
