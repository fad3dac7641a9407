//! Schedule store error types.

use std::time::Duration;

/// Errors that can occur while reading from a schedule store.
///
/// Every variant is fatal for the query that triggered it. Stores never
/// retry internally.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// Could not reach the backing store
    #[error("connection failed: {0}")]
    Connection(String),

    /// The relational store rejected or failed a query
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A store call did not complete in time
    #[error("{operation} timed out after {}s", after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Reading a feed file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A feed file is not valid JSON for the expected layout
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store returned data that cannot be interpreted
    #[error("malformed schedule data: {0}")]
    MalformedData(String),
}
