//! Error types for schema reconciliation.

use std::path::PathBuf;

use oxide_sync_core::ParseError;

/// Errors that can occur while reconciling or applying.
///
/// The first six variants are collected into the result list rather than
/// aborting a run; only the ambient variants propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A statement could not be parsed.
    #[error("{source_name}: {error}")]
    Parse {
        /// Name of the source the statement came from.
        source_name: String,
        /// The parser's diagnostic.
        error: ParseError,
    },

    /// The same table or account is declared incompatibly in two sources.
    #[error("{object} is declared in both {first} and {second}")]
    Collision {
        object: String,
        first: String,
        second: String,
    },

    /// A grant names an account that does not exist on the server.
    #[error("user {0} does not exist")]
    MissingUser(String),

    /// The target database does not exist.
    #[error("database {0} does not exist")]
    DatabaseMissing(String),

    /// A destructive statement would touch existing rows.
    #[error("{rows} row(s) would be affected by: {sql}")]
    GuardFailure { sql: String, rows: u64 },

    /// The server rejected a statement.
    #[error("execution of `{sql}` failed: {message}")]
    Execution { sql: String, message: String },

    /// Database driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error while reading sources.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A source includes itself, directly or transitively.
    #[error("include cycle through {}", .0.display())]
    IncludeCycle(PathBuf),
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_failure_names_row_count() {
        let error = SyncError::GuardFailure {
            sql: String::from("ALTER TABLE t DROP COLUMN c;"),
            rows: 3,
        };
        assert_eq!(
            error.to_string(),
            "3 row(s) would be affected by: ALTER TABLE t DROP COLUMN c;"
        );
    }

    #[test]
    fn include_cycle_shows_path() {
        let error = SyncError::IncludeCycle(PathBuf::from("schema/a.sql"));
        assert_eq!(error.to_string(), "include cycle through schema/a.sql");
    }
}
