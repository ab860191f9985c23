//! Access to the server.
//!
//! Everything the engine needs from a live database goes through
//! [`Executor`]: run one statement, get its rows back as text.

use std::future::Future;

use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::Row as _;
use tracing::debug;

use crate::error::{Result, SyncError};

/// One result row, every value rendered as text.
pub type Row = Vec<Option<String>>;

/// Capability to run SQL against the target server.
pub trait Executor {
    /// Runs one statement and returns its rows (empty for DDL/DCL).
    fn execute(&self, sql: &str) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Escapes a value for use inside a single-quoted string literal.
    fn escape(&self, value: &str) -> String {
        escape_string(value)
    }
}

/// MySQL string-literal escaping, without the surrounding quotes.
#[must_use]
pub fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\x1a' => escaped.push_str("\\Z"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// [`Executor`] over an sqlx MySQL pool.
#[derive(Debug, Clone)]
pub struct MySqlExecutor {
    pool: MySqlPool,
}

impl MySqlExecutor {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

impl Executor for MySqlExecutor {
    async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        debug!(sql = %sql, "Executing SQL");
        // Text protocol: SHOW and DCL statements are not all preparable.
        let rows = sqlx::raw_sql(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) => SyncError::Execution {
                    sql: sql.to_string(),
                    message: db.message().to_string(),
                },
                other => SyncError::Database(other),
            })?;
        Ok(rows.iter().map(decode_row).collect())
    }
}

fn decode_row(row: &MySqlRow) -> Row {
    (0..row.len()).map(|i| decode_value(row, i)).collect()
}

fn decode_value(row: &MySqlRow, index: usize) -> Option<String> {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value;
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<u64>, _>(index) {
        return value.map(|v| v.to_string());
    }
    row.try_get::<Option<Vec<u8>>, _>(index)
        .ok()
        .flatten()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_special_characters() {
        assert_eq!(escape_string("it's"), "it\\'s");
        assert_eq!(escape_string("a\\b"), "a\\\\b");
        assert_eq!(escape_string("line\nbreak\r"), "line\\nbreak\\r");
        assert_eq!(escape_string("nul\0ctrl\x1a"), "nul\\0ctrl\\Z");
        assert_eq!(escape_string("plain"), "plain");
    }
}
