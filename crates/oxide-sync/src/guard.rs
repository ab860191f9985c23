//! Guarded statements.
//!
//! Every emitted statement carries a [`GuardState`]. Statements that cannot
//! lose data start out [`GuardState::Safe`]; destructive ones start
//! [`GuardState::Unknown`] with a read-only `SELECT count(*)` that measures
//! how many rows they would damage. The state is resolved at most once and
//! a statement is only executed once it is `Safe`.

use oxide_sync_core::ast::{
    quote_identifier, quote_string, ColumnDescription, DefaultValue, TableName,
};
use oxide_sync_core::types::{
    charset_covers, CharsetCatalog, DataType, EnumerationKind, DEFAULT_CHARSET,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::executor::Executor;

/// What an emitted statement does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateDatabase,
    CreateTable,
    DropTable,
    AddColumn,
    ModifyColumn,
    DropColumn,
    DropKey,
    AddKey,
    AlterOptions,
    CreateUser,
    AlterUser,
    DropUser,
    Grant,
    Revoke,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    /// Not yet checked against the data.
    Unknown,
    Safe,
    /// Refused: the statement would touch existing rows.
    Unsafe,
}

/// A statement together with its safety check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardedStatement {
    pub operation: Operation,
    /// Table, column or account the statement targets.
    pub target: String,
    pub sql: String,
    /// Human-readable description of the change, e.g. `VARCHAR(20) -> VARCHAR(5)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Query counting the rows the statement would damage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    pub state: GuardState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl GuardedStatement {
    /// A statement that cannot lose data.
    pub fn safe(operation: Operation, target: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            operation,
            target: target.into(),
            sql: sql.into(),
            context: None,
            guard: None,
            state: GuardState::Safe,
            warning: None,
        }
    }

    /// A statement that runs only after `guard` counts zero rows.
    pub fn guarded(
        operation: Operation,
        target: impl Into<String>,
        sql: impl Into<String>,
        guard: String,
    ) -> Self {
        Self {
            guard: Some(guard),
            state: GuardState::Unknown,
            ..Self::safe(operation, target, sql)
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_safe(&self) -> bool {
        self.state == GuardState::Safe
    }

    /// Runs the guard query if the state is still unknown.
    pub async fn resolve<E: Executor>(&mut self, executor: &E) -> GuardState {
        if self.state != GuardState::Unknown {
            return self.state;
        }
        let Some(guard) = self.guard.clone() else {
            self.refuse(String::from("no guard query available"));
            return self.state;
        };
        debug!(object = %self.target, sql = %guard, "Resolving guard");
        match executor.execute(&guard).await {
            Ok(rows) => {
                let count = rows
                    .first()
                    .and_then(|row| row.first())
                    .and_then(|value| value.as_deref())
                    .and_then(|value| value.parse::<u64>().ok());
                match count {
                    Some(0) => self.state = GuardState::Safe,
                    Some(rows) => self.refuse(
                        SyncError::GuardFailure {
                            sql: self.sql.clone(),
                            rows,
                        }
                        .to_string(),
                    ),
                    None => self.refuse(String::from("guard query returned no row count")),
                }
            }
            Err(e) => self.refuse(format!("guard query failed: {e}")),
        }
        self.state
    }

    fn refuse(&mut self, warning: String) {
        warn!(object = %self.target, warning = %warning, "Statement refused");
        self.state = GuardState::Unsafe;
        self.warning = Some(warning);
    }
}

/// Counts every row of a table.
pub fn drop_table_guard(table: &TableName) -> String {
    format!("SELECT count(*) FROM {table}")
}

/// Counts rows whose value differs from the column's default.
pub fn drop_column_guard(table: &TableName, column: &ColumnDescription) -> String {
    let col = quote_identifier(&column.name);
    let condition = match column.effective_default() {
        Some(DefaultValue::Null) | Some(DefaultValue::CurrentTimestamp(_)) => {
            format!("{col} IS NOT NULL")
        }
        Some(default) => format!("NOT ({col} <=> {default})"),
        None => match implicit_default(&column.data_type) {
            Some(default) => format!("NOT ({col} <=> {})", quote_string(&default)),
            None => format!("{col} IS NOT NULL"),
        },
    };
    format!("SELECT count(*) FROM {table} WHERE {condition}")
}

/// Value a `NOT NULL` column without a default takes on insert.
fn implicit_default(data_type: &DataType) -> Option<String> {
    match data_type {
        DataType::Integer { .. } | DataType::FixedPoint { .. } | DataType::FloatingPoint { .. } => {
            Some(String::from("0"))
        }
        DataType::SizedString { .. } | DataType::UnsizedString { .. } => Some(String::new()),
        DataType::Enumeration {
            kind: EnumerationKind::Enum,
            values,
            ..
        } => values.first().cloned(),
        DataType::Enumeration { .. } => Some(String::new()),
        _ => None,
    }
}

/// Values of an enumeration that the new definition no longer lists.
pub fn removed_values(before: &DataType, after: &DataType) -> Vec<String> {
    match (before, after) {
        (
            DataType::Enumeration { values: old, .. },
            DataType::Enumeration { values: new, .. },
        ) => old.iter().filter(|v| !new.contains(v)).cloned().collect(),
        _ => Vec::new(),
    }
}

/// Guard for `MODIFY COLUMN`, `None` when the change cannot lose data.
///
/// The type change must be lossless, no enumeration value may disappear,
/// and a nullable column may not become `NOT NULL`.
pub fn modify_column_guard(
    table: &TableName,
    before: &ColumnDescription,
    after: &ColumnDescription,
    catalog: &CharsetCatalog,
) -> Option<String> {
    let lossless = before
        .data_type
        .is_lossless_with(&after.data_type, catalog);
    let removed = removed_values(&before.data_type, &after.data_type);
    let tightened = before.nullable && !after.nullable;
    if lossless && removed.is_empty() && !tightened {
        return None;
    }

    let col = quote_identifier(&before.name);
    let mut conditions = Vec::new();
    if !lossless || !removed.is_empty() {
        conditions = out_of_range(&col, &before.data_type, &after.data_type);
        if conditions.is_empty() {
            conditions.push(format!("{col} IS NOT NULL"));
        }
    }
    if tightened {
        conditions.push(format!("{col} IS NULL"));
    }
    let conditions: Vec<String> = conditions.into_iter().map(|c| format!("({c})")).collect();
    Some(format!(
        "SELECT count(*) FROM {table} WHERE {}",
        conditions.join(" OR ")
    ))
}

fn value_list(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| quote_string(v)).collect();
    quoted.join(", ")
}

fn charset_of(data_type: &DataType) -> String {
    data_type
        .encoding()
        .and_then(|encoding| encoding.effective_charset())
        .unwrap_or_else(|| DEFAULT_CHARSET.to_string())
}

/// Conditions matching values `to` cannot hold.
fn out_of_range(col: &str, from: &DataType, to: &DataType) -> Vec<String> {
    let mut conditions = Vec::new();
    match to {
        DataType::Integer { kind, unsigned, .. } => {
            let (low, high) = kind.bounds(*unsigned);
            if !from.is_numeric() {
                conditions.push(format!("{col} NOT REGEXP '^[-+]?[0-9]+$'"));
            }
            conditions.push(format!("{col} < {low}"));
            conditions.push(format!("{col} > {high}"));
            if matches!(from, DataType::FixedPoint { .. } | DataType::FloatingPoint { .. }) {
                conditions.push(format!("{col} <> ROUND({col})"));
            }
        }
        DataType::FixedPoint {
            precision,
            scale,
            unsigned,
            ..
        } => {
            if !from.is_numeric() {
                conditions.push(format!("{col} NOT REGEXP '^[-+]?[0-9]*[.]?[0-9]+$'"));
            }
            conditions.push(format!("ABS({col}) >= 1e{}", precision - scale));
            conditions.push(format!("{col} <> ROUND({col}, {scale})"));
            if *unsigned {
                conditions.push(format!("{col} < 0"));
            }
        }
        DataType::FloatingPoint { kind, unsigned, .. } => {
            conditions.push(format!("{col} <> CAST({col} AS {})", kind.as_str()));
            if *unsigned {
                conditions.push(format!("{col} < 0"));
            }
        }
        DataType::SizedString { kind, length, .. } => {
            if kind.is_binary() {
                conditions.push(format!("LENGTH({col}) > {length}"));
            } else {
                conditions.push(format!("CHAR_LENGTH({col}) > {length}"));
                conditions.extend(charset_loss(col, from, to));
            }
        }
        DataType::UnsizedString { kind, .. } => {
            conditions.push(format!("LENGTH({col}) > {}", kind.capacity()));
            if !kind.is_binary() {
                conditions.extend(charset_loss(col, from, to));
            }
        }
        DataType::Enumeration { kind, values, .. } => match from {
            DataType::Enumeration {
                kind: EnumerationKind::Set,
                ..
            } => {
                let removed = removed_values(from, to);
                conditions.extend(
                    removed
                        .iter()
                        .map(|v| format!("FIND_IN_SET({}, {col}) > 0", quote_string(v))),
                );
                if *kind == EnumerationKind::Enum {
                    conditions.push(format!("{col} LIKE '%,%'"));
                }
            }
            DataType::Enumeration { .. } => {
                let removed = removed_values(from, to);
                if !removed.is_empty() {
                    conditions.push(format!("{col} IN ({})", value_list(&removed)));
                }
            }
            _ => conditions.push(format!("{col} NOT IN ({})", value_list(values))),
        },
        DataType::Temporal { kind, fsp } => match from {
            DataType::Temporal { kind: old, .. } if old == kind && *fsp < 6 => {
                conditions.push(format!(
                    "MICROSECOND({col}) % {} <> 0",
                    10u64.pow(6 - fsp)
                ));
            }
            _ => conditions.push(format!("{col} IS NOT NULL")),
        },
        DataType::GenericSized { .. } | DataType::Other { .. } => {
            conditions.push(format!("{col} IS NOT NULL"));
        }
    }
    conditions
}

/// Values that do not survive a charset conversion.
fn charset_loss(col: &str, from: &DataType, to: &DataType) -> Option<String> {
    if !from.is_textual() {
        return None;
    }
    let source = charset_of(from);
    let target = charset_of(to);
    if charset_covers(&source, &target) {
        return None;
    }
    Some(format!(
        "CONVERT(CONVERT({col} USING {target}) USING {source}) <> {col}"
    ))
}
