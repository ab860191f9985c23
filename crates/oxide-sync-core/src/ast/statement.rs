//! Parsed statements.

use serde::Serialize;

use super::{GrantDescription, TableDescription, UserDescription};
use crate::parser::ParseError;

/// What a statement is about, decided from its leading keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Table,
    Grant,
    Revoke,
    User,
    Insert,
    Unknown,
}

impl StatementKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Grant => "grant",
            Self::Revoke => "revoke",
            Self::User => "user",
            Self::Insert => "insert",
            Self::Unknown => "unknown",
        }
    }
}

/// Result of parsing one statement.
///
/// Grant and user statements may name several accounts; they yield one
/// descriptor per account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "description", rename_all = "snake_case")]
pub enum ParsedStatement {
    Table(TableDescription),
    Grant(Vec<GrantDescription>),
    Revoke(Vec<GrantDescription>),
    User(Vec<UserDescription>),
    /// `INSERT` / `REPLACE`, passed through untouched.
    Insert,
    Unknown,
    /// Recognized kind whose text failed to parse.
    Invalid {
        kind: StatementKind,
        error: ParseError,
    },
}

impl ParsedStatement {
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        match self {
            Self::Table(_) => StatementKind::Table,
            Self::Grant(_) => StatementKind::Grant,
            Self::Revoke(_) => StatementKind::Revoke,
            Self::User(_) => StatementKind::User,
            Self::Insert => StatementKind::Insert,
            Self::Unknown => StatementKind::Unknown,
            Self::Invalid { kind, .. } => *kind,
        }
    }
}

/// A statement's text together with its parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub text: String,
    pub parsed: ParsedStatement,
}

impl Statement {
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        self.parsed.kind()
    }

    #[must_use]
    pub const fn error(&self) -> Option<&ParseError> {
        match &self.parsed {
            ParsedStatement::Invalid { error, .. } => Some(error),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !matches!(self.parsed, ParsedStatement::Invalid { .. })
    }
}
