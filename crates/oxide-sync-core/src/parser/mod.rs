//! Statement parser.
//!
//! [`parse_statement`] classifies a single statement and, for the kinds the
//! synchronizer understands, builds its descriptor. It never fails: a
//! recognized statement that does not parse yields
//! [`ParsedStatement::Invalid`](crate::ast::ParsedStatement::Invalid)
//! carrying the [`ParseError`].

mod data_type;
mod error;
mod grant;
#[allow(clippy::module_inception)]
mod parser;
mod table;
mod user;

pub use error::ParseError;
pub use parser::Parser;

use crate::ast::Statement;
use crate::splitter::split_statements;
use crate::types::RealPolicy;

/// Options that change how statements are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Meaning of `REAL`.
    pub real_policy: RealPolicy,
}

/// Parses one statement with default options.
#[must_use]
pub fn parse_statement(text: &str) -> Statement {
    parse_statement_with(text, ParseOptions::default())
}

/// Parses one statement.
#[must_use]
pub fn parse_statement_with(text: &str, options: ParseOptions) -> Statement {
    let parsed = Parser::new(text, options).parse_statement();
    Statement {
        text: text.to_string(),
        parsed,
    }
}

/// Splits a script and parses every statement in it.
#[must_use]
pub fn parse_script(text: &str, options: ParseOptions) -> Vec<Statement> {
    split_statements(text)
        .iter()
        .map(|statement| parse_statement_with(statement, options))
        .collect()
}
