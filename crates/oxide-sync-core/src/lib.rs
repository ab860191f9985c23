//! # oxide-sync-core
//!
//! Statement model for declarative MySQL schema reconciliation.
//!
//! This crate provides:
//! - A quote- and comment-aware splitter for SQL scripts
//! - A hand-written recursive descent parser for `CREATE TABLE`,
//!   `GRANT`/`REVOKE` and `CREATE`/`ALTER USER`
//! - A column type model with synonym resolution and a losslessness
//!   predicate used to judge `ALTER TABLE ... MODIFY`
//!
//! ## Parsing
//!
//! ```rust
//! use oxide_sync_core::ast::ParsedStatement;
//! use oxide_sync_core::parse_statement;
//!
//! let statement = parse_statement("CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(50))");
//! let ParsedStatement::Table(table) = statement.parsed else {
//!     panic!("not a table");
//! };
//! assert_eq!(table.columns[0].data_type.to_string(), "INT");
//! assert!(!table.columns[0].nullable);
//! ```
//!
//! ## Lossless conversions
//!
//! ```rust
//! use oxide_sync_core::types::{DataType, IntegerKind};
//!
//! let small = DataType::integer(IntegerKind::SmallInt);
//! let big = DataType::integer(IntegerKind::BigInt);
//! assert!(small.is_lossless(&big));
//! assert!(!big.is_lossless(&small));
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod splitter;
pub mod types;

pub use ast::{ParsedStatement, Statement, StatementKind};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{parse_script, parse_statement, parse_statement_with, ParseError, ParseOptions, Parser};
pub use splitter::split_statements;
pub use types::{DataType, RealPolicy};
