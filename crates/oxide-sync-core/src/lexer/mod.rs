//! Tokenizer for MySQL DDL and DCL statements.
//!
//! Splits on whitespace and the punctuation `. , ( ) = @`, keeping quoted
//! string literals and back-quoted identifiers atomic.

mod span;
mod token;
mod tokenizer;

pub use span::Span;
pub use token::{Keyword, Token, TokenKind};
pub use tokenizer::Lexer;
