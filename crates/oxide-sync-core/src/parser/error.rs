//! Parser error types.

use serde::Serialize;
use thiserror::Error;

use crate::lexer::{Span, Token, TokenKind};

/// A parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message} at position {}..{}", span.start, span.end)]
pub struct ParseError {
    /// Human-readable message, `expected X, found Y`.
    pub message: String,
    /// What the parser was looking for.
    pub expected: String,
    /// The offending token.
    pub found: String,
    /// Location of the offending token.
    pub span: Span,
    /// Tokens from the offending one to the end of the statement.
    pub remainder: Vec<String>,
}

impl ParseError {
    /// Creates an "expected X, found Y" error at `tokens[0]`.
    #[must_use]
    pub fn unexpected(expected: &str, tokens: &[Token]) -> Self {
        let (found, span) = match tokens.first() {
            Some(token) => (token.kind.to_string(), token.span),
            None => (TokenKind::Eof.to_string(), Span::default()),
        };
        let message = match tokens.first().map(|t| &t.kind) {
            Some(TokenKind::Error(message)) => message.clone(),
            _ => format!("expected {expected}, found {found}"),
        };
        Self {
            message,
            expected: expected.to_string(),
            found,
            span,
            remainder: tokens
                .iter()
                .take_while(|token| !token.is_eof())
                .map(|token| token.kind.to_string())
                .collect(),
        }
    }

    /// Creates an error about an accepted token with an invalid meaning,
    /// such as a duplicate option or an unknown type name.
    #[must_use]
    pub fn invalid(message: impl Into<String>, tokens: &[Token]) -> Self {
        let mut error = Self::unexpected("", tokens);
        error.message = message.into();
        error.expected.clear();
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    #[test]
    fn message_names_both_sides() {
        let tokens = Lexer::new("users (").tokenize();
        let error = ParseError::unexpected("`(`", &tokens);
        assert_eq!(error.message, "expected `(`, found users");
        assert_eq!(error.remainder, vec!["users", "("]);
        assert_eq!(error.to_string(), "expected `(`, found users at position 0..5");
    }

    #[test]
    fn lexer_errors_pass_through() {
        let tokens = Lexer::new("'open").tokenize();
        let error = ParseError::unexpected("a string", &tokens);
        assert!(error.message.contains("unterminated"), "{}", error.message);
    }
}
