//! Parser core: token cursor, helpers, and statement dispatch.

use super::error::ParseError;
use super::ParseOptions;
use crate::ast::{GrantKind, ParsedStatement, StatementKind};
use crate::lexer::{Keyword, Lexer, Span, Token, TokenKind};

/// Recursive-descent parser over one statement.
pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    pub(super) options: ParseOptions,
}

impl<'a> Parser<'a> {
    /// Creates a parser for one statement (without its terminating `;`).
    #[must_use]
    pub fn new(source: &'a str, options: ParseOptions) -> Self {
        Self {
            source,
            tokens: Lexer::new(source).tokenize(),
            pos: 0,
            options,
        }
    }

    /// Decides the statement kind from its leading keywords.
    #[must_use]
    pub fn classify(&self) -> StatementKind {
        let first = self.peek(0);
        if first.is_keyword(Keyword::Create) {
            let mut offset = 1;
            if self.peek(offset).is_keyword(Keyword::Temporary) {
                offset += 1;
            }
            if self.peek(offset).is_keyword(Keyword::Table) {
                return StatementKind::Table;
            }
            if offset == 1 && self.peek(1).is_keyword(Keyword::User) {
                return StatementKind::User;
            }
            return StatementKind::Unknown;
        }
        if first.is_keyword(Keyword::Alter) && self.peek(1).is_keyword(Keyword::User) {
            return StatementKind::User;
        }
        match first.as_keyword() {
            Some(Keyword::Grant) => StatementKind::Grant,
            Some(Keyword::Revoke) => StatementKind::Revoke,
            Some(Keyword::Insert | Keyword::Replace) => StatementKind::Insert,
            _ => StatementKind::Unknown,
        }
    }

    /// Parses the statement. Never fails: recognized statements that do not
    /// parse come back as [`ParsedStatement::Invalid`].
    #[must_use]
    pub fn parse_statement(&mut self) -> ParsedStatement {
        let kind = self.classify();
        let result = match kind {
            StatementKind::Table => self.parse_create_table().map(ParsedStatement::Table),
            StatementKind::Grant => self.parse_grant(GrantKind::Grant).map(ParsedStatement::Grant),
            StatementKind::Revoke => self
                .parse_grant(GrantKind::Revoke)
                .map(ParsedStatement::Revoke),
            StatementKind::User => self.parse_user().map(ParsedStatement::User),
            StatementKind::Insert => Ok(ParsedStatement::Insert),
            StatementKind::Unknown => Ok(ParsedStatement::Unknown),
        };
        result.unwrap_or_else(|error| ParsedStatement::Invalid { kind, error })
    }

    // --- Helper methods ---

    pub(super) fn current(&self) -> &Token {
        self.peek(0)
    }

    /// Token `offset` places ahead; past the end this is the final EOF.
    pub(super) fn peek(&self, offset: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + offset).min(last)]
    }

    /// Consumes and returns the current token; EOF is never consumed.
    pub(super) fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    /// Checks if the current token has the same kind (ignoring payload).
    pub(super) fn check(&self, kind: &TokenKind) -> bool {
        core::mem::discriminant(&self.current().kind) == core::mem::discriminant(kind)
    }

    pub(super) fn eat(&mut self, kind: &TokenKind) -> bool {
        let matched = self.check(kind);
        if matched {
            self.advance();
        }
        matched
    }

    pub(super) fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(what))
        }
    }

    pub(super) fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current().is_keyword(keyword)
    }

    pub(super) fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        let matched = self.check_keyword(keyword);
        if matched {
            self.advance();
        }
        matched
    }

    pub(super) fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(keyword.as_str()))
        }
    }

    /// Checks if the token `offset` places ahead is the unquoted `word`.
    pub(super) fn word_at(&self, offset: usize, word: &str) -> bool {
        matches!(&self.peek(offset).kind, TokenKind::Word(w) if w.eq_ignore_ascii_case(word))
    }

    pub(super) fn check_word(&self, word: &str) -> bool {
        self.word_at(0, word)
    }

    pub(super) fn eat_word(&mut self, word: &str) -> bool {
        let matched = self.check_word(word);
        if matched {
            self.advance();
        }
        matched
    }

    /// Consumes the word sequence only if all of it is present.
    pub(super) fn eat_words(&mut self, words: &[&str]) -> bool {
        let matched = words
            .iter()
            .enumerate()
            .all(|(offset, word)| self.word_at(offset, word));
        if matched {
            self.pos += words.len();
        }
        matched
    }

    /// Current unquoted word, uppercased.
    pub(super) fn current_word(&self) -> Option<String> {
        match &self.current().kind {
            TokenKind::Word(w) => Some(w.to_ascii_uppercase()),
            _ => None,
        }
    }

    /// Expects a bare or back-quoted identifier.
    pub(super) fn expect_identifier(&mut self, what: &str) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Word(name) | TokenKind::QuotedIdentifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(what)),
        }
    }

    pub(super) fn expect_string(&mut self, what: &str) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::String(value) => {
                let value = value.clone();
                self.advance();
                Ok(value)
            }
            _ => Err(self.error(what)),
        }
    }

    /// Expects an unsigned integer literal.
    pub(super) fn expect_number(&mut self, what: &str) -> Result<u32, ParseError> {
        match &self.current().kind {
            TokenKind::Number(n) => match n.parse::<u32>() {
                Ok(value) => {
                    self.advance();
                    Ok(value)
                }
                Err(_) => Err(self.error(what)),
            },
            _ => Err(self.error(what)),
        }
    }

    /// Parses `( n )`.
    pub(super) fn parse_parenthesized_number(&mut self, what: &str) -> Result<u32, ParseError> {
        self.expect(&TokenKind::LeftParen, "`(`")?;
        let value = self.expect_number(what)?;
        self.expect(&TokenKind::RightParen, "`)`")?;
        Ok(value)
    }

    /// Expects a single-token value: word, number, string or identifier.
    pub(super) fn expect_value(&mut self, what: &str) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Word(v)
            | TokenKind::Number(v)
            | TokenKind::String(v)
            | TokenKind::QuotedIdentifier(v)
            | TokenKind::Literal(v) => {
                let value = v.clone();
                self.advance();
                Ok(value)
            }
            _ => Err(self.error(what)),
        }
    }

    /// Consumes a balanced `( ... )` group, returning the text between the
    /// outer parentheses.
    pub(super) fn parse_balanced(&mut self) -> Result<String, ParseError> {
        let open = self.current().span;
        self.expect(&TokenKind::LeftParen, "`(`")?;
        let mut depth = 1usize;
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        let inner = Span::new(open.end, token.span.start);
                        return Ok(inner.slice(self.source).trim().to_string());
                    }
                }
                TokenKind::Eof => return Err(self.error("`)`")),
                _ => {}
            }
        }
    }

    /// Consumes tokens up to (not including) a `,` or `)` at depth zero,
    /// returning the source text from byte offset `start` to there.
    pub(super) fn parse_until_separator(&mut self, start: usize) -> Result<String, ParseError> {
        let mut end = self
            .pos
            .checked_sub(1)
            .map_or(start, |previous| self.tokens[previous].span.end)
            .max(start);
        loop {
            match self.current().kind {
                TokenKind::Comma | TokenKind::RightParen | TokenKind::Eof => break,
                TokenKind::LeftParen => {
                    self.parse_balanced()?;
                    end = self.tokens[self.pos - 1].span.end;
                }
                _ => end = self.advance().span.end,
            }
        }
        Ok(Span::new(start, end).slice(self.source).trim().to_string())
    }

    /// Returns true at the end of the statement.
    pub(super) fn at_end(&self) -> bool {
        self.check(&TokenKind::Eof) || self.check(&TokenKind::Semicolon)
    }

    /// Expects the end of the statement, allowing one trailing `;`.
    pub(super) fn expect_end(&mut self) -> Result<(), ParseError> {
        self.eat(&TokenKind::Semicolon);
        if self.check(&TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.error("end of statement"))
        }
    }

    /// "expected X, found <current token>".
    pub(super) fn error(&self, expected: &str) -> ParseError {
        ParseError::unexpected(expected, &self.tokens[self.pos.min(self.tokens.len() - 1)..])
    }

    /// Error at the token `back` places behind the cursor.
    pub(super) fn invalid(&self, message: impl Into<String>, back: usize) -> ParseError {
        ParseError::invalid(message, &self.tokens[self.pos.saturating_sub(back)..])
    }
}
