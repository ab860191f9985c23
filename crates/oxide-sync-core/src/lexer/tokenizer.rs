//! Lexer implementation.

use super::{Span, Token, TokenKind};

/// A lexer over a single statement.
pub struct Lexer<'a> {
    /// The input source code.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position of the start of the current token.
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_line(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
    }

    /// Skips whitespace, `#` and `-- ` line comments, and block comments
    /// (version comments such as `/*!50100 ... */` included).
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }

            match (self.peek(), self.peek_next()) {
                (Some('#'), _) => self.skip_line(),
                (Some('-'), Some('-'))
                    if self.input[self.pos + 2..]
                        .chars()
                        .next()
                        .map_or(true, char::is_whitespace) =>
                {
                    self.skip_line();
                }
                (Some('/'), Some('*')) => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            Some('*') if self.peek() == Some('/') => {
                                self.advance();
                                break;
                            }
                            None => break,
                            _ => {}
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::new(self.start, self.pos))
    }

    fn is_word_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '$'
    }

    /// Scans a word, number or `0x..` literal starting at `self.start`.
    fn scan_word_or_number(&mut self) -> Token {
        while self.peek().is_some_and(Self::is_word_char) {
            self.advance();
        }
        let text = &self.input[self.start..self.pos];

        if text.bytes().all(|b| b.is_ascii_digit()) {
            if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
            return self.make_token(TokenKind::Number(
                self.input[self.start..self.pos].to_string(),
            ));
        }

        let lower = text.to_ascii_lowercase();
        if let Some(hex) = lower.strip_prefix("0x") {
            if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return self.make_token(TokenKind::Literal(text.to_string()));
            }
        }
        if let Some((mantissa, exponent)) = lower.split_once('e') {
            if !mantissa.is_empty()
                && mantissa.bytes().all(|b| b.is_ascii_digit())
                && !exponent.is_empty()
                && exponent.bytes().all(|b| b.is_ascii_digit())
            {
                return self.make_token(TokenKind::Number(text.to_string()));
            }
        }

        self.make_token(TokenKind::Word(text.to_string()))
    }

    /// Scans a back-quoted identifier. Backslash is not an escape here.
    fn scan_quoted_identifier(&mut self) -> Token {
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                Some('`') if self.peek() == Some('`') => {
                    self.advance();
                    value.push('`');
                }
                Some('`') => return self.make_token(TokenKind::QuotedIdentifier(value)),
                Some(c) => value.push(c),
                None => {
                    return self.make_token(TokenKind::Error(String::from(
                        "unterminated quoted identifier",
                    )));
                }
            }
        }
    }

    /// Scans a `'` or `"` string, honoring backslash and doubled-quote escapes.
    fn scan_string(&mut self, quote: char) -> Token {
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                Some('\\') => match self.advance() {
                    Some('0') => value.push('\0'),
                    Some('b') => value.push('\u{8}'),
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some('Z') => value.push('\u{1a}'),
                    Some(c @ ('%' | '_')) => {
                        value.push('\\');
                        value.push(c);
                    }
                    Some(c) => value.push(c),
                    None => break,
                },
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.advance();
                        value.push(quote);
                    } else {
                        return self.make_token(TokenKind::String(value));
                    }
                }
                Some(c) => value.push(c),
                None => break,
            }
        }
        self.make_token(TokenKind::Error(String::from(
            "unterminated string literal",
        )))
    }

    /// Scans `b'0101'` / `x'ff'` literals; the prefix has not been consumed.
    fn scan_prefixed_literal(&mut self) -> Token {
        self.advance();
        self.advance();
        while let Some(c) = self.advance() {
            if c == '\'' {
                return self.make_token(TokenKind::Literal(
                    self.input[self.start..self.pos].to_string(),
                ));
            }
        }
        self.make_token(TokenKind::Error(String::from(
            "unterminated bit or hex literal",
        )))
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        self.advance();
        self.make_token(kind)
    }

    /// Scans the next token.
    #[must_use]
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        self.start = self.pos;

        let Some(c) = self.peek() else {
            return self.make_token(TokenKind::Eof);
        };

        match c {
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            ',' => self.single(TokenKind::Comma),
            '.' => self.single(TokenKind::Dot),
            '=' => self.single(TokenKind::Eq),
            '@' => self.single(TokenKind::At),
            ';' => self.single(TokenKind::Semicolon),
            '*' => self.single(TokenKind::Star),
            '`' => self.scan_quoted_identifier(),
            '\'' | '"' => self.scan_string(c),
            'b' | 'B' | 'x' | 'X' if self.peek_next() == Some('\'') => {
                self.scan_prefixed_literal()
            }
            c if Self::is_word_char(c) => self.scan_word_or_number(),
            other => self.single(TokenKind::Other(other)),
        }
    }

    /// Tokenizes the entire input, ending with an EOF token.
    #[must_use]
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn word(w: &str) -> TokenKind {
        TokenKind::Word(w.to_string())
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(kinds("   \n\t"), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_punctuation_splits_words() {
        assert_eq!(
            kinds("db.t(a,b)=c@d"),
            vec![
                word("db"),
                TokenKind::Dot,
                word("t"),
                TokenKind::LeftParen,
                word("a"),
                TokenKind::Comma,
                word("b"),
                TokenKind::RightParen,
                TokenKind::Eq,
                word("c"),
                TokenKind::At,
                word("d"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_quoted_identifier_is_atomic() {
        assert_eq!(
            kinds("`my table`.`a``b`"),
            vec![
                TokenKind::QuotedIdentifier("my table".into()),
                TokenKind::Dot,
                TokenKind::QuotedIdentifier("a`b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_backslash_is_literal_inside_identifiers() {
        assert_eq!(
            kinds(r"`a\`"),
            vec![TokenKind::QuotedIdentifier(r"a\".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r"'it''s' 'a\'b' 'x\ny' 'p\%'"),
            vec![
                TokenKind::String("it's".into()),
                TokenKind::String("a'b".into()),
                TokenKind::String("x\ny".into()),
                TokenKind::String(r"p\%".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_keeps_punctuation() {
        assert_eq!(
            kinds("'a, b (c).d'"),
            vec![TokenKind::String("a, b (c).d".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("10 1.50 2e3 0x1F 1col"),
            vec![
                TokenKind::Number("10".into()),
                TokenKind::Number("1.50".into()),
                TokenKind::Number("2e3".into()),
                TokenKind::Literal("0x1F".into()),
                word("1col"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_bit_and_hex_literals() {
        assert_eq!(
            kinds("b'01' X'fF' bar"),
            vec![
                TokenKind::Literal("b'01'".into()),
                TokenKind::Literal("X'fF'".into()),
                word("bar"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("a # one\n b -- two\n c /*!50100 d */ e"),
            vec![word("a"), word("b"), word("c"), word("e"), TokenKind::Eof]
        );
    }

    #[test]
    fn test_double_dash_needs_whitespace() {
        assert_eq!(
            kinds("a--b"),
            vec![
                word("a"),
                TokenKind::Other('-'),
                TokenKind::Other('-'),
                word("b"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = kinds("'abc");
        assert!(matches!(tokens[0], TokenKind::Error(_)));
    }

    #[test]
    fn test_spans_cover_source() {
        let input = "KEY `idx` (a)";
        let tokens = Lexer::new(input).tokenize();
        assert_eq!(tokens[1].span.slice(input), "`idx`");
        assert_eq!(tokens[3].span.slice(input), "a");
    }
}
