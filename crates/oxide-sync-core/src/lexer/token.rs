//! Token types for the statement lexer.

use core::fmt;

use super::Span;

/// Keywords the statement grammars branch on.
///
/// MySQL keeps most of these non-reserved, so the lexer never produces a
/// keyword token directly: words stay [`TokenKind::Word`] and the parser asks
/// whether a word *is* a given keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Statement heads
    Create,
    Alter,
    Grant,
    Revoke,
    Insert,
    Replace,
    Table,
    User,
    Temporary,

    // Conditionals
    If,
    Not,
    Exists,

    // Column attributes
    Null,
    Default,
    AutoIncrement,
    Comment,
    On,
    Update,
    Character,
    Charset,
    Set,
    Collate,
    Unsigned,
    Signed,
    Zerofill,

    // Keys and constraints
    Primary,
    Key,
    Index,
    Unique,
    Fulltext,
    Spatial,
    Using,
    Asc,
    Desc,
    Constraint,
    Foreign,
    Check,
    References,

    // Privileges
    To,
    From,
    With,
    Option,
    All,
    Privileges,

    // Users
    Identified,
    Require,
    None,
    Ssl,
    X509,
    Cipher,
    Issuer,
    Subject,
    And,

    // Type modifiers
    Binary,
    Varying,
    Precision,
    National,
    Long,

    // Misc
    Like,
    As,
}

impl Keyword {
    /// Attempts to parse a keyword from a word (case-insensitive).
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CREATE" => Some(Self::Create),
            "ALTER" => Some(Self::Alter),
            "GRANT" => Some(Self::Grant),
            "REVOKE" => Some(Self::Revoke),
            "INSERT" => Some(Self::Insert),
            "REPLACE" => Some(Self::Replace),
            "TABLE" => Some(Self::Table),
            "USER" => Some(Self::User),
            "TEMPORARY" => Some(Self::Temporary),
            "IF" => Some(Self::If),
            "NOT" => Some(Self::Not),
            "EXISTS" => Some(Self::Exists),
            "NULL" => Some(Self::Null),
            "DEFAULT" => Some(Self::Default),
            "AUTO_INCREMENT" => Some(Self::AutoIncrement),
            "COMMENT" => Some(Self::Comment),
            "ON" => Some(Self::On),
            "UPDATE" => Some(Self::Update),
            "CHARACTER" => Some(Self::Character),
            "CHARSET" => Some(Self::Charset),
            "SET" => Some(Self::Set),
            "COLLATE" => Some(Self::Collate),
            "UNSIGNED" => Some(Self::Unsigned),
            "SIGNED" => Some(Self::Signed),
            "ZEROFILL" => Some(Self::Zerofill),
            "PRIMARY" => Some(Self::Primary),
            "KEY" => Some(Self::Key),
            "INDEX" => Some(Self::Index),
            "UNIQUE" => Some(Self::Unique),
            "FULLTEXT" => Some(Self::Fulltext),
            "SPATIAL" => Some(Self::Spatial),
            "USING" => Some(Self::Using),
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            "CONSTRAINT" => Some(Self::Constraint),
            "FOREIGN" => Some(Self::Foreign),
            "CHECK" => Some(Self::Check),
            "REFERENCES" => Some(Self::References),
            "TO" => Some(Self::To),
            "FROM" => Some(Self::From),
            "WITH" => Some(Self::With),
            "OPTION" => Some(Self::Option),
            "ALL" => Some(Self::All),
            "PRIVILEGES" => Some(Self::Privileges),
            "IDENTIFIED" => Some(Self::Identified),
            "REQUIRE" => Some(Self::Require),
            "NONE" => Some(Self::None),
            "SSL" => Some(Self::Ssl),
            "X509" => Some(Self::X509),
            "CIPHER" => Some(Self::Cipher),
            "ISSUER" => Some(Self::Issuer),
            "SUBJECT" => Some(Self::Subject),
            "AND" => Some(Self::And),
            "BINARY" => Some(Self::Binary),
            "VARYING" => Some(Self::Varying),
            "PRECISION" => Some(Self::Precision),
            "NATIONAL" => Some(Self::National),
            "LONG" => Some(Self::Long),
            "LIKE" => Some(Self::Like),
            "AS" => Some(Self::As),
            _ => None,
        }
    }

    /// Returns the keyword as it is written in SQL.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Alter => "ALTER",
            Self::Grant => "GRANT",
            Self::Revoke => "REVOKE",
            Self::Insert => "INSERT",
            Self::Replace => "REPLACE",
            Self::Table => "TABLE",
            Self::User => "USER",
            Self::Temporary => "TEMPORARY",
            Self::If => "IF",
            Self::Not => "NOT",
            Self::Exists => "EXISTS",
            Self::Null => "NULL",
            Self::Default => "DEFAULT",
            Self::AutoIncrement => "AUTO_INCREMENT",
            Self::Comment => "COMMENT",
            Self::On => "ON",
            Self::Update => "UPDATE",
            Self::Character => "CHARACTER",
            Self::Charset => "CHARSET",
            Self::Set => "SET",
            Self::Collate => "COLLATE",
            Self::Unsigned => "UNSIGNED",
            Self::Signed => "SIGNED",
            Self::Zerofill => "ZEROFILL",
            Self::Primary => "PRIMARY",
            Self::Key => "KEY",
            Self::Index => "INDEX",
            Self::Unique => "UNIQUE",
            Self::Fulltext => "FULLTEXT",
            Self::Spatial => "SPATIAL",
            Self::Using => "USING",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::Constraint => "CONSTRAINT",
            Self::Foreign => "FOREIGN",
            Self::Check => "CHECK",
            Self::References => "REFERENCES",
            Self::To => "TO",
            Self::From => "FROM",
            Self::With => "WITH",
            Self::Option => "OPTION",
            Self::All => "ALL",
            Self::Privileges => "PRIVILEGES",
            Self::Identified => "IDENTIFIED",
            Self::Require => "REQUIRE",
            Self::None => "NONE",
            Self::Ssl => "SSL",
            Self::X509 => "X509",
            Self::Cipher => "CIPHER",
            Self::Issuer => "ISSUER",
            Self::Subject => "SUBJECT",
            Self::And => "AND",
            Self::Binary => "BINARY",
            Self::Varying => "VARYING",
            Self::Precision => "PRECISION",
            Self::National => "NATIONAL",
            Self::Long => "LONG",
            Self::Like => "LIKE",
            Self::As => "AS",
        }
    }
}

/// Token kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Unquoted word: an identifier or a keyword.
    Word(String),
    /// Back-quoted identifier, with the quotes removed.
    QuotedIdentifier(String),
    /// Single- or double-quoted string, unescaped.
    String(String),
    /// Unsigned numeric literal, as written.
    Number(String),
    /// Bit or hex literal (`b'01'`, `x'ff'`, `0x1F`), as written.
    Literal(String),
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `=`
    Eq,
    /// `@`
    At,
    /// `;`
    Semicolon,
    /// `*`
    Star,
    /// Any other single character.
    Other(char),
    /// Lexing error.
    Error(String),
    /// End of input.
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(w) | Self::Number(w) | Self::Literal(w) => f.write_str(w),
            Self::QuotedIdentifier(name) => write!(f, "`{}`", name.replace('`', "``")),
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::LeftParen => f.write_str("("),
            Self::RightParen => f.write_str(")"),
            Self::Comma => f.write_str(","),
            Self::Dot => f.write_str("."),
            Self::Eq => f.write_str("="),
            Self::At => f.write_str("@"),
            Self::Semicolon => f.write_str(";"),
            Self::Star => f.write_str("*"),
            Self::Other(c) => write!(f, "{c}"),
            Self::Error(message) => write!(f, "<{message}>"),
            Self::Eof => f.write_str("end of statement"),
        }
    }
}

/// A token with its location in the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token kind.
    pub kind: TokenKind,
    /// Source span.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns the keyword this token spells, if it is an unquoted word.
    #[must_use]
    pub fn as_keyword(&self) -> Option<Keyword> {
        match &self.kind {
            TokenKind::Word(w) => Keyword::from_str(w),
            _ => None,
        }
    }

    /// Returns true if this token is the unquoted word `keyword`.
    #[must_use]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.as_keyword() == Some(keyword)
    }
}
