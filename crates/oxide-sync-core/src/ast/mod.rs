//! Statement descriptors.
//!
//! Every descriptor renders back to canonical SQL through `Display`.

mod grant;
mod options;
mod statement;
mod table;
mod user;

pub use grant::{
    merge_privilege, GrantDescription, GrantKind, ObjectType, PrivilegeMap, PrivilegeScope,
    UserHost, GRANT_OPTION,
};
pub use options::{table_option, OptionValue, TableOptionSpec, TableOptions, TABLE_OPTIONS};
pub use statement::{ParsedStatement, Statement, StatementKind};
pub use table::{
    ColumnDescription, DefaultValue, IndexColumn, IndexDescription, IndexKind, IndexOrder,
    Position, TableDescription, TableName,
};
pub use user::{TlsOption, TlsRequirement, UserDescription, UserStatementKind};

/// Words that must be quoted when used as identifiers.
const RESERVED: &[&str] = &[
    "ADD", "ALL", "ALTER", "ANALYZE", "AND", "AS", "ASC", "BEFORE", "BETWEEN", "BIGINT", "BINARY",
    "BLOB", "BOTH", "BY", "CALL", "CASCADE", "CASE", "CHANGE", "CHAR", "CHARACTER", "CHECK",
    "COLLATE", "COLUMN", "CONDITION", "CONSTRAINT", "CONTINUE", "CONVERT", "CREATE", "CROSS",
    "CUBE", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "CURSOR",
    "DATABASE", "DATABASES", "DECIMAL", "DECLARE", "DEFAULT", "DELETE", "DESC", "DESCRIBE",
    "DISTINCT", "DIV", "DOUBLE", "DROP", "DUAL", "EACH", "ELSE", "ELSEIF", "ENCLOSED", "ESCAPED",
    "EXCEPT", "EXISTS", "EXIT", "EXPLAIN", "FALSE", "FETCH", "FLOAT", "FOR", "FORCE", "FOREIGN",
    "FROM", "FULLTEXT", "FUNCTION", "GENERATED", "GET", "GRANT", "GROUP", "GROUPS", "HAVING",
    "IF", "IGNORE", "IN", "INDEX", "INNER", "INSERT", "INT", "INTEGER", "INTERVAL", "INTO", "IS",
    "ITERATE", "JOIN", "KEY", "KEYS", "KILL", "LEADING", "LEAVE", "LEFT", "LIKE", "LIMIT",
    "LINES", "LOAD", "LOCK", "LONG", "LOOP", "MATCH", "MOD", "NATURAL", "NOT", "NULL", "NUMERIC",
    "OF", "ON", "OPTION", "OR", "ORDER", "OUT", "OUTER", "OVER", "PARTITION", "PRIMARY",
    "PROCEDURE", "RANGE", "RANK", "READ", "REAL", "RECURSIVE", "REFERENCES", "REGEXP", "RELEASE",
    "RENAME", "REPEAT", "REPLACE", "REQUIRE", "RESTRICT", "RETURN", "REVOKE", "RIGHT", "RLIKE",
    "ROW", "ROWS", "SCHEMA", "SELECT", "SET", "SHOW", "SMALLINT", "SPATIAL", "SQL", "STARTING",
    "SYSTEM", "TABLE", "TERMINATED", "THEN", "TO", "TRAILING", "TRIGGER", "TRUE", "UNION",
    "UNIQUE", "UNLOCK", "UNSIGNED", "UPDATE", "USAGE", "USE", "USING", "VALUES", "VARCHAR",
    "VARYING", "VIRTUAL", "WHEN", "WHERE", "WHILE", "WINDOW", "WITH", "WRITE", "XOR", "ZEROFILL",
];

/// Renders an identifier, back-quoting it only when required.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !name.chars().all(|c| c.is_ascii_digit())
        && !RESERVED.iter().any(|w| w.eq_ignore_ascii_case(name));
    if plain {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

/// Renders a string literal with single quotes.
#[must_use]
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_quoted_when_needed() {
        assert_eq!(quote_identifier("users"), "users");
        assert_eq!(quote_identifier("user_id2"), "user_id2");
        assert_eq!(quote_identifier("order"), "`order`");
        assert_eq!(quote_identifier("my table"), "`my table`");
        assert_eq!(quote_identifier("a`b"), "`a``b`");
        assert_eq!(quote_identifier("123"), "`123`");
        assert_eq!(quote_identifier(""), "``");
    }

    #[test]
    fn strings_escaped() {
        assert_eq!(quote_string("plain"), "'plain'");
        assert_eq!(quote_string("it's"), "'it''s'");
        assert_eq!(quote_string("a\\b"), "'a\\\\b'");
        assert_eq!(quote_string("line\nbreak"), "'line\\nbreak'");
    }
}
