//! Splits raw SQL text into individual statements.
//!
//! Statements end at a top-level `;`. Quote state is tracked for `'`, `"` and
//! `` ` ``; backslash escapes the next character inside strings but never
//! inside back-quoted identifiers. `#` and `--` followed by whitespace start
//! a comment running to the end of the line; those comments are dropped.
//! Block comments are kept in the statement text, since version comments
//! (`/*!50100 ... */`) can carry meaning for the server.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Splits `text` into trimmed, non-empty statement strings, without the
/// terminating `;`.
#[must_use]
pub fn split_statements(text: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                ';' => {
                    push_statement(&mut statements, &mut current);
                }
                '\'' | '"' | '`' => {
                    state = State::Quoted(c);
                    current.push(c);
                }
                '#' => state = State::LineComment,
                '-' if chars.peek() == Some(&'-') => {
                    let mut lookahead = chars.clone();
                    lookahead.next();
                    if lookahead.peek().map_or(true, |n| n.is_whitespace()) {
                        chars.next();
                        state = State::LineComment;
                    } else {
                        current.push(c);
                    }
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    current.push_str("/*");
                    state = State::BlockComment;
                }
                _ => current.push(c),
            },
            State::Quoted(quote) => {
                current.push(c);
                if c == '\\' && quote != '`' {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                } else if c == quote {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    current.push('\n');
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                current.push(c);
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    current.push('/');
                    state = State::Normal;
                }
            }
        }
    }
    push_statement(&mut statements, &mut current);
    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_top_level_semicolons() {
        assert_eq!(
            split_statements("CREATE TABLE a (id INT);\n\nGRANT SELECT ON d.a TO 'u'@'%';"),
            vec![
                "CREATE TABLE a (id INT)",
                "GRANT SELECT ON d.a TO 'u'@'%'"
            ]
        );
    }

    #[test]
    fn keeps_trailing_statement_without_semicolon() {
        assert_eq!(split_statements("SELECT 1; SELECT 2"), vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn semicolons_inside_quotes_do_not_split() {
        let sql = "CREATE TABLE t (a INT COMMENT 'x;y', `b;c` INT, d INT COMMENT \"p;q\")";
        assert_eq!(split_statements(sql), vec![sql]);
    }

    #[test]
    fn backslash_escapes_strings_only() {
        assert_eq!(
            split_statements(r"SELECT 'a\';b'; SELECT `c\`; SELECT 3"),
            vec![r"SELECT 'a\';b'", r"SELECT `c\`", "SELECT 3"]
        );
    }

    #[test]
    fn line_comments_are_dropped() {
        assert_eq!(
            split_statements("# header; still comment\nSELECT 1 -- trailing; comment\n;\n-- only a comment"),
            vec!["SELECT 1"]
        );
    }

    #[test]
    fn double_dash_without_space_is_not_a_comment() {
        assert_eq!(split_statements("SELECT 1--2; SELECT 3"), vec!["SELECT 1--2", "SELECT 3"]);
    }

    #[test]
    fn comment_markers_inside_quotes_are_text() {
        assert_eq!(
            split_statements("SELECT '#not; -- comment'"),
            vec!["SELECT '#not; -- comment'"]
        );
    }

    #[test]
    fn block_comments_are_kept_and_protect_semicolons() {
        assert_eq!(
            split_statements("CREATE TABLE t (a INT) /*!50100 PARTITION; x */; SELECT 1"),
            vec!["CREATE TABLE t (a INT) /*!50100 PARTITION; x */", "SELECT 1"]
        );
    }
}
