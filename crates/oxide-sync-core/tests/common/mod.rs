#![allow(dead_code)]

use oxide_sync_core::ast::{GrantDescription, TableDescription, UserDescription};
use oxide_sync_core::{parse_statement, ParseError, ParsedStatement};

pub fn parse_table(sql: &str) -> TableDescription {
    match parse_statement(sql).parsed {
        ParsedStatement::Table(table) => table,
        other => panic!("Expected CREATE TABLE for: {sql}\nGot: {other:?}"),
    }
}

pub fn parse_grants(sql: &str) -> Vec<GrantDescription> {
    match parse_statement(sql).parsed {
        ParsedStatement::Grant(grants) | ParsedStatement::Revoke(grants) => grants,
        other => panic!("Expected GRANT or REVOKE for: {sql}\nGot: {other:?}"),
    }
}

pub fn parse_users(sql: &str) -> Vec<UserDescription> {
    match parse_statement(sql).parsed {
        ParsedStatement::User(users) => users,
        other => panic!("Expected CREATE/ALTER USER for: {sql}\nGot: {other:?}"),
    }
}

pub fn parse_err(sql: &str) -> ParseError {
    match parse_statement(sql).parsed {
        ParsedStatement::Invalid { error, .. } => error,
        other => panic!("Expected parse error for: {sql}\nGot: {other:?}"),
    }
}

/// Verifies that rendering is faithful: the rendered SQL re-parses to an
/// equal descriptor, and rendering that again is a fixed point.
pub fn round_trip(sql: &str) {
    let table = parse_table(sql);
    let rendered = table.to_string();
    let reparsed = parse_table(&rendered);
    assert_eq!(
        table, reparsed,
        "Round-trip changed the descriptor.\n  Input:    {sql}\n  Rendered: {rendered}"
    );
    assert_eq!(rendered, reparsed.to_string());
}
