mod common;

use common::{parse_err, parse_grants, parse_users};
use oxide_sync_core::ast::{PrivilegeScope, StatementKind, TlsRequirement};
use oxide_sync_core::{parse_script, split_statements, ParseOptions};

#[test]
fn script_statements_keep_their_kinds() {
    let script = "
        -- schema
        CREATE TABLE t (a INT);
        GRANT SELECT ON app.* TO 'u'@'%';
        REVOKE INSERT ON app.t FROM 'u'@'%';
        CREATE USER 'u'@'%' REQUIRE SSL;
        INSERT INTO t VALUES (1);
        SET @x = 'a;b';
        CREATE TABLE broken (;
    ";
    let kinds: Vec<StatementKind> = parse_script(script, ParseOptions::default())
        .iter()
        .map(|statement| statement.kind())
        .collect();
    assert_eq!(
        kinds,
        vec![
            StatementKind::Table,
            StatementKind::Grant,
            StatementKind::Revoke,
            StatementKind::User,
            StatementKind::Insert,
            StatementKind::Unknown,
            StatementKind::Table,
        ]
    );
}

#[test]
fn invalid_statements_keep_their_text() {
    let statements = parse_script("CREATE TABLE broken (a FOO)", ParseOptions::default());
    assert_eq!(statements.len(), 1);
    assert!(!statements[0].is_valid());
    assert_eq!(statements[0].text, "CREATE TABLE broken (a FOO)");
    assert_eq!(
        statements[0].error().map(|e| e.message.as_str()),
        Some("unknown data type FOO")
    );
}

#[test]
fn splitter_respects_quotes_and_comments() {
    let statements = split_statements(
        "SELECT ';' AS a; # trailing; comment\nSELECT `x;y` FROM t /* ; */; SELECT \"\\\";\"",
    );
    assert_eq!(
        statements,
        vec![
            "SELECT ';' AS a",
            "SELECT `x;y` FROM t /* ; */",
            "SELECT \"\\\";\""
        ]
    );
}

#[test]
fn repeated_column_privileges_union() {
    let first = parse_grants("GRANT SELECT (a) ON db.t TO u");
    let second = parse_grants("GRANT SELECT (b) ON db.t TO u");
    assert_eq!(first[0].key(), second[0].key());
    let merged = first[0].privileges["SELECT"].merge(&second[0].privileges["SELECT"]);
    assert_eq!(merged, PrivilegeScope::columns(["a", "b"]));
}

#[test]
fn grant_renders_canonically() {
    let grants = parse_grants("grant select(b,a), insert on `db`.`t` to u@'localhost' with grant option");
    assert_eq!(
        grants[0].to_string(),
        "GRANT INSERT, SELECT (a, b) ON db.t TO 'u'@'localhost' WITH GRANT OPTION"
    );
    let reparsed = parse_grants(&grants[0].to_string());
    assert_eq!(reparsed, grants);
}

#[test]
fn user_requirements_are_order_independent() {
    let a = parse_users("ALTER USER u REQUIRE SUBJECT 's' AND ISSUER 'i'");
    let b = parse_users("ALTER USER u REQUIRE ISSUER 'i' SUBJECT 's'");
    assert_eq!(a[0].tls, b[0].tls);
    assert!(matches!(a[0].tls, Some(TlsRequirement::Specified(_))));
}

#[test]
fn grant_errors_name_the_expectation() {
    let error = parse_err("GRANT SELECT ON db.t u");
    assert_eq!(error.expected, "TO");
    assert_eq!(error.found, "u");

    let error = parse_err("CREATE USER 'u'@'%' REQUIRE MAGIC");
    assert_eq!(error.expected, "NONE, SSL, X509, SUBJECT, ISSUER or CIPHER");
}
