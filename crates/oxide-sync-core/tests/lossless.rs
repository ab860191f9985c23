use oxide_sync_core::ast::ParsedStatement;
use oxide_sync_core::parse_statement;
use oxide_sync_core::types::DataType;

/// Parses `CREATE TABLE t (c <ty>)` and returns the column type.
fn ty(sql_type: &str) -> DataType {
    let sql = format!("CREATE TABLE t (c {sql_type})");
    match parse_statement(&sql).parsed {
        ParsedStatement::Table(mut table) => table.columns.remove(0).data_type,
        other => panic!("{sql}: {other:?}"),
    }
}

fn lossless(from: &str, to: &str) -> bool {
    ty(from).is_lossless(&ty(to))
}

#[test]
fn reflexive_for_every_category() {
    for sql_type in [
        "INT",
        "BIGINT UNSIGNED",
        "DECIMAL(10,2)",
        "DOUBLE",
        "VARCHAR(10)",
        "TEXT",
        "ENUM('a','b')",
        "SET('x')",
        "DATETIME(6)",
        "BIT(3)",
        "DATE",
    ] {
        assert!(lossless(sql_type, sql_type), "{sql_type}");
    }
}

#[test]
fn integers() {
    assert!(lossless("INT", "BIGINT"));
    assert!(!lossless("BIGINT", "INT"));
    assert!(!lossless("INT", "INT UNSIGNED"));
    assert!(!lossless("INT UNSIGNED", "INT"));
    assert!(lossless("INT UNSIGNED", "BIGINT"));
    assert!(lossless("INT(11)", "INTEGER"));
    assert!(lossless("BOOL", "SMALLINT"));
}

#[test]
fn strings() {
    assert!(lossless("VARCHAR(10)", "VARCHAR(20)"));
    assert!(!lossless("VARCHAR(20)", "VARCHAR(10)"));
    assert!(lossless("VARCHAR(10) CHARACTER SET latin1", "VARCHAR(10) CHARACTER SET utf8mb4"));
    assert!(!lossless("VARCHAR(10) CHARACTER SET utf8mb4", "VARCHAR(10) CHARACTER SET latin1"));
    assert!(lossless("INT", "VARCHAR(20)"));
    assert!(!lossless("BIGINT", "VARCHAR(5)"));
}

#[test]
fn enumerations() {
    assert!(lossless("ENUM('a','b')", "ENUM('a','b','c')"));
    assert!(!lossless("ENUM('a','b','c')", "ENUM('a','b')"));
    assert!(lossless("ENUM('a','b')", "SET('a','b')"));
    assert!(!lossless("SET('a','b')", "ENUM('a','b')"));

    let members: Vec<String> = (0..65).map(|i| format!("'v{i}'")).collect();
    let wide_set = format!("SET({})", members.join(","));
    assert!(!lossless("ENUM('v0','v1')", &wide_set));
}

#[test]
fn numeric_families() {
    assert!(lossless("DECIMAL(5,2)", "DECIMAL(7,3)"));
    assert!(!lossless("DECIMAL(5,2)", "DECIMAL(5,3)"));
    assert!(lossless("FLOAT", "DOUBLE"));
    assert!(!lossless("DOUBLE", "DECIMAL(65,30)"));
    assert!(lossless("REAL", "DOUBLE PRECISION"));
}

#[test]
fn temporal_categories_must_match() {
    assert!(lossless("TIME", "TIME(3)"));
    assert!(!lossless("DATETIME", "TIMESTAMP"));
    assert!(!lossless("DATE", "DATETIME"));
}
