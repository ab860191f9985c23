mod common;

use common::{reconcile, row, MockExecutor};
use oxide_sync::guard::GuardState;
use oxide_sync::orchestrator::Applier;

const NAME_20: &str = "CREATE TABLE `t` (`name` varchar(20) DEFAULT NULL) ENGINE=InnoDB";

#[tokio::test]
async fn widening_runs_without_a_guard_query() {
    let executor = MockExecutor::new().table(
        "t",
        "CREATE TABLE `t` (`v` int DEFAULT NULL) ENGINE=InnoDB",
    );
    let mut result = reconcile(&executor, "CREATE TABLE t (v VARCHAR(20));").await;
    assert!(result.statements().all(|s| s.state == GuardState::Safe));

    let report = Applier::new(&executor).apply(&mut result).await;
    assert_eq!(report.executed, 1);
    assert_eq!(report.refused, 0);
    assert!(executor.executed("SELECT count(*)").is_empty());
    assert_eq!(
        executor.executed("ALTER TABLE"),
        vec!["ALTER TABLE t MODIFY COLUMN v VARCHAR(20);"]
    );
}

#[tokio::test]
async fn narrowing_with_long_values_is_refused() {
    let executor = MockExecutor::new()
        .table("t", NAME_20)
        .on_prefix("SELECT count(*) FROM t", vec![row(&["3"])]);
    let mut result = reconcile(&executor, "CREATE TABLE t (name VARCHAR(5));").await;

    let report = Applier::new(&executor).apply(&mut result).await;
    assert_eq!(report.refused, 1);
    assert_eq!(report.executed, 0);
    assert!(executor.executed("ALTER TABLE").is_empty());

    let statement = result.statements().next().unwrap();
    assert_eq!(statement.state, GuardState::Unsafe);
    assert_eq!(
        statement.warning.as_deref(),
        Some("3 row(s) would be affected by: ALTER TABLE t MODIFY COLUMN name VARCHAR(5);")
    );
}

#[tokio::test]
async fn narrowing_without_long_values_runs() {
    let executor = MockExecutor::new()
        .table("t", NAME_20)
        .on_prefix("SELECT count(*) FROM t", vec![row(&["0"])]);
    let mut result = reconcile(&executor, "CREATE TABLE t (name VARCHAR(5));").await;

    let report = Applier::new(&executor).apply(&mut result).await;
    assert_eq!(report.executed, 1);
    assert_eq!(executor.executed("SELECT count(*)").len(), 1);
    assert_eq!(executor.executed("ALTER TABLE").len(), 1);
}

#[tokio::test]
async fn force_skips_guards() {
    let executor = MockExecutor::new()
        .table("t", NAME_20)
        .on_prefix("SELECT count(*) FROM t", vec![row(&["3"])]);
    let mut result = reconcile(&executor, "CREATE TABLE t (name VARCHAR(5));").await;

    let report = Applier::new(&executor).force(true).apply(&mut result).await;
    assert_eq!(report.executed, 1);
    assert!(executor.executed("SELECT count(*)").is_empty());
    assert_eq!(executor.executed("ALTER TABLE").len(), 1);
}

#[tokio::test]
async fn dry_run_resolves_guards_but_executes_nothing() {
    let executor = MockExecutor::new()
        .table("t", NAME_20)
        .on_prefix("SELECT count(*) FROM t", vec![row(&["0"])]);
    let mut result = reconcile(&executor, "CREATE TABLE t (name VARCHAR(5));").await;

    let report = Applier::new(&executor).dry_run(true).apply(&mut result).await;
    assert_eq!(report.executed, 1);
    assert_eq!(
        report.dry_run,
        vec!["ALTER TABLE t MODIFY COLUMN name VARCHAR(5);"]
    );
    assert_eq!(executor.executed("SELECT count(*)").len(), 1);
    assert!(executor.executed("ALTER TABLE").is_empty());
}

#[tokio::test]
async fn force_runs_statements_with_unknown_guards() {
    let executor = MockExecutor::new().table(
        "legacy",
        "CREATE TABLE `legacy` (`id` int DEFAULT NULL) ENGINE=InnoDB",
    );
    let mut result = reconcile(&executor, "").await;
    assert_eq!(
        result.statements().next().map(|s| s.state),
        Some(GuardState::Unknown)
    );

    let report = Applier::new(&executor).force(true).apply(&mut result).await;
    assert_eq!(report.executed, 1);
    assert_eq!(report.refused, 0);
    assert!(executor.executed("SELECT count(*)").is_empty());
    assert_eq!(executor.executed("DROP TABLE"), vec!["DROP TABLE legacy;"]);
}

#[tokio::test]
async fn unanswered_guard_is_refused() {
    let executor = MockExecutor::new().table("t", NAME_20);
    let mut result = reconcile(&executor, "CREATE TABLE t (name VARCHAR(5));").await;

    let report = Applier::new(&executor).apply(&mut result).await;
    assert_eq!(report.refused, 1);
    assert!(executor.executed("ALTER TABLE").is_empty());
}

#[tokio::test]
async fn failure_does_not_stop_later_statements() {
    let executor = MockExecutor::new()
        .failing("CREATE TABLE a", "Table 'a' already exists");
    let mut result = reconcile(&executor, "CREATE TABLE a (id INT); CREATE TABLE b (id INT);").await;

    let report = Applier::new(&executor).apply(&mut result).await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.executed, 1);
    let failed = result.statements().next().unwrap();
    assert!(failed
        .warning
        .as_deref()
        .is_some_and(|w| w.contains("already exists")));
}

#[tokio::test]
async fn dropping_a_populated_table_is_refused() {
    let executor = MockExecutor::new()
        .table("legacy", "CREATE TABLE `legacy` (`id` int DEFAULT NULL) ENGINE=InnoDB")
        .on("SELECT count(*) FROM legacy", vec![row(&["12"])]);
    let mut result = reconcile(&executor, "").await;

    let report = Applier::new(&executor).apply(&mut result).await;
    assert_eq!(report.refused, 1);
    assert!(executor.executed("DROP TABLE").is_empty());
}
