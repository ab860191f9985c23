#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use oxide_sync::error::{Result, SyncError};
use oxide_sync::executor::{Executor, Row};
use oxide_sync::orchestrator::{Reconciler, Reconciliation, Source};

pub const DATABASE: &str = "shop";

/// Executor answering from a script and recording every query it sees.
///
/// Queries are matched exactly first, then by prefix. Anything unscripted
/// returns no rows.
#[derive(Default)]
pub struct MockExecutor {
    exact: BTreeMap<String, Vec<Row>>,
    prefixes: Vec<(String, Vec<Row>)>,
    failing: Vec<(String, String)>,
    tables: Vec<String>,
    accounts: Vec<(String, String)>,
    grantees: Vec<String>,
    queries: Mutex<Vec<String>>,
}

pub fn row(values: &[&str]) -> Row {
    values.iter().map(|v| Some((*v).to_string())).collect()
}

impl MockExecutor {
    /// A server where the target database exists and is empty.
    pub fn new() -> Self {
        Self::without_database().on(
            &format!("SHOW DATABASES LIKE '{DATABASE}'"),
            vec![row(&[DATABASE])],
        )
    }

    pub fn without_database() -> Self {
        Self::default()
    }

    pub fn on(mut self, sql: &str, rows: Vec<Row>) -> Self {
        self.exact.insert(sql.to_string(), rows);
        self
    }

    pub fn on_prefix(mut self, prefix: &str, rows: Vec<Row>) -> Self {
        self.prefixes.push((prefix.to_string(), rows));
        self
    }

    /// Makes the server reject statements starting with `prefix`.
    pub fn failing(mut self, prefix: &str, message: &str) -> Self {
        self.failing.push((prefix.to_string(), message.to_string()));
        self
    }

    /// Adds a live table, given as `SHOW CREATE TABLE` would print it.
    pub fn table(mut self, name: &str, create: &str) -> Self {
        self.tables.push(name.to_string());
        let list = self.tables.iter().map(|t| row(&[t.as_str()])).collect();
        self.on(&format!("SHOW TABLES FROM {DATABASE}"), list).on(
            &format!("SHOW CREATE TABLE {DATABASE}.{name}"),
            vec![row(&[name, create])],
        )
    }

    /// Adds a live account and its `SHOW CREATE USER` output.
    pub fn user(mut self, user: &str, host: &str, create: &str) -> Self {
        self.accounts.push((user.to_string(), host.to_string()));
        self.on(
            &format!("SHOW CREATE USER '{user}'@'{host}'"),
            vec![row(&[create])],
        )
    }

    /// Adds a live grantee and its `SHOW GRANTS FOR` output.
    pub fn grants(mut self, user: &str, host: &str, lines: &[&str]) -> Self {
        self.grantees.push(format!("'{user}'@'{host}'"));
        self.on(
            &format!("SHOW GRANTS FOR '{user}'@'{host}'"),
            lines.iter().map(|line| row(&[*line])).collect(),
        )
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn executed(&self, prefix: &str) -> Vec<String> {
        self.queries()
            .into_iter()
            .filter(|q| q.starts_with(prefix))
            .collect()
    }
}

impl Executor for MockExecutor {
    async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        self.queries.lock().unwrap().push(sql.to_string());
        if let Some((_, message)) = self.failing.iter().find(|(p, _)| sql.starts_with(p)) {
            return Err(SyncError::Execution {
                sql: sql.to_string(),
                message: message.clone(),
            });
        }
        if let Some(rows) = self.exact.get(sql) {
            return Ok(rows.clone());
        }
        if sql.starts_with("SELECT User, Host FROM mysql.user") {
            return Ok(self
                .accounts
                .iter()
                .filter(|(user, _)| sql.contains(&format!("'{user}'")))
                .map(|(user, host)| row(&[user.as_str(), host.as_str()]))
                .collect());
        }
        if sql.starts_with("SELECT GRANTEE FROM information_schema") {
            return Ok(self.grantees.iter().map(|g| row(&[g.as_str()])).collect());
        }
        Ok(self
            .prefixes
            .iter()
            .rev()
            .find(|(prefix, _)| sql.starts_with(prefix))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

pub fn source(text: &str) -> Source {
    Source::from_text("schema.sql", text)
}

pub async fn reconcile(executor: &MockExecutor, text: &str) -> Reconciliation {
    Reconciler::new(executor, DATABASE)
        .reconcile(&[source(text)])
        .await
        .unwrap()
}

pub fn sql(reconciliation: &Reconciliation) -> Vec<String> {
    reconciliation.statements().map(|s| s.sql.clone()).collect()
}
