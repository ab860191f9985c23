//! Reconciliation run.
//!
//! [`Reconciler::reconcile`] parses every source, reads the live state it
//! needs, feeds both into the table, permission and user differs, and
//! assembles an ordered [`Reconciliation`]. Problems with single
//! statements (parse errors, collisions, missing users, a missing
//! database) become items of the result; only failures to talk to the
//! server abort the run.
//!
//! [`Applier`] then executes the statements in order, resolving every guard
//! first.

use std::collections::{BTreeMap, BTreeSet};

use oxide_sync_core::ast::{
    quote_identifier, GrantDescription, ParsedStatement, TableDescription, UserDescription,
    UserHost, UserStatementKind,
};
use oxide_sync_core::split_statements;
use oxide_sync_core::types::{CharsetCatalog, RealPolicy};
use oxide_sync_core::{parse_statement_with, ParseOptions};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::diff::{
    ChangeKind, ColumnChange, KeyChange, OptionChange, PermissionChange, PermissionDiff,
    TableDiff, UserChange, UserDiff,
};
use crate::error::{Result, SyncError};
use crate::executor::Executor;
use crate::guard::{GuardState, GuardedStatement, Operation};
use crate::introspect::{Introspector, DATABASE_SOURCE};

/// Named list of statements, such as one schema file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub statements: Vec<String>,
}

impl Source {
    pub fn new(name: impl Into<String>, statements: Vec<String>) -> Self {
        Self {
            name: name.into(),
            statements,
        }
    }

    /// Splits a script into statements.
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, split_statements(text))
    }
}

/// Run-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Meaning of `REAL` in declarations and server output.
    pub real_policy: RealPolicy,
    /// Drop tables that exist only on the server.
    pub drop_tables: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            real_policy: RealPolicy::Double,
            drop_tables: true,
        }
    }
}

impl SyncOptions {
    #[must_use]
    pub fn real_policy(mut self, policy: RealPolicy) -> Self {
        self.real_policy = policy;
        self
    }

    #[must_use]
    pub fn drop_tables(mut self, enabled: bool) -> Self {
        self.drop_tables = enabled;
        self
    }
}

/// Where a table was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TablePresence {
    Intersection,
    FileOnly,
    DatabaseOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorItem {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseItem {
    pub database: String,
    pub sql: Vec<String>,
    pub statements: Vec<GuardedStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserItem {
    pub sql: Vec<String>,
    #[serde(flatten)]
    pub change: UserChange,
}

/// Statements discarded without being executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropItem {
    pub reason: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableItem {
    pub name: String,
    #[serde(rename = "type")]
    pub presence: TablePresence,
    pub sources: Vec<String>,
    pub sql: Vec<String>,
    pub statements: Vec<GuardedStatement>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnChange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<KeyChange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionChange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<PermissionChange>,
}

impl TableItem {
    fn push(&mut self, statement: GuardedStatement) {
        self.sql.push(statement.sql.clone());
        self.statements.push(statement);
    }
}

/// One element of the result list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "item", rename_all = "snake_case")]
pub enum ResultItem {
    Error(ErrorItem),
    CreateDatabase(DatabaseItem),
    CreateUser(UserItem),
    AlterUser(UserItem),
    DropUser(UserItem),
    Drop(DropItem),
    Table(TableItem),
}

impl ResultItem {
    fn error(error: &SyncError, source: Option<&str>) -> Self {
        Self::Error(ErrorItem {
            message: error.to_string(),
            source: source.map(str::to_string),
        })
    }

    /// Statements carried by the item, in execution order.
    pub fn statements(&self) -> &[GuardedStatement] {
        match self {
            Self::CreateDatabase(item) => &item.statements,
            Self::CreateUser(item) | Self::AlterUser(item) | Self::DropUser(item) => {
                &item.change.statements
            }
            Self::Table(item) => &item.statements,
            Self::Error(_) | Self::Drop(_) => &[],
        }
    }

    fn statements_mut(&mut self) -> &mut [GuardedStatement] {
        match self {
            Self::CreateDatabase(item) => &mut item.statements,
            Self::CreateUser(item) | Self::AlterUser(item) | Self::DropUser(item) => {
                &mut item.change.statements
            }
            Self::Table(item) => &mut item.statements,
            Self::Error(_) | Self::Drop(_) => &mut [],
        }
    }
}

/// Outcome of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Reconciliation {
    pub items: Vec<ResultItem>,
    /// Declared statements that were discarded.
    pub skipped: usize,
    /// Statements the synchronizer does not interpret, kept verbatim.
    pub passthrough: Vec<String>,
}

impl Reconciliation {
    /// Every statement, in execution order.
    pub fn statements(&self) -> impl Iterator<Item = &GuardedStatement> {
        self.items.iter().flat_map(ResultItem::statements)
    }

    /// Returns true if nothing would be executed.
    pub fn is_empty(&self) -> bool {
        self.statements().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorItem> {
        self.items.iter().filter_map(|item| match item {
            ResultItem::Error(error) => Some(error),
            _ => None,
        })
    }
}

struct DeclaredTable {
    table: TableDescription,
    sources: Vec<String>,
}

/// Everything read from the sources, before the server is consulted.
#[derive(Default)]
struct Declarations {
    tables: BTreeMap<String, DeclaredTable>,
    collided: BTreeSet<String>,
    grants: Vec<(GrantDescription, String)>,
    users: UserDiff,
    passthrough: Vec<String>,
    errors: Vec<ResultItem>,
    drops: BTreeMap<String, usize>,
}

impl Declarations {
    fn discard(&mut self, reason: &str, count: usize) {
        if count > 0 {
            *self.drops.entry(reason.to_string()).or_default() += count;
        }
    }

    fn skipped(&self) -> usize {
        self.drops.values().sum()
    }
}

#[derive(Default)]
struct UserItems {
    created: Vec<UserItem>,
    altered: Vec<UserItem>,
    dropped: Vec<UserItem>,
}

/// Computes the statements that bring a database in line with its sources.
pub struct Reconciler<'e, E> {
    executor: &'e E,
    database: String,
    options: SyncOptions,
}

impl<'e, E: Executor> Reconciler<'e, E> {
    pub fn new(executor: &'e E, database: impl Into<String>) -> Self {
        Self {
            executor,
            database: database.into(),
            options: SyncOptions::default(),
        }
    }

    #[must_use]
    pub fn options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            real_policy: self.options.real_policy,
        }
    }

    /// Runs the reconciliation. Nothing is executed.
    pub async fn reconcile(&self, sources: &[Source]) -> Result<Reconciliation> {
        info!(database = %self.database, sources = sources.len(), "Reconciling");
        let mut declared = self.collect(sources);
        let introspector = Introspector::new(self.executor, &self.database, self.parse_options());

        let mut create_database = None;
        let catalog = if introspector.database_exists().await? {
            introspector.charsets().await?
        } else {
            warn!(database = %self.database, "Target database does not exist");
            declared
                .errors
                .push(ResultItem::error(&SyncError::DatabaseMissing(self.database.clone()), None));
            let sql = format!("CREATE DATABASE {};", quote_identifier(&self.database));
            create_database = Some(DatabaseItem {
                database: self.database.clone(),
                sql: vec![sql.clone()],
                statements: vec![GuardedStatement::safe(
                    Operation::CreateDatabase,
                    self.database.clone(),
                    sql,
                )],
            });
            let pending = declared.tables.len() + declared.grants.len();
            declared.discard("target database does not exist", pending);
            declared.tables.clear();
            declared.grants.clear();
            CharsetCatalog::new()
        };
        let database_exists = create_database.is_none();

        let (users, live_accounts) = self.reconcile_users(&introspector, &mut declared).await?;
        let permissions = self
            .reconcile_permissions(&introspector, &mut declared, &live_accounts)
            .await?;
        let tables = if database_exists {
            self.reconcile_tables(&introspector, &mut declared, catalog, permissions)
                .await?
        } else {
            Vec::new()
        };

        let mut items = std::mem::take(&mut declared.errors);
        items.extend(create_database.map(ResultItem::CreateDatabase));
        items.extend(users.created.into_iter().map(ResultItem::CreateUser));
        items.extend(users.altered.into_iter().map(ResultItem::AlterUser));
        items.extend(tables.into_iter().map(ResultItem::Table));
        items.extend(users.dropped.into_iter().map(ResultItem::DropUser));
        let skipped = declared.skipped();
        items.extend(declared.drops.iter().map(|(reason, count)| {
            ResultItem::Drop(DropItem {
                reason: reason.clone(),
                count: *count,
            })
        }));

        let reconciliation = Reconciliation {
            items,
            skipped,
            passthrough: declared.passthrough,
        };
        info!(
            database = %self.database,
            statements = reconciliation.statements().count(),
            skipped,
            "Reconciliation complete"
        );
        Ok(reconciliation)
    }

    /// Parses every source and sorts the statements by kind.
    fn collect(&self, sources: &[Source]) -> Declarations {
        let mut declared = Declarations::default();
        for source in sources {
            for text in &source.statements {
                let statement = parse_statement_with(text, self.parse_options());
                match statement.parsed {
                    ParsedStatement::Table(table) => self.declare_table(&mut declared, table, &source.name),
                    ParsedStatement::Grant(grants) | ParsedStatement::Revoke(grants) => {
                        for grant in grants {
                            let grant = grant.in_database(&self.database);
                            if grant.database.as_deref() == Some(self.database.as_str()) {
                                declared.grants.push((grant, source.name.clone()));
                            } else {
                                debug!(grant = %grant, "Grant outside the target database");
                                declared.discard("grant outside the target database", 1);
                            }
                        }
                    }
                    ParsedStatement::User(users) => {
                        let text = (users.len() == 1).then_some(text.as_str());
                        for user in &users {
                            declared.users.add_declared(user, text);
                        }
                    }
                    ParsedStatement::Insert | ParsedStatement::Unknown => {
                        declared.passthrough.push(text.clone());
                    }
                    ParsedStatement::Invalid { error, .. } => {
                        warn!(source = %source.name, error = %error, "Unparsable statement");
                        let error = SyncError::Parse {
                            source_name: source.name.clone(),
                            error,
                        };
                        declared.errors.push(ResultItem::error(&error, Some(&source.name)));
                        declared.discard("statement does not parse", 1);
                    }
                }
            }
        }
        declared
    }

    fn declare_table(&self, declared: &mut Declarations, table: TableDescription, source: &str) {
        if let Some(database) = &table.name.database {
            if !database.eq_ignore_ascii_case(&self.database) {
                declared.discard("table outside the target database", 1);
                return;
            }
        }
        if table.temporary {
            declared.discard("temporary table", 1);
            return;
        }
        let key = table.name.name.to_ascii_lowercase();
        if declared.collided.contains(&key) {
            declared.discard("colliding table declarations", 1);
            return;
        }
        let Some(existing) = declared.tables.get_mut(&key) else {
            declared.tables.insert(
                key,
                DeclaredTable {
                    table,
                    sources: vec![source.to_string()],
                },
            );
            return;
        };
        let mut unqualified = table.clone();
        unqualified.name.database = None;
        let mut previous = existing.table.clone();
        previous.name.database = None;
        if previous == unqualified {
            existing.sources.push(source.to_string());
            return;
        }

        let first = existing.sources.first().cloned().unwrap_or_default();
        let count = existing.sources.len() + 1;
        warn!(table = %table.name.name, first = %first, second = %source, "Table declared twice");
        let error = SyncError::Collision {
            object: format!("table {}", table.name.name),
            first,
            second: source.to_string(),
        };
        declared.errors.push(ResultItem::error(&error, Some(source)));
        declared.tables.remove(&key);
        declared.collided.insert(key);
        declared.discard("colliding table declarations", count);
    }

    async fn reconcile_users(
        &self,
        introspector: &Introspector<'_, E>,
        declared: &mut Declarations,
    ) -> Result<(UserItems, BTreeSet<UserHost>)> {
        let declared_names: BTreeSet<String> = declared
            .users
            .declared_accounts()
            .map(|account| account.user.clone())
            .collect();
        let names: BTreeSet<String> = declared_names
            .iter()
            .cloned()
            .chain(declared.grants.iter().map(|(grant, _)| grant.user.user.clone()))
            .collect();
        let live_accounts = introspector.accounts(&names).await?;

        for account in live_accounts.iter().filter(|a| declared_names.contains(&a.user)) {
            let live = match introspector.user(account).await {
                Ok(Some(user)) => user,
                Ok(None) => UserDescription::new(UserStatementKind::Create, account.clone()),
                Err(error @ SyncError::Parse { .. }) => {
                    declared.errors.push(ResultItem::error(&error, Some(DATABASE_SOURCE)));
                    UserDescription::new(UserStatementKind::Create, account.clone())
                }
                Err(error) => return Err(error),
            };
            declared.users.add_live(live);
        }

        for account in declared.users.missing() {
            warn!(user = %account, "Altered user does not exist");
            declared
                .errors
                .push(ResultItem::error(&SyncError::MissingUser(account.to_string()), None));
            declared.discard("user does not exist", 1);
        }

        let mut items = UserItems::default();
        for change in declared.users.changes() {
            let item = UserItem {
                sql: change.statements.iter().map(|s| s.sql.clone()).collect(),
                change,
            };
            match item.change.kind {
                ChangeKind::Add => items.created.push(item),
                ChangeKind::Drop => items.dropped.push(item),
                _ => items.altered.push(item),
            }
        }
        Ok((items, live_accounts))
    }

    async fn reconcile_permissions(
        &self,
        introspector: &Introspector<'_, E>,
        declared: &mut Declarations,
        live_accounts: &BTreeSet<UserHost>,
    ) -> Result<Vec<PermissionChange>> {
        let mut diff = PermissionDiff::new(&self.database);
        let mut referenced = BTreeSet::new();
        let mut missing = BTreeSet::new();
        let grants = std::mem::take(&mut declared.grants);
        for (grant, source) in &grants {
            if live_accounts.contains(&grant.user) || declared.users.is_created(&grant.user) {
                diff.add_declared(grant);
                if live_accounts.contains(&grant.user) {
                    referenced.insert(grant.user.clone());
                }
            } else {
                if missing.insert(grant.user.clone()) {
                    warn!(user = %grant.user, source = %source, "Grant for a user that does not exist");
                    declared.errors.push(ResultItem::error(
                        &SyncError::MissingUser(grant.user.to_string()),
                        Some(source),
                    ));
                }
                declared.discard("user does not exist", 1);
            }
        }
        let live = introspector.grants(&referenced).await?;
        for grant in &live.grants {
            diff.add_live(grant);
        }
        for error in &live.unreadable {
            declared.errors.push(ResultItem::error(error, Some(DATABASE_SOURCE)));
            declared.discard("live grant does not parse", 1);
        }
        Ok(diff.changes())
    }

    async fn reconcile_tables(
        &self,
        introspector: &Introspector<'_, E>,
        declared: &mut Declarations,
        catalog: CharsetCatalog,
        permissions: Vec<PermissionChange>,
    ) -> Result<Vec<TableItem>> {
        let live_names: BTreeSet<String> = introspector
            .tables()
            .await?
            .keys()
            .filter(|name| !declared.collided.contains(*name))
            .cloned()
            .collect();
        let mut permissions_by_table: BTreeMap<String, Vec<PermissionChange>> = BTreeMap::new();
        for change in permissions {
            permissions_by_table
                .entry(change.table.to_ascii_lowercase())
                .or_default()
                .push(change);
        }
        let names: BTreeSet<String> = declared
            .tables
            .keys()
            .chain(live_names.iter())
            .chain(permissions_by_table.keys())
            .cloned()
            .collect();

        let mut items = Vec::new();
        for name in names {
            let file = declared.tables.remove(&name);
            let live = if live_names.contains(&name) {
                match introspector.table(&name).await {
                    Ok(table) => table,
                    Err(error @ SyncError::Parse { .. }) => {
                        warn!(table = %name, "Unreadable live table definition");
                        declared.errors.push(ResultItem::error(&error, Some(DATABASE_SOURCE)));
                        declared.discard("live table definition does not parse", 1);
                        continue;
                    }
                    Err(error) => return Err(error),
                }
            } else {
                None
            };

            let presence = match (&file, &live) {
                (Some(_), None) => TablePresence::FileOnly,
                (None, Some(_)) => TablePresence::DatabaseOnly,
                _ => TablePresence::Intersection,
            };
            let mut sources = file.as_ref().map(|f| f.sources.clone()).unwrap_or_default();
            if live.is_some() {
                sources.push(DATABASE_SOURCE.to_string());
            }
            let mut item = TableItem {
                name: live
                    .as_ref()
                    .map(|t| t.name.name.clone())
                    .or_else(|| file.as_ref().map(|f| f.table.name.name.clone()))
                    .unwrap_or_else(|| name.clone()),
                presence,
                sources,
                sql: Vec::new(),
                statements: Vec::new(),
                columns: Vec::new(),
                keys: Vec::new(),
                options: Vec::new(),
                permissions: Vec::new(),
            };

            let drop_allowed = file.is_some() || self.options.drop_tables;
            if (file.is_some() || live.is_some()) && drop_allowed {
                let diff = TableDiff::new(file.map(|f| f.table), live, catalog.clone());
                debug!(table = %item.name, kind = ?diff.kind(), "Compared table");
                item.columns = diff.columns().to_vec();
                item.keys = diff.keys().to_vec();
                item.options = diff.options().to_vec();
                for statement in diff.statements() {
                    item.push(statement);
                }
            }
            for change in permissions_by_table.remove(&name).unwrap_or_default() {
                for statement in &change.statements {
                    item.push(statement.clone());
                }
                item.permissions.push(change);
            }
            if !item.statements.is_empty() {
                items.push(item);
            }
        }
        Ok(items)
    }
}

/// Counts of what [`Applier::apply`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub executed: usize,
    /// Statements whose guard did not resolve to safe.
    pub refused: usize,
    /// Statements the server rejected.
    pub failed: usize,
    /// In a dry run, the SQL that would have been executed.
    pub dry_run: Vec<String>,
}

/// Executes the statements of a [`Reconciliation`].
pub struct Applier<'e, E> {
    executor: &'e E,
    force: bool,
    dry_run: bool,
}

impl<'e, E: Executor> Applier<'e, E> {
    pub fn new(executor: &'e E) -> Self {
        Self {
            executor,
            force: false,
            dry_run: false,
        }
    }

    /// Skips guards entirely.
    #[must_use]
    pub fn force(mut self, enabled: bool) -> Self {
        self.force = enabled;
        self
    }

    /// Collects statements in the report instead of executing them.
    /// Guards still run.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Executes every statement in order.
    ///
    /// A refused or failed statement does not stop the ones after it.
    pub async fn apply(&self, reconciliation: &mut Reconciliation) -> ApplyReport {
        let mut report = ApplyReport::default();
        for item in &mut reconciliation.items {
            for statement in item.statements_mut() {
                if !self.force && statement.resolve(self.executor).await != GuardState::Safe {
                    report.refused += 1;
                    continue;
                }
                if self.dry_run {
                    debug!(sql = %statement.sql, "Dry run");
                    report.dry_run.push(statement.sql.clone());
                    report.executed += 1;
                    continue;
                }
                match self.executor.execute(&statement.sql).await {
                    Ok(_) => report.executed += 1,
                    Err(error) => {
                        warn!(sql = %statement.sql, error = %error, "Statement failed");
                        statement.warning = Some(error.to_string());
                        report.failed += 1;
                    }
                }
            }
        }
        info!(
            executed = report.executed,
            refused = report.refused,
            failed = report.failed,
            "Apply complete"
        );
        report
    }
}
