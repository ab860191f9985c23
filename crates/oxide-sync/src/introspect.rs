//! Reading the live state of the server.
//!
//! Every query runs through the injected [`Executor`]; the statements the
//! server hands back (`SHOW CREATE TABLE`, `SHOW GRANTS`, `SHOW CREATE
//! USER`) go through the same parser as the source files.

use std::collections::{BTreeMap, BTreeSet};

use oxide_sync_core::ast::{
    quote_identifier, GrantDescription, ParsedStatement, TableDescription,
    UserDescription, UserHost,
};
use oxide_sync_core::types::CharsetCatalog;
use oxide_sync_core::{parse_statement_with, ParseOptions};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::executor::{Executor, Row};

/// Source name attached to descriptors read from the server.
pub const DATABASE_SOURCE: &str = "database";

/// Grants read with `SHOW GRANTS`.
#[derive(Debug, Default)]
pub struct LiveGrants {
    pub grants: Vec<GrantDescription>,
    /// Lines the parser rejected; they take no part in the diff.
    pub unreadable: Vec<SyncError>,
}

/// Live-state reader for one target database.
///
/// The table list is read once per instance; two introspectors never share
/// anything.
pub struct Introspector<'e, E> {
    executor: &'e E,
    database: String,
    options: ParseOptions,
    tables: OnceCell<BTreeMap<String, String>>,
}

impl<'e, E: Executor> Introspector<'e, E> {
    pub fn new(executor: &'e E, database: impl Into<String>, options: ParseOptions) -> Self {
        Self {
            executor,
            database: database.into(),
            options,
            tables: OnceCell::new(),
        }
    }

    /// The database this introspector reads.
    pub fn database(&self) -> &str {
        &self.database
    }

    fn literal(&self, value: &str) -> String {
        format!("'{}'", self.executor.escape(value))
    }

    fn account(&self, user: &UserHost) -> String {
        format!("{}@{}", self.literal(&user.user), self.literal(&user.host))
    }

    /// Returns true if the target database exists.
    pub async fn database_exists(&self) -> Result<bool> {
        let pattern = self
            .database
            .replace('\\', "\\\\")
            .replace('_', "\\_")
            .replace('%', "\\%");
        let rows = self
            .executor
            .execute(&format!("SHOW DATABASES LIKE {}", self.literal(&pattern)))
            .await?;
        Ok(rows
            .iter()
            .any(|row| first_text(row).is_some_and(|name| name == self.database)))
    }

    /// Charsets the server knows, layered over the built-in table.
    pub async fn charsets(&self) -> Result<CharsetCatalog> {
        let rows = self.executor.execute("SHOW CHARACTER SET").await?;
        let reported: Vec<(String, String, u32)> = rows
            .iter()
            .filter_map(|row| {
                let name = row.first()?.clone()?;
                let collation = row.get(2)?.clone()?;
                let max_len = row.get(3)?.as_deref()?.parse().ok()?;
                Some((name, collation, max_len))
            })
            .collect();
        Ok(CharsetCatalog::from_reported(reported))
    }

    /// Tables in the target database, keyed by lowercase name.
    pub async fn tables(&self) -> Result<&BTreeMap<String, String>> {
        self.tables
            .get_or_try_init(|| async {
                let sql = format!("SHOW TABLES FROM {}", quote_identifier(&self.database));
                let rows = self.executor.execute(&sql).await?;
                let tables: BTreeMap<String, String> = rows
                    .iter()
                    .filter_map(first_text)
                    .map(|name| (name.to_ascii_lowercase(), name.to_string()))
                    .collect();
                debug!(database = %self.database, count = tables.len(), "Read table list");
                Ok::<_, SyncError>(tables)
            })
            .await
    }

    /// Definition of an existing table, `None` if the table is absent.
    pub async fn table(&self, name: &str) -> Result<Option<TableDescription>> {
        let Some(actual) = self.tables().await?.get(&name.to_ascii_lowercase()) else {
            return Ok(None);
        };
        let sql = format!(
            "SHOW CREATE TABLE {}.{}",
            quote_identifier(&self.database),
            quote_identifier(actual)
        );
        let rows = self.executor.execute(&sql).await?;
        let Some(text) = rows.first().and_then(|row| row.get(1)).and_then(Clone::clone) else {
            return Ok(None);
        };
        match parse_statement_with(&text, self.options).parsed {
            ParsedStatement::Table(table) => Ok(Some(table)),
            ParsedStatement::Invalid { error, .. } => Err(SyncError::Parse {
                source_name: DATABASE_SOURCE.to_string(),
                error,
            }),
            _ => Ok(None),
        }
    }

    /// Accounts that exist for any of the given user names.
    pub async fn accounts(&self, names: &BTreeSet<String>) -> Result<BTreeSet<UserHost>> {
        if names.is_empty() {
            return Ok(BTreeSet::new());
        }
        let list: Vec<String> = names.iter().map(|name| self.literal(name)).collect();
        let sql = format!(
            "SELECT User, Host FROM mysql.user WHERE User IN ({})",
            list.join(", ")
        );
        let rows = self.executor.execute(&sql).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let user = row.first()?.clone()?;
                let host = row.get(1)?.clone()?;
                Some(UserHost::new(user, host))
            })
            .collect())
    }

    /// `CREATE USER` form of an existing account.
    pub async fn user(&self, account: &UserHost) -> Result<Option<UserDescription>> {
        let sql = format!("SHOW CREATE USER {}", self.account(account));
        let rows = self.executor.execute(&sql).await?;
        let Some(text) = rows.first().and_then(first_text) else {
            return Ok(None);
        };
        match parse_statement_with(text, self.options).parsed {
            ParsedStatement::User(mut users) if !users.is_empty() => Ok(Some(users.remove(0))),
            ParsedStatement::Invalid { error, .. } => Err(SyncError::Parse {
                source_name: DATABASE_SOURCE.to_string(),
                error,
            }),
            _ => Ok(None),
        }
    }

    /// Grants held on the target database by the given accounts.
    ///
    /// Accounts without any privilege on the database are not asked for
    /// their grants. `USAGE` carries nothing and is dropped.
    pub async fn grants(&self, accounts: &BTreeSet<UserHost>) -> Result<LiveGrants> {
        let mut live = LiveGrants::default();
        if accounts.is_empty() {
            return Ok(live);
        }
        let schema = self.literal(&self.database);
        let sql = format!(
            "SELECT GRANTEE FROM information_schema.schema_privileges WHERE TABLE_SCHEMA = {schema} \
             UNION SELECT GRANTEE FROM information_schema.table_privileges WHERE TABLE_SCHEMA = {schema} \
             UNION SELECT GRANTEE FROM information_schema.column_privileges WHERE TABLE_SCHEMA = {schema}"
        );
        let grantees: BTreeSet<UserHost> = self
            .executor
            .execute(&sql)
            .await?
            .iter()
            .filter_map(first_text)
            .filter_map(parse_grantee)
            .collect();

        for account in accounts.iter().filter(|a| grantees.contains(*a)) {
            let sql = format!("SHOW GRANTS FOR {}", self.account(account));
            for row in self.executor.execute(&sql).await? {
                let Some(line) = first_text(&row) else {
                    continue;
                };
                match parse_statement_with(line, self.options).parsed {
                    ParsedStatement::Grant(parsed) => {
                        live.grants.extend(parsed.into_iter().filter_map(|mut grant| {
                            grant.privileges.remove("USAGE");
                            let on_target = grant.database.as_deref() == Some(self.database.as_str());
                            (on_target && !grant.privileges.is_empty()).then_some(grant)
                        }));
                    }
                    ParsedStatement::Invalid { error, .. } => {
                        warn!(user = %account, error = %error, "Unreadable grant");
                        live.unreadable.push(SyncError::Parse {
                            source_name: DATABASE_SOURCE.to_string(),
                            error,
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(live)
    }
}

fn first_text(row: &Row) -> Option<&str> {
    row.first().and_then(|value| value.as_deref())
}

/// Parses an `information_schema` grantee, `'user'@'host'`.
fn parse_grantee(grantee: &str) -> Option<UserHost> {
    let (user, host) = grantee.rsplit_once('@')?;
    let unquote = |part: &str| {
        part.strip_prefix('\'')
            .and_then(|p| p.strip_suffix('\''))
            .map(|p| p.replace("''", "'"))
    };
    Some(UserHost::new(unquote(user)?, unquote(host)?))
}
