//! Account differ.
//!
//! The user names that appear in declared `CREATE USER` statements are
//! managed: every live host of such a name that is not declared is
//! dropped. Accounts present on both sides are compared on their `REQUIRE`
//! clause only.

use std::collections::{BTreeMap, BTreeSet};

use oxide_sync_core::ast::{TlsRequirement, UserDescription, UserHost, UserStatementKind};
use serde::Serialize;

use super::{Change, ChangeKind};
use crate::guard::{GuardedStatement, Operation};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserChange {
    pub user: UserHost,
    pub kind: ChangeKind,
    /// TLS requirement on each side.
    #[serde(flatten)]
    pub change: Change<TlsRequirement>,
    pub statements: Vec<GuardedStatement>,
}

#[derive(Debug, Default)]
struct Declared {
    /// Declaring `CREATE USER`, with its text when it names only this account.
    create: Option<(UserDescription, Option<String>)>,
    /// Last `REQUIRE` clause of a declared `ALTER USER`.
    altered: Option<TlsRequirement>,
}

impl Declared {
    fn desired_tls(&self) -> Option<TlsRequirement> {
        self.altered.clone().or_else(|| {
            self.create
                .as_ref()
                .map(|(create, _)| create.effective_tls())
        })
    }
}

#[derive(Debug, Default)]
pub struct UserDiff {
    declared: BTreeMap<UserHost, Declared>,
    live: BTreeMap<UserHost, UserDescription>,
}

impl UserDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declared `CREATE USER` or `ALTER USER`.
    ///
    /// `text` is the original statement when it names only this account;
    /// it is replayed verbatim so that credentials survive.
    pub fn add_declared(&mut self, user: &UserDescription, text: Option<&str>) {
        let declared = self.declared.entry(user.user.clone()).or_default();
        match user.kind {
            UserStatementKind::Create => {
                declared.create = Some((user.clone(), text.map(str::to_string)));
            }
            UserStatementKind::Alter => {
                if let Some(tls) = &user.tls {
                    declared.altered = Some(tls.clone());
                }
            }
        }
    }

    /// Adds an account read from the server.
    pub fn add_live(&mut self, user: UserDescription) {
        self.live.insert(user.user.clone(), user);
    }

    /// Returns true if the account is declared with `CREATE USER`.
    pub fn is_created(&self, account: &UserHost) -> bool {
        self.declared
            .get(account)
            .is_some_and(|declared| declared.create.is_some())
    }

    /// User names under management.
    pub fn managed_names(&self) -> BTreeSet<String> {
        self.declared
            .iter()
            .filter(|(_, declared)| declared.create.is_some())
            .map(|(account, _)| account.user.clone())
            .collect()
    }

    /// Every account the sources mention.
    pub fn declared_accounts(&self) -> impl Iterator<Item = &UserHost> {
        self.declared.keys()
    }

    /// Accounts altered but neither declared with `CREATE USER` nor live.
    pub fn missing(&self) -> Vec<UserHost> {
        self.declared
            .iter()
            .filter(|(account, declared)| {
                declared.create.is_none() && !self.live.contains_key(*account)
            })
            .map(|(account, _)| account.clone())
            .collect()
    }

    /// Accounts to create, alter or drop.
    pub fn changes(&self) -> Vec<UserChange> {
        let managed = self.managed_names();
        let mut changes = Vec::new();

        for (account, declared) in &self.declared {
            let desired = declared.desired_tls();
            match (self.live.get(account), &declared.create) {
                (None, Some((create, text))) => {
                    let sql = text
                        .as_deref()
                        .map(|t| format!("{};", t.trim().trim_end_matches(';')))
                        .unwrap_or_else(|| format!("{create};"));
                    let mut statements = vec![GuardedStatement::safe(
                        Operation::CreateUser,
                        account.key(),
                        sql,
                    )];
                    if let Some(tls) = desired.as_ref().filter(|tls| **tls != create.effective_tls()) {
                        statements.push(alter(account, tls));
                    }
                    changes.push(UserChange {
                        user: account.clone(),
                        kind: ChangeKind::Add,
                        change: Change::new(None, desired),
                        statements,
                    });
                }
                (Some(live), _) => {
                    let current = live.effective_tls();
                    if let Some(tls) = desired.filter(|tls| *tls != current) {
                        changes.push(UserChange {
                            user: account.clone(),
                            kind: ChangeKind::Modify,
                            statements: vec![alter(account, &tls)],
                            change: Change::new(Some(current), Some(tls)),
                        });
                    }
                }
                (None, None) => {}
            }
        }

        for (account, live) in &self.live {
            if managed.contains(&account.user) && !self.is_created(account) {
                changes.push(UserChange {
                    user: account.clone(),
                    kind: ChangeKind::Drop,
                    change: Change::new(Some(live.effective_tls()), None),
                    statements: vec![GuardedStatement::safe(
                        Operation::DropUser,
                        account.key(),
                        format!("DROP USER {account};"),
                    )],
                });
            }
        }
        changes
    }
}

fn alter(account: &UserHost, tls: &TlsRequirement) -> GuardedStatement {
    GuardedStatement::safe(
        Operation::AlterUser,
        account.key(),
        format!("ALTER USER {account} REQUIRE {tls};"),
    )
}

#[cfg(test)]
mod tests {
    use oxide_sync_core::ast::ParsedStatement;
    use oxide_sync_core::parse_statement;

    use super::*;

    fn users(sql: &str) -> Vec<UserDescription> {
        match parse_statement(sql).parsed {
            ParsedStatement::User(users) => users,
            other => panic!("{sql}: {other:?}"),
        }
    }

    fn declare(diff: &mut UserDiff, sql: &str) {
        let parsed = users(sql);
        let text = (parsed.len() == 1).then_some(sql);
        for user in &parsed {
            diff.add_declared(user, text);
        }
    }

    fn sql(changes: &[UserChange]) -> Vec<String> {
        changes
            .iter()
            .flat_map(|c| c.statements.iter().map(|s| s.sql.clone()))
            .collect()
    }

    #[test]
    fn absent_account_is_created_verbatim() {
        let mut diff = UserDiff::new();
        declare(&mut diff, "CREATE USER 'app'@'%' IDENTIFIED BY 'secret'");
        let changes = diff.changes();
        assert_eq!(changes[0].kind, ChangeKind::Add);
        assert_eq!(
            sql(&changes),
            vec!["CREATE USER 'app'@'%' IDENTIFIED BY 'secret';"]
        );
    }

    #[test]
    fn tls_order_does_not_matter() {
        let mut diff = UserDiff::new();
        declare(
            &mut diff,
            "CREATE USER 'app'@'%' REQUIRE ISSUER '/CN=ca' AND SUBJECT '/CN=app'",
        );
        for user in users("CREATE USER `app`@`%` REQUIRE SUBJECT '/CN=app' ISSUER '/CN=ca'") {
            diff.add_live(user);
        }
        assert!(diff.changes().is_empty());
    }

    #[test]
    fn changed_requirement_is_altered() {
        let mut diff = UserDiff::new();
        declare(&mut diff, "CREATE USER 'app'@'%' REQUIRE SSL");
        for user in users("CREATE USER 'app'@'%' REQUIRE NONE") {
            diff.add_live(user);
        }
        assert_eq!(
            sql(&diff.changes()),
            vec!["ALTER USER 'app'@'%' REQUIRE SSL;"]
        );
    }

    #[test]
    fn undeclared_host_is_dropped() {
        let mut diff = UserDiff::new();
        declare(&mut diff, "CREATE USER 'app'@'10.0.%'");
        for statement in [
            "CREATE USER 'app'@'10.0.%'",
            "CREATE USER 'app'@'%'",
            "CREATE USER 'root'@'%'",
        ] {
            for user in users(statement) {
                diff.add_live(user);
            }
        }
        assert_eq!(sql(&diff.changes()), vec!["DROP USER 'app'@'%';"]);
    }

    #[test]
    fn alter_without_account_is_missing() {
        let mut diff = UserDiff::new();
        declare(&mut diff, "ALTER USER 'ghost'@'%' REQUIRE SSL");
        assert_eq!(diff.missing(), vec![UserHost::new("ghost", "%")]);
        assert!(diff.changes().is_empty());
    }
}
