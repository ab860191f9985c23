//! Permission differ.
//!
//! Declared and live grants are accumulated per `(account, table)` of one
//! target database. Database-level grants (`db.*`) form a baseline per
//! account: a table-level entry only counts the privileges its side's
//! baseline does not already give. Each baseline carries a version that
//! moves whenever a database-level grant is merged into it, and a
//! table-level entry recomputes its effective privileges only when the
//! version it last saw is stale.

use std::collections::BTreeMap;

use oxide_sync_core::ast::{
    merge_privilege, GrantDescription, GrantKind, PrivilegeMap, PrivilegeScope, UserHost,
};
use serde::Serialize;

use super::Change;
use crate::guard::{GuardedStatement, Operation};

/// Privilege sets of both sides of one `(account, table)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionChange {
    pub user: UserHost,
    /// `*` for the database as a whole.
    pub table: String,
    /// Effective privileges, after the database-level baseline.
    #[serde(flatten)]
    pub change: Change<PrivilegeMap>,
    /// Statements closing the gap, revocations first.
    pub statements: Vec<GuardedStatement>,
}

#[derive(Debug, Default)]
struct Baseline {
    file: PrivilegeMap,
    database: PrivilegeMap,
    version: u64,
}

#[derive(Debug, Default)]
struct Entry {
    file: PrivilegeMap,
    /// Privileges the sources explicitly revoke.
    revoked: PrivilegeMap,
    database: PrivilegeMap,
    /// Baseline version and effective `(file, database)` maps.
    effective: Option<(u64, PrivilegeMap, PrivilegeMap)>,
}

/// Accumulates grants of both sides and computes the statements between
/// them.
#[derive(Debug)]
pub struct PermissionDiff {
    database: String,
    baselines: BTreeMap<UserHost, Baseline>,
    entries: BTreeMap<(UserHost, String), Entry>,
}

impl PermissionDiff {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            baselines: BTreeMap::new(),
            entries: BTreeMap::new(),
        }
    }

    /// Adds a declared `GRANT` or `REVOKE`.
    ///
    /// Repeated declarations merge; a privilege declared twice with
    /// different column lists keeps the union of both.
    pub fn add_declared(&mut self, grant: &GrantDescription) {
        let entry = self.entry(&grant.user, &grant.table);
        let target = match grant.kind {
            GrantKind::Grant => &mut entry.file,
            GrantKind::Revoke => &mut entry.revoked,
        };
        for (name, scope) in &grant.privileges {
            merge_privilege(target, name, scope.clone());
        }
        if grant.is_database_level() && grant.kind == GrantKind::Grant {
            let baseline = self.baselines.entry(grant.user.clone()).or_default();
            for (name, scope) in &grant.privileges {
                merge_privilege(&mut baseline.file, name, scope.clone());
            }
            baseline.version += 1;
        }
    }

    /// Adds a grant read from the server.
    pub fn add_live(&mut self, grant: &GrantDescription) {
        let entry = self.entry(&grant.user, &grant.table);
        for (name, scope) in &grant.privileges {
            merge_privilege(&mut entry.database, name, scope.clone());
        }
        if grant.is_database_level() {
            let baseline = self.baselines.entry(grant.user.clone()).or_default();
            for (name, scope) in &grant.privileges {
                merge_privilege(&mut baseline.database, name, scope.clone());
            }
            baseline.version += 1;
        }
    }

    fn entry(&mut self, user: &UserHost, table: &str) -> &mut Entry {
        self.entries
            .entry((user.clone(), table.to_string()))
            .or_default()
    }

    /// Per-pair changes, for pairs whose sides differ.
    pub fn changes(&mut self) -> Vec<PermissionChange> {
        let keys: Vec<(UserHost, String)> = self.entries.keys().cloned().collect();
        keys.into_iter()
            .filter_map(|(user, table)| {
                let (file, database) = self.effective(&user, &table)?;
                let statements = self.statements_for(&user, &table, &file, &database);
                if statements.is_empty() {
                    return None;
                }
                Some(PermissionChange {
                    change: Change::new(Some(database), Some(file)),
                    user,
                    table,
                    statements,
                })
            })
            .collect()
    }

    /// Effective privileges of both sides, recomputed when the account's
    /// baseline moved since the last computation.
    fn effective(&mut self, user: &UserHost, table: &str) -> Option<(PrivilegeMap, PrivilegeMap)> {
        let empty = Baseline::default();
        let baseline = self.baselines.get(user).unwrap_or(&empty);
        let entry = self.entries.get_mut(&(user.clone(), table.to_string()))?;
        if let Some((version, file, database)) = &entry.effective {
            if *version == baseline.version {
                return Some((file.clone(), database.clone()));
            }
        }
        // A column-scoped revoke only takes its own columns away.
        let mut file = subtract_map(&entry.file, &entry.revoked);
        let mut database = entry.database.clone();
        if table != "*" {
            file = subtract_map(&file, &baseline.file);
            database = subtract_map(&database, &baseline.database);
        }
        entry.effective = Some((baseline.version, file.clone(), database.clone()));
        Some((file, database))
    }

    fn statements_for(
        &self,
        user: &UserHost,
        table: &str,
        file: &PrivilegeMap,
        database: &PrivilegeMap,
    ) -> Vec<GuardedStatement> {
        let mut revoke = GrantDescription::new(
            GrantKind::Revoke,
            user.clone(),
            Some(self.database.clone()),
            table,
        );
        let mut grant = GrantDescription::new(
            GrantKind::Grant,
            user.clone(),
            Some(self.database.clone()),
            table,
        );

        // Explicit revocations reach whatever the server holds, baseline or not.
        if let Some(entry) = self.entries.get(&(user.clone(), table.to_string())) {
            for (name, scope) in &entry.revoked {
                if let Some(held) = entry.database.get(name).and_then(|held| held.intersect(scope)) {
                    revoke.add(name, held);
                }
            }
        }

        for (name, wanted) in file {
            match database.get(name) {
                None => grant.add(name, wanted.clone()),
                Some(held) => match held.subtract(wanted) {
                    // Whole-object privilege narrowed to columns: revoke it,
                    // then grant the columns afresh.
                    Some(PrivilegeScope::Table) => {
                        revoke.add(name, PrivilegeScope::Table);
                        grant.add(name, wanted.clone());
                    }
                    Some(excess) => {
                        revoke.add(name, excess);
                        if let Some(missing) = wanted.subtract(held) {
                            grant.add(name, missing);
                        }
                    }
                    None => {
                        if let Some(missing) = wanted.subtract(held) {
                            grant.add(name, missing);
                        }
                    }
                },
            }
        }
        for (name, held) in database {
            if !file.contains_key(name) {
                revoke.add(name, held.clone());
            }
        }

        let target = format!("{}@{}.{}", user.key(), self.database, table);
        let mut statements = Vec::new();
        if !revoke.privileges.is_empty() {
            statements.push(GuardedStatement::safe(
                Operation::Revoke,
                target.clone(),
                format!("{revoke};"),
            ));
        }
        if !grant.privileges.is_empty() {
            statements.push(GuardedStatement::safe(
                Operation::Grant,
                target,
                format!("{grant};"),
            ));
        }
        statements
    }
}

/// Privileges of `map` not already reached through `baseline`.
///
/// A privilege is dropped once nothing of it remains.
fn subtract_map(map: &PrivilegeMap, baseline: &PrivilegeMap) -> PrivilegeMap {
    map.iter()
        .filter_map(|(name, scope)| {
            let remaining = match baseline.get(name) {
                Some(base) => scope.subtract(base)?,
                None => scope.clone(),
            };
            Some((name.clone(), remaining))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use oxide_sync_core::ast::ParsedStatement;
    use oxide_sync_core::parse_statement;

    use super::*;

    fn grants(sql: &str) -> Vec<GrantDescription> {
        match parse_statement(sql).parsed {
            ParsedStatement::Grant(grants) | ParsedStatement::Revoke(grants) => grants,
            other => panic!("{sql}: {other:?}"),
        }
    }

    fn sql(changes: &[PermissionChange]) -> Vec<String> {
        changes
            .iter()
            .flat_map(|c| c.statements.iter().map(|s| s.sql.clone()))
            .collect()
    }

    #[test]
    fn missing_privilege_is_granted() {
        let mut diff = PermissionDiff::new("shop");
        for grant in grants("GRANT SELECT, INSERT ON shop.orders TO 'app'@'%'") {
            diff.add_declared(&grant);
        }
        for grant in grants("GRANT SELECT ON shop.orders TO 'app'@'%'") {
            diff.add_live(&grant);
        }
        assert_eq!(
            sql(&diff.changes()),
            vec!["GRANT INSERT ON shop.orders TO 'app'@'%';"]
        );
    }

    #[test]
    fn undeclared_privilege_is_revoked() {
        let mut diff = PermissionDiff::new("shop");
        for grant in grants("GRANT SELECT ON shop.orders TO 'app'@'%'") {
            diff.add_declared(&grant);
        }
        for grant in grants("GRANT SELECT, DELETE ON shop.orders TO 'app'@'%'") {
            diff.add_live(&grant);
        }
        assert_eq!(
            sql(&diff.changes()),
            vec!["REVOKE DELETE ON shop.orders FROM 'app'@'%';"]
        );
    }

    #[test]
    fn column_lists_narrow_and_widen() {
        let mut diff = PermissionDiff::new("shop");
        for grant in grants("GRANT SELECT (b, c) ON shop.orders TO 'app'@'%'") {
            diff.add_declared(&grant);
        }
        for grant in grants("GRANT SELECT (a, b) ON shop.orders TO 'app'@'%'") {
            diff.add_live(&grant);
        }
        assert_eq!(
            sql(&diff.changes()),
            vec![
                "REVOKE SELECT (a) ON shop.orders FROM 'app'@'%';",
                "GRANT SELECT (c) ON shop.orders TO 'app'@'%';",
            ]
        );
    }

    #[test]
    fn explicit_revoke_reaches_live_privileges() {
        let mut diff = PermissionDiff::new("shop");
        for grant in grants("REVOKE DELETE ON shop.* FROM 'app'@'%'") {
            diff.add_declared(&grant);
        }
        for grant in grants("GRANT SELECT, DELETE ON shop.* TO 'app'@'%'") {
            diff.add_live(&grant);
        }
        let changes = diff.changes();
        assert_eq!(
            sql(&changes),
            vec!["REVOKE DELETE, SELECT ON shop.* FROM 'app'@'%';"]
        );
    }

    #[test]
    fn column_revoke_keeps_the_other_columns() {
        let mut diff = PermissionDiff::new("shop");
        for sql in [
            "GRANT SELECT (a, b) ON shop.t TO 'app'@'%'",
            "REVOKE SELECT (a) ON shop.t FROM 'app'@'%'",
        ] {
            for grant in grants(sql) {
                diff.add_declared(&grant);
            }
        }
        for grant in grants("GRANT SELECT (a, b) ON shop.t TO 'app'@'%'") {
            diff.add_live(&grant);
        }
        assert_eq!(
            sql(&diff.changes()),
            vec!["REVOKE SELECT (a) ON shop.t FROM 'app'@'%';"]
        );
    }

    #[test]
    fn revoking_every_column_drops_the_privilege() {
        let mut diff = PermissionDiff::new("shop");
        for sql in [
            "GRANT SELECT (a) ON shop.t TO 'app'@'%'",
            "REVOKE SELECT (a) ON shop.t FROM 'app'@'%'",
        ] {
            for grant in grants(sql) {
                diff.add_declared(&grant);
            }
        }
        assert!(diff.changes().is_empty());
    }

    #[test]
    fn baseline_change_recomputes_entries() {
        let mut diff = PermissionDiff::new("shop");
        for grant in grants("GRANT SELECT ON shop.orders TO 'app'@'%'") {
            diff.add_declared(&grant);
        }
        assert_eq!(
            sql(&diff.changes()),
            vec!["GRANT SELECT ON shop.orders TO 'app'@'%';"]
        );
        for grant in grants("GRANT SELECT ON shop.* TO 'app'@'%'") {
            diff.add_declared(&grant);
        }
        assert_eq!(
            sql(&diff.changes()),
            vec!["GRANT SELECT ON shop.* TO 'app'@'%';"]
        );
    }
}
