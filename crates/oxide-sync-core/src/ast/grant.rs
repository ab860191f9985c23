//! `GRANT` / `REVOKE` descriptors.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use super::{quote_identifier, quote_string};

/// Privilege granted through `WITH GRANT OPTION`.
pub const GRANT_OPTION: &str = "GRANT OPTION";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    Grant,
    Revoke,
}

impl GrantKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grant => "grant",
            Self::Revoke => "revoke",
        }
    }
}

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An account, `'user'@'host'`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UserHost {
    pub user: String,
    pub host: String,
}

impl UserHost {
    #[must_use]
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
        }
    }

    /// Unquoted `user@host`, used in identity keys.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

impl fmt::Display for UserHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", quote_string(&self.user), quote_string(&self.host))
    }
}

/// Object type named after `ON`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Table,
    Function,
    Procedure,
}

impl ObjectType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
        }
    }
}

/// Reach of one privilege on one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivilegeScope {
    /// The whole object.
    Table,
    /// Only the listed columns (lowercased).
    Columns(BTreeSet<String>),
}

impl PrivilegeScope {
    /// Column scope; an empty list means the whole object.
    #[must_use]
    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = columns
            .into_iter()
            .map(|c| c.as_ref().to_ascii_lowercase())
            .collect();
        if set.is_empty() {
            Self::Table
        } else {
            Self::Columns(set)
        }
    }

    /// Union of two scopes.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Columns(a), Self::Columns(b)) => Self::Columns(a.union(b).cloned().collect()),
            _ => Self::Table,
        }
    }

    /// Returns true if `self` reaches everything `other` reaches.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Table, _) => true,
            (Self::Columns(_), Self::Table) => false,
            (Self::Columns(a), Self::Columns(b)) => b.is_subset(a),
        }
    }

    /// Part of `self` not reached by `other`.
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Option<Self> {
        if other.covers(self) {
            return None;
        }
        match (self, other) {
            (Self::Columns(a), Self::Columns(b)) => {
                Some(Self::Columns(a.difference(b).cloned().collect()))
            }
            _ => Some(self.clone()),
        }
    }

    /// Part of `self` also reached by `other`.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (Self::Table, scope) | (scope, Self::Table) => Some(scope.clone()),
            (Self::Columns(a), Self::Columns(b)) => {
                let common: BTreeSet<String> = a.intersection(b).cloned().collect();
                (!common.is_empty()).then_some(Self::Columns(common))
            }
        }
    }
}

/// Privilege name (uppercase) to scope.
pub type PrivilegeMap = BTreeMap<String, PrivilegeScope>;

/// Adds a privilege, merging with an existing entry.
pub fn merge_privilege(map: &mut PrivilegeMap, name: &str, scope: PrivilegeScope) {
    let merged = match map.get(name) {
        Some(existing) => existing.merge(&scope),
        None => scope,
    };
    map.insert(name.to_string(), merged);
}

/// One grantee's privileges on one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantDescription {
    pub kind: GrantKind,
    pub user: UserHost,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<ObjectType>,
    /// `None` when the statement names no database.
    pub database: Option<String>,
    /// `*` for database-level grants.
    pub table: String,
    pub privileges: PrivilegeMap,
}

impl GrantDescription {
    #[must_use]
    pub fn new(kind: GrantKind, user: UserHost, database: Option<String>, table: &str) -> Self {
        Self {
            kind,
            user,
            object_type: None,
            database,
            table: table.to_string(),
            privileges: PrivilegeMap::new(),
        }
    }

    /// Identity key: `kind:user@host:database.table`.
    #[must_use]
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}.{}",
            self.kind,
            self.user.key(),
            self.database.as_deref().unwrap_or(""),
            self.table
        )
    }

    /// Applies only to the database as a whole.
    #[must_use]
    pub fn is_database_level(&self) -> bool {
        self.table == "*"
    }

    pub fn add(&mut self, privilege: &str, scope: PrivilegeScope) {
        merge_privilege(&mut self.privileges, privilege, scope);
    }

    /// Fills in the database for statements that named a bare table.
    #[must_use]
    pub fn in_database(mut self, database: &str) -> Self {
        if self.database.is_none() {
            self.database = Some(database.to_string());
        }
        self
    }

    fn write_target(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(" ON ")?;
        if let Some(object_type) = self.object_type {
            write!(f, "{} ", object_type.as_str())?;
        }
        if let Some(database) = &self.database {
            write!(f, "{}.", render_level(database))?;
        }
        f.write_str(&render_level(&self.table))
    }
}

fn render_level(name: &str) -> String {
    if name == "*" {
        name.to_string()
    } else {
        quote_identifier(name)
    }
}

fn render_privilege(name: &str, scope: &PrivilegeScope) -> String {
    match scope {
        PrivilegeScope::Table => name.to_string(),
        PrivilegeScope::Columns(columns) => {
            let columns: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
            format!("{name} ({})", columns.join(", "))
        }
    }
}

impl fmt::Display for GrantDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let with_grant_option = self.kind == GrantKind::Grant
            && self.privileges.contains_key(GRANT_OPTION)
            && self.privileges.len() > 1;
        let privileges: Vec<String> = self
            .privileges
            .iter()
            .filter(|(name, _)| !(with_grant_option && name.as_str() == GRANT_OPTION))
            .map(|(name, scope)| render_privilege(name, scope))
            .collect();
        match self.kind {
            GrantKind::Grant => write!(f, "GRANT {}", privileges.join(", "))?,
            GrantKind::Revoke => write!(f, "REVOKE {}", privileges.join(", "))?,
        }
        self.write_target(f)?;
        match self.kind {
            GrantKind::Grant => write!(f, " TO {}", self.user)?,
            GrantKind::Revoke => write!(f, " FROM {}", self.user)?,
        }
        if with_grant_option {
            f.write_str(" WITH GRANT OPTION")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> PrivilegeScope {
        PrivilegeScope::columns(names.iter().copied())
    }

    #[test]
    fn scope_algebra() {
        assert_eq!(cols(&[]), PrivilegeScope::Table);
        assert_eq!(cols(&["a"]).merge(&cols(&["B"])), cols(&["a", "b"]));
        assert_eq!(cols(&["a"]).merge(&PrivilegeScope::Table), PrivilegeScope::Table);
        assert!(PrivilegeScope::Table.covers(&cols(&["a"])));
        assert!(!cols(&["a"]).covers(&PrivilegeScope::Table));
        assert_eq!(cols(&["a", "b"]).subtract(&cols(&["a"])), Some(cols(&["b"])));
        assert_eq!(cols(&["a"]).subtract(&PrivilegeScope::Table), None);
        assert_eq!(cols(&["a", "b"]).intersect(&cols(&["b", "c"])), Some(cols(&["b"])));
        assert_eq!(cols(&["a"]).intersect(&cols(&["b"])), None);
    }

    #[test]
    fn key_format() {
        let grant = GrantDescription::new(
            GrantKind::Grant,
            UserHost::new("app", "%"),
            Some("shop".into()),
            "orders",
        );
        assert_eq!(grant.key(), "grant:app@%:shop.orders");
    }

    #[test]
    fn renders_grant_option_as_suffix() {
        let mut grant = GrantDescription::new(
            GrantKind::Grant,
            UserHost::new("app", "%"),
            Some("shop".into()),
            "*",
        );
        grant.add("SELECT", PrivilegeScope::Table);
        grant.add(GRANT_OPTION, PrivilegeScope::Table);
        assert_eq!(
            grant.to_string(),
            "GRANT SELECT ON shop.* TO 'app'@'%' WITH GRANT OPTION"
        );

        let mut revoke = GrantDescription::new(
            GrantKind::Revoke,
            UserHost::new("app", "%"),
            Some("shop".into()),
            "orders",
        );
        revoke.add("UPDATE", cols(&["total", "state"]));
        assert_eq!(
            revoke.to_string(),
            "REVOKE UPDATE (state, total) ON shop.orders FROM 'app'@'%'"
        );
    }
}
