//! `CREATE TABLE` descriptors.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use super::{quote_identifier, quote_string, TableOptions};
use crate::types::{DataType, Encoding};

/// Possibly database-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    pub name: String,
}

impl TableName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            database: None,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn qualified(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(database) = &self.database {
            write!(f, "{}.", quote_identifier(database))?;
        }
        f.write_str(&quote_identifier(&self.name))
    }
}

/// Column default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultValue {
    Null,
    /// Number or string; `0` and `'0'` are the same literal.
    Literal(String),
    /// `CURRENT_TIMESTAMP` and synonyms, with fractional-second precision.
    CurrentTimestamp(u32),
    /// Bit and hex literals, kept verbatim.
    Raw(String),
    /// Parenthesized expression, without the outer parentheses.
    Expression(String),
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Literal(value) => f.write_str(&quote_string(value)),
            Self::CurrentTimestamp(0) => f.write_str("CURRENT_TIMESTAMP"),
            Self::CurrentTimestamp(fsp) => write!(f, "CURRENT_TIMESTAMP({fsp})"),
            Self::Raw(text) => f.write_str(text),
            Self::Expression(text) => write!(f, "({text})"),
        }
    }
}

/// Placement of a column, as used by `ADD`/`MODIFY COLUMN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    First,
    After(String),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("FIRST"),
            Self::After(column) => write!(f, "AFTER {}", quote_identifier(column)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescription {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    pub auto_increment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_update: Option<DefaultValue>,
    /// Zero-based position in the declaration.
    pub ordinal: usize,
    /// Where the column sits relative to the previous declared column.
    pub position: Position,
}

impl ColumnDescription {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            default: None,
            auto_increment: false,
            comment: None,
            on_update: None,
            ordinal: 0,
            position: Position::First,
        }
    }

    /// Default with the implicit `DEFAULT NULL` of nullable columns filled in.
    #[must_use]
    pub fn effective_default(&self) -> Option<DefaultValue> {
        match (&self.default, self.nullable) {
            (None, true) if !self.auto_increment => Some(DefaultValue::Null),
            (default, _) => default.clone(),
        }
    }
}

impl fmt::Display for ColumnDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", quote_identifier(&self.name), self.data_type)?;
        if !self.nullable {
            f.write_str(" NOT NULL")?;
        }
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {default}")?;
        }
        if let Some(on_update) = &self.on_update {
            write!(f, " ON UPDATE {on_update}")?;
        }
        if self.auto_increment {
            f.write_str(" AUTO_INCREMENT")?;
        }
        if let Some(comment) = &self.comment {
            write!(f, " COMMENT {}", quote_string(comment))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Primary,
    Unique,
    Plain,
    Fulltext,
    Spatial,
}

impl IndexKind {
    /// Keyword prefix before `KEY`.
    const fn prefix(self) -> &'static str {
        match self {
            Self::Primary => "PRIMARY ",
            Self::Unique => "UNIQUE ",
            Self::Plain => "",
            Self::Fulltext => "FULLTEXT ",
            Self::Spatial => "SPATIAL ",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOrder {
    #[default]
    Asc,
    Desc,
}

/// One key part: a column (optionally prefix-limited) or an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexColumn {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<u32>,
    pub order: IndexOrder,
    /// `name` holds a functional key part expression.
    pub expression: bool,
}

impl IndexColumn {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
            order: IndexOrder::Asc,
            expression: false,
        }
    }
}

impl fmt::Display for IndexColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.expression {
            write!(f, "({})", self.name)?;
        } else {
            f.write_str(&quote_identifier(&self.name))?;
        }
        if let Some(prefix) = self.prefix {
            write!(f, "({prefix})")?;
        }
        if self.order == IndexOrder::Desc {
            f.write_str(" DESC")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDescription {
    pub kind: IndexKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<IndexColumn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl IndexDescription {
    #[must_use]
    pub fn new(kind: IndexKind, name: Option<String>, columns: Vec<IndexColumn>) -> Self {
        Self {
            kind,
            name,
            columns,
            using: None,
            comment: None,
        }
    }

    /// Same key, ignoring the name.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.columns.len() == other.columns.len()
            && self.columns.iter().zip(&other.columns).all(|(a, b)| {
                a.name.eq_ignore_ascii_case(&b.name)
                    && a.prefix == b.prefix
                    && a.order == b.order
                    && a.expression == b.expression
            })
            && self.using.as_deref().map(str::to_ascii_uppercase)
                == other.using.as_deref().map(str::to_ascii_uppercase)
            && self.comment.as_deref().unwrap_or("") == other.comment.as_deref().unwrap_or("")
    }
}

impl fmt::Display for IndexDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}KEY ", self.kind.prefix())?;
        if let Some(name) = self.name.as_deref().filter(|_| self.kind != IndexKind::Primary) {
            write!(f, "{} ", quote_identifier(name))?;
        }
        let columns: Vec<String> = self.columns.iter().map(ToString::to_string).collect();
        write!(f, "({})", columns.join(", "))?;
        if let Some(using) = &self.using {
            write!(f, " USING {using}")?;
        }
        if let Some(comment) = &self.comment {
            write!(f, " COMMENT {}", quote_string(comment))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescription {
    pub name: TableName,
    pub temporary: bool,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDescription>,
    pub indexes: Vec<IndexDescription>,
    /// `CONSTRAINT`, `FOREIGN KEY` and `CHECK` definitions, verbatim.
    pub constraints: Vec<String>,
    pub options: TableOptions,
}

impl TableDescription {
    #[must_use]
    pub fn new(name: TableName) -> Self {
        Self {
            name,
            temporary: false,
            if_not_exists: false,
            columns: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
            options: TableOptions::new(),
        }
    }

    /// Finds a column by name (column names are case-insensitive).
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDescription> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn primary_key(&self) -> Option<&IndexDescription> {
        self.indexes
            .iter()
            .find(|index| index.kind == IndexKind::Primary)
    }

    /// Table-level charset and collation that textual columns inherit.
    #[must_use]
    pub fn default_encoding(&self) -> Encoding {
        Encoding::new(self.options.get("CHARSET"), self.options.get("COLLATE"))
    }

    /// Keys with the names the server would give them.
    ///
    /// The primary key is `PRIMARY`; an unnamed key takes the name of its
    /// first column, suffixed `_2`, `_3`, ... on collision.
    #[must_use]
    pub fn named_indexes(&self) -> Vec<(String, &IndexDescription)> {
        let mut taken: HashSet<String> = self
            .indexes
            .iter()
            .filter(|index| index.kind != IndexKind::Primary)
            .filter_map(|index| index.name.as_deref())
            .map(str::to_ascii_lowercase)
            .collect();
        let mut named = Vec::with_capacity(self.indexes.len());
        for index in &self.indexes {
            let name = if index.kind == IndexKind::Primary {
                String::from("PRIMARY")
            } else if let Some(name) = &index.name {
                name.clone()
            } else {
                let base = index
                    .columns
                    .first()
                    .map_or_else(|| String::from("key"), |column| column.name.clone());
                let mut candidate = base.clone();
                let mut suffix = 2;
                while taken.contains(&candidate.to_ascii_lowercase()) {
                    candidate = format!("{base}_{suffix}");
                    suffix += 1;
                }
                taken.insert(candidate.to_ascii_lowercase());
                candidate
            };
            named.push((name, index));
        }
        named
    }
}

impl fmt::Display for TableDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE ")?;
        if self.temporary {
            f.write_str("TEMPORARY ")?;
        }
        f.write_str("TABLE ")?;
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ")?;
        }
        write!(f, "{} (", self.name)?;
        let definitions = self
            .columns
            .iter()
            .map(ToString::to_string)
            .chain(self.indexes.iter().map(ToString::to_string))
            .chain(self.constraints.iter().cloned());
        for (i, definition) in definitions.enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "\n  {definition}")?;
        }
        f.write_str("\n)")?;
        if !self.options.is_empty() {
            write!(f, " {}", self.options)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IntegerKind, SizedStringKind};

    fn key(kind: IndexKind, name: Option<&str>, columns: &[&str]) -> IndexDescription {
        IndexDescription::new(
            kind,
            name.map(String::from),
            columns.iter().map(|c| IndexColumn::new(*c)).collect(),
        )
    }

    #[test]
    fn implicit_default_null() {
        let mut column = ColumnDescription::new("a", DataType::integer(IntegerKind::Int));
        assert_eq!(column.effective_default(), Some(DefaultValue::Null));
        column.nullable = false;
        assert_eq!(column.effective_default(), None);
    }

    #[test]
    fn unnamed_keys_take_first_column_name() {
        let mut table = TableDescription::new(TableName::new("t"));
        table.indexes = vec![
            key(IndexKind::Primary, None, &["id"]),
            key(IndexKind::Plain, None, &["email"]),
            key(IndexKind::Unique, None, &["email", "id"]),
            key(IndexKind::Plain, Some("name"), &["name"]),
        ];
        let names: Vec<String> = table
            .named_indexes()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["PRIMARY", "email", "email_2", "name"]);
    }

    #[test]
    fn renders_create_table() {
        let mut table = TableDescription::new(TableName::qualified("app", "users"));
        let mut id = ColumnDescription::new("id", DataType::integer(IntegerKind::Int));
        id.nullable = false;
        id.auto_increment = true;
        let mut name = ColumnDescription::new("name", DataType::sized(SizedStringKind::VarChar, 10));
        name.default = Some(DefaultValue::Literal("x".into()));
        table.columns = vec![id, name];
        table.indexes = vec![key(IndexKind::Primary, None, &["id"])];
        table.options.insert("ENGINE", "InnoDB".into());

        assert_eq!(
            table.to_string(),
            "CREATE TABLE app.users (\n  id INT NOT NULL AUTO_INCREMENT,\n  \
             name VARCHAR(10) DEFAULT 'x',\n  PRIMARY KEY (id)\n) ENGINE=InnoDB"
        );
    }

    #[test]
    fn index_identity_ignores_name_case() {
        let a = key(IndexKind::Plain, Some("a"), &["Email"]);
        let b = key(IndexKind::Plain, Some("b"), &["email"]);
        assert!(a.same_definition(&b));
        let c = key(IndexKind::Unique, Some("a"), &["email"]);
        assert!(!a.same_definition(&c));
    }
}
