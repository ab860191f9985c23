//! Table definition differ.
//!
//! Columns, keys and options are compared lazily: each map is computed on
//! first read and kept for the life of the [`TableDiff`].

use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use oxide_sync_core::ast::{
    quote_identifier, table_option, ColumnDescription, DefaultValue, IndexDescription,
    IndexKind, Position, TableDescription, TableName,
};
use oxide_sync_core::types::{CharsetCatalog, Encoding, DEFAULT_CHARSET};
use serde::Serialize;

use super::{Change, ChangeKind};
use crate::guard::{
    drop_column_guard, drop_table_guard, modify_column_guard, GuardedStatement, Operation,
};

/// Options whose value drifts without anyone declaring it.
const IGNORED_OPTIONS: &[&str] = &["AUTO_INCREMENT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableChangeKind {
    Create,
    Drop,
    Alter,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnChange {
    pub name: String,
    pub kind: ChangeKind,
    /// Present on both sides, but outside the longest common ordering.
    pub moved: bool,
    #[serde(flatten)]
    pub change: Change<ColumnDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyChange {
    pub name: String,
    pub kind: ChangeKind,
    #[serde(flatten)]
    pub change: Change<IndexDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionChange {
    pub name: String,
    pub kind: ChangeKind,
    #[serde(flatten)]
    pub change: Change<String>,
}

/// Difference between a declared and a live table.
#[derive(Debug)]
pub struct TableDiff {
    name: TableName,
    file: Option<TableDescription>,
    database: Option<TableDescription>,
    catalog: CharsetCatalog,
    columns: OnceCell<Vec<ColumnChange>>,
    keys: OnceCell<Vec<KeyChange>>,
    options: OnceCell<Vec<OptionChange>>,
}

impl TableDiff {
    /// Compares the declared table (`file`) with the live one (`database`).
    ///
    /// Statements name the table without a database qualifier; they are
    /// meant to run with the target database selected.
    pub fn new(
        file: Option<TableDescription>,
        database: Option<TableDescription>,
        catalog: CharsetCatalog,
    ) -> Self {
        let name = file
            .as_ref()
            .or(database.as_ref())
            .map_or_else(|| TableName::new(""), |t| TableName::new(t.name.name.clone()));
        Self {
            name,
            file,
            database,
            catalog,
            columns: OnceCell::new(),
            keys: OnceCell::new(),
            options: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &TableName {
        &self.name
    }

    pub fn file(&self) -> Option<&TableDescription> {
        self.file.as_ref()
    }

    pub fn database(&self) -> Option<&TableDescription> {
        self.database.as_ref()
    }

    pub fn kind(&self) -> TableChangeKind {
        match (&self.database, &self.file) {
            (None, Some(_)) => TableChangeKind::Create,
            (Some(_), None) => TableChangeKind::Drop,
            (Some(_), Some(_)) if !self.is_empty() => TableChangeKind::Alter,
            _ => TableChangeKind::Unchanged,
        }
    }

    /// Returns true if no column, key or option differs.
    pub fn is_empty(&self) -> bool {
        self.columns().is_empty() && self.keys().is_empty() && self.options().is_empty()
    }

    /// Columns that differ, declared order first, then live-only columns.
    pub fn columns(&self) -> &[ColumnChange] {
        self.columns.get_or_init(|| self.compute_columns())
    }

    /// Keys that differ, by server-assigned name.
    pub fn keys(&self) -> &[KeyChange] {
        self.keys.get_or_init(|| self.compute_keys())
    }

    /// Table options that differ.
    pub fn options(&self) -> &[OptionChange] {
        self.options.get_or_init(|| self.compute_options())
    }

    /// Charset and collation each side's columns inherit.
    ///
    /// A declaration without a table charset inherits whatever the live
    /// table uses.
    fn encoding_defaults(&self) -> (Encoding, Encoding) {
        let fallback = Encoding::new(Some(DEFAULT_CHARSET), None);
        let database = self
            .database
            .as_ref()
            .map(TableDescription::default_encoding)
            .filter(|e| !e.is_empty())
            .unwrap_or(fallback);
        let file = self
            .file
            .as_ref()
            .map(TableDescription::default_encoding)
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| database.clone());
        (file, database)
    }

    fn normalize(&self, column: &ColumnDescription, defaults: &Encoding) -> ColumnDescription {
        let mut normalized = column.clone();
        normalized.data_type = column.data_type.normalized(defaults, &self.catalog);
        normalized.default = column.effective_default();
        normalized.comment = column.comment.clone().filter(|c| !c.is_empty());
        normalized
    }

    fn compute_columns(&self) -> Vec<ColumnChange> {
        let (Some(file), Some(database)) = (&self.file, &self.database) else {
            return Vec::new();
        };
        let (file_defaults, db_defaults) = self.encoding_defaults();
        let live: HashMap<String, &ColumnDescription> = database
            .columns
            .iter()
            .map(|c| (c.name.to_ascii_lowercase(), c))
            .collect();
        let declared: HashSet<String> = file
            .columns
            .iter()
            .map(|c| c.name.to_ascii_lowercase())
            .collect();
        let moved = moved_columns(file, database);

        let mut changes = Vec::new();
        for column in &file.columns {
            let key = column.name.to_ascii_lowercase();
            let before = live.get(&key).copied();
            let is_moved = moved.contains(&key);
            let change = Change::new(before.cloned(), Some(column.clone()));
            let mut kind = change.kind_by(|b, a| {
                same_column(
                    &self.normalize(b, &db_defaults),
                    &self.normalize(a, &file_defaults),
                )
            });
            if kind == ChangeKind::Unchanged && is_moved {
                kind = ChangeKind::Modify;
            }
            if kind != ChangeKind::Unchanged {
                changes.push(ColumnChange {
                    name: column.name.clone(),
                    kind,
                    moved: is_moved,
                    change,
                });
            }
        }
        for column in &database.columns {
            if !declared.contains(&column.name.to_ascii_lowercase()) {
                changes.push(ColumnChange {
                    name: column.name.clone(),
                    kind: ChangeKind::Drop,
                    moved: false,
                    change: Change::new(Some(column.clone()), None),
                });
            }
        }
        changes
    }

    fn compute_keys(&self) -> Vec<KeyChange> {
        let (Some(file), Some(database)) = (&self.file, &self.database) else {
            return Vec::new();
        };
        let live: HashMap<String, (String, &IndexDescription)> = database
            .named_indexes()
            .into_iter()
            .map(|(name, index)| (name.to_ascii_lowercase(), (name, index)))
            .collect();
        let declared = file.named_indexes();
        let declared_names: HashSet<String> =
            declared.iter().map(|(name, _)| name.to_ascii_lowercase()).collect();

        let mut changes = Vec::new();
        for (name, index) in &declared {
            let before = live
                .get(&name.to_ascii_lowercase())
                .map(|(_, index)| named(index, name));
            let change = Change::new(before, Some(named(index, name)));
            let kind = change.kind_by(IndexDescription::same_definition);
            if kind != ChangeKind::Unchanged {
                changes.push(KeyChange {
                    name: name.clone(),
                    kind,
                    change,
                });
            }
        }
        for (name, index) in database.named_indexes() {
            if !declared_names.contains(&name.to_ascii_lowercase()) {
                changes.push(KeyChange {
                    change: Change::new(Some(named(index, &name)), None),
                    name,
                    kind: ChangeKind::Drop,
                });
            }
        }
        changes
    }

    fn compute_options(&self) -> Vec<OptionChange> {
        let (Some(file), Some(database)) = (&self.file, &self.database) else {
            return Vec::new();
        };
        let declared = self.comparable_options(file);
        let live = self.comparable_options(database);
        let names: BTreeSet<&String> = declared.keys().chain(live.keys()).collect();

        let mut changes = Vec::new();
        for name in names {
            let spec = table_option(name);
            let same = |a: &str, b: &str| spec.map_or(a == b, |s| s.same_value(a, b));
            let default = spec.and_then(|s| s.default);
            let (before, after) = match (live.get(name), declared.get(name)) {
                (Some(b), Some(a)) if same(b.as_str(), a.as_str()) => continue,
                (Some(b), Some(a)) => (Some(b.clone()), a.clone()),
                // Live-only options count as declared at their default.
                (Some(b), None) => match default {
                    Some(d) if !same(b.as_str(), d) => (Some(b.clone()), d.to_string()),
                    _ => continue,
                },
                (None, Some(a)) => match default {
                    Some(d) if same(a.as_str(), d) => continue,
                    _ => (None, a.clone()),
                },
                (None, None) => continue,
            };
            let change = Change::new(before, Some(after));
            changes.push(OptionChange {
                name: name.clone(),
                kind: change.kind(),
                change,
            });
        }
        changes
    }

    /// Options worth comparing: drifting counters removed, and a collation
    /// that is the charset's default dropped.
    fn comparable_options(&self, table: &TableDescription) -> BTreeMap<String, String> {
        let mut options: BTreeMap<String, String> = table
            .options
            .iter()
            .filter(|(name, _)| !IGNORED_OPTIONS.contains(name))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        let default_collation = match (table.default_encoding().effective_charset(), options.get("COLLATE")) {
            (Some(charset), Some(collation)) => self.catalog.is_default_collation(&charset, collation),
            _ => false,
        };
        if default_collation {
            options.remove("COLLATE");
        }
        options
    }

    /// Statements bringing the live table to the declared one.
    ///
    /// Within one table the order is fixed: drop keys, add columns, modify
    /// columns, drop columns, add keys, change options.
    pub fn statements(&self) -> Vec<GuardedStatement> {
        let table = &self.name;
        match (&self.database, &self.file) {
            (None, Some(file)) => {
                let mut create = file.clone();
                create.name = table.clone();
                vec![GuardedStatement::safe(
                    Operation::CreateTable,
                    table.name.clone(),
                    format!("{create};"),
                )]
            }
            (Some(_), None) => vec![GuardedStatement::guarded(
                Operation::DropTable,
                table.name.clone(),
                format!("DROP TABLE {table};"),
                drop_table_guard(table),
            )],
            (Some(_), Some(_)) => self.alter_statements(),
            (None, None) => Vec::new(),
        }
    }

    fn alter_statements(&self) -> Vec<GuardedStatement> {
        let table = &self.name;
        let (file_defaults, db_defaults) = self.encoding_defaults();
        let mut statements = Vec::new();

        for key in self.keys() {
            if let (Some(before), ChangeKind::Drop | ChangeKind::Modify) = (&key.change.before, key.kind) {
                let target = if before.kind == IndexKind::Primary {
                    String::from("PRIMARY KEY")
                } else {
                    format!("KEY {}", quote_identifier(&key.name))
                };
                statements.push(GuardedStatement::safe(
                    Operation::DropKey,
                    format!("{}.{}", table.name, key.name),
                    format!("ALTER TABLE {table} DROP {target};"),
                ));
            }
        }

        for column in self.columns() {
            if let (ChangeKind::Add, Some(after)) = (column.kind, &column.change.after) {
                statements.push(GuardedStatement::safe(
                    Operation::AddColumn,
                    format!("{}.{}", table.name, column.name),
                    format!("ALTER TABLE {table} ADD COLUMN {after} {};", after.position),
                ));
            }
        }

        // Declared order, so each positioned column lands after a
        // predecessor that is already in place.
        let displaced = self.displaced_columns();
        for column in self.columns() {
            if let (ChangeKind::Add, Some(after)) = (column.kind, &column.change.after) {
                if displaced.contains(&column.name.to_ascii_lowercase()) {
                    statements.push(GuardedStatement::safe(
                        Operation::ModifyColumn,
                        format!("{}.{}", table.name, column.name),
                        format!("ALTER TABLE {table} MODIFY COLUMN {after} {};", after.position),
                    ));
                }
                continue;
            }
            let (ChangeKind::Modify, Some(before), Some(after)) =
                (column.kind, &column.change.before, &column.change.after)
            else {
                continue;
            };
            let position = if column.moved {
                format!(" {}", after.position)
            } else {
                String::new()
            };
            let sql = format!("ALTER TABLE {table} MODIFY COLUMN {after}{position};");
            let target = format!("{}.{}", table.name, column.name);
            let before = self.normalize(before, &db_defaults);
            let after = self.normalize(after, &file_defaults);
            let context = format!("{} -> {}", before.data_type, after.data_type);
            let statement = match modify_column_guard(table, &before, &after, &self.catalog) {
                Some(guard) => GuardedStatement::guarded(Operation::ModifyColumn, target, sql, guard),
                None => GuardedStatement::safe(Operation::ModifyColumn, target, sql),
            };
            statements.push(statement.with_context(context));
        }

        for column in self.columns() {
            if let (ChangeKind::Drop, Some(before)) = (column.kind, &column.change.before) {
                statements.push(GuardedStatement::guarded(
                    Operation::DropColumn,
                    format!("{}.{}", table.name, column.name),
                    format!(
                        "ALTER TABLE {table} DROP COLUMN {};",
                        quote_identifier(&column.name)
                    ),
                    drop_column_guard(table, before),
                ));
            }
        }

        for key in self.keys() {
            if let (Some(after), ChangeKind::Add | ChangeKind::Modify) = (&key.change.after, key.kind) {
                statements.push(GuardedStatement::safe(
                    Operation::AddKey,
                    format!("{}.{}", table.name, key.name),
                    format!("ALTER TABLE {table} ADD {after};"),
                ));
            }
        }

        let options: Vec<String> = self
            .options()
            .iter()
            .filter_map(|option| {
                let value = option.change.after.as_deref()?;
                Some(table_option(&option.name).map_or_else(
                    || format!("{}={value}", option.name),
                    |spec| spec.render(value),
                ))
            })
            .collect();
        if !options.is_empty() {
            statements.push(GuardedStatement::safe(
                Operation::AlterOptions,
                table.name.clone(),
                format!("ALTER TABLE {table} {};", options.join(" ")),
            ));
        }

        statements
    }

    /// Columns needing a positioned `MODIFY`: moved columns, and added
    /// columns following a displaced one. `ADD COLUMN` runs before any
    /// move, so such a column is left next to its predecessor's old place.
    fn displaced_columns(&self) -> HashSet<String> {
        let mut displaced = HashSet::new();
        let Some(file) = &self.file else {
            return displaced;
        };
        let changes: HashMap<String, &ColumnChange> = self
            .columns()
            .iter()
            .map(|c| (c.name.to_ascii_lowercase(), c))
            .collect();
        for column in &file.columns {
            let key = column.name.to_ascii_lowercase();
            let Some(change) = changes.get(&key) else {
                continue;
            };
            let follows_displaced = matches!(
                &column.position,
                Position::After(previous) if displaced.contains(&previous.to_ascii_lowercase())
            );
            if change.moved || (change.kind == ChangeKind::Add && follows_displaced) {
                displaced.insert(key);
            }
        }
        displaced
    }
}

/// Copy of a key carrying its server-assigned name.
fn named(index: &IndexDescription, name: &str) -> IndexDescription {
    let mut index = index.clone();
    if index.kind != IndexKind::Primary {
        index.name = Some(name.to_string());
    }
    index
}

/// Compares two normalized columns, ignoring position.
fn same_column(a: &ColumnDescription, b: &ColumnDescription) -> bool {
    a.data_type == b.data_type
        && a.nullable == b.nullable
        && a.auto_increment == b.auto_increment
        && a.comment == b.comment
        && same_default(a.default.as_ref(), b.default.as_ref(), a.data_type.is_numeric())
        && a.on_update == b.on_update
}

/// `0` and `0.00` are the same default on a numeric column.
fn same_default(a: Option<&DefaultValue>, b: Option<&DefaultValue>, numeric: bool) -> bool {
    match (a, b) {
        (Some(DefaultValue::Literal(x)), Some(DefaultValue::Literal(y))) if numeric => {
            x == y
                || matches!(
                    (x.parse::<f64>(), y.parse::<f64>()),
                    (Ok(x), Ok(y)) if x == y
                )
        }
        (a, b) => a == b,
    }
}

/// Columns present on both sides whose relative order changed.
///
/// The longest common subsequence of the two orders stays put; only the
/// columns outside it are reported, so one move is not mistaken for many.
fn moved_columns(file: &TableDescription, database: &TableDescription) -> HashSet<String> {
    let live: HashSet<String> = database
        .columns
        .iter()
        .map(|c| c.name.to_ascii_lowercase())
        .collect();
    let declared: HashSet<String> = file
        .columns
        .iter()
        .map(|c| c.name.to_ascii_lowercase())
        .collect();
    let file_order: Vec<String> = file
        .columns
        .iter()
        .map(|c| c.name.to_ascii_lowercase())
        .filter(|name| live.contains(name))
        .collect();
    let db_order: Vec<String> = database
        .columns
        .iter()
        .map(|c| c.name.to_ascii_lowercase())
        .filter(|name| declared.contains(name))
        .collect();
    if file_order == db_order {
        return HashSet::new();
    }
    let stable: HashSet<&String> = longest_common_subsequence(&file_order, &db_order)
        .into_iter()
        .collect();
    file_order
        .iter()
        .filter(|name| !stable.contains(name))
        .cloned()
        .collect()
}

fn longest_common_subsequence<'a, T: PartialEq>(a: &'a [T], b: &[T]) -> Vec<&'a T> {
    let (n, m) = (a.len(), b.len());
    // lengths[i][j]: LCS length of a[i..] and b[j..]
    let mut lengths = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[i][j] = if a[i] == b[j] {
                lengths[i + 1][j + 1] + 1
            } else {
                lengths[i + 1][j].max(lengths[i][j + 1])
            };
        }
    }
    let mut sequence = Vec::with_capacity(lengths[0][0]);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            sequence.push(&a[i]);
            i += 1;
            j += 1;
        } else if lengths[i + 1][j] >= lengths[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    sequence
}
