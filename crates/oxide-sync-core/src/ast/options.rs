//! Table options (`ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 ...`).

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::quote_string;

/// Values an option accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionValue {
    /// Any single token.
    FreeForm,
    /// `0` or `1`.
    Boolean,
    /// One of a fixed, case-insensitive list.
    OneOf(&'static [&'static str]),
}

/// Dictionary entry for one table option.
#[derive(Debug, Clone, Copy)]
pub struct TableOptionSpec {
    /// Canonical name, used as the key in [`TableOptions`].
    pub name: &'static str,
    /// Word sequences that introduce the option.
    pub spellings: &'static [&'static [&'static str]],
    pub value: OptionValue,
    /// Value the server assumes when the option is absent.
    pub default: Option<&'static str>,
    /// Value is written as a string literal; free-form quoted values compare
    /// case-sensitively.
    pub quoted: bool,
}

impl TableOptionSpec {
    /// Returns true if both values mean the same thing.
    #[must_use]
    pub fn same_value(&self, a: &str, b: &str) -> bool {
        if self.quoted && self.value == OptionValue::FreeForm {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }

    /// Returns true if `value` is acceptable for this option.
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        match self.value {
            OptionValue::FreeForm => true,
            OptionValue::Boolean => value == "0" || value == "1",
            OptionValue::OneOf(choices) => choices.iter().any(|c| c.eq_ignore_ascii_case(value)),
        }
    }

    /// Renders `NAME=value`.
    #[must_use]
    pub fn render(&self, value: &str) -> String {
        if self.quoted {
            format!("{}={}", self.name, quote_string(value))
        } else {
            format!("{}={value}", self.name)
        }
    }
}

const fn option(
    name: &'static str,
    spellings: &'static [&'static [&'static str]],
    value: OptionValue,
    default: Option<&'static str>,
    quoted: bool,
) -> TableOptionSpec {
    TableOptionSpec {
        name,
        spellings,
        value,
        default,
        quoted,
    }
}

const TRI_STATE: OptionValue = OptionValue::OneOf(&["0", "1", "DEFAULT"]);

/// Every table option the parser accepts.
pub const TABLE_OPTIONS: &[TableOptionSpec] = &[
    option("AUTO_INCREMENT", &[&["AUTO_INCREMENT"]], OptionValue::FreeForm, None, false),
    option("AVG_ROW_LENGTH", &[&["AVG_ROW_LENGTH"]], OptionValue::FreeForm, None, false),
    option(
        "CHARSET",
        &[
            &["DEFAULT", "CHARACTER", "SET"],
            &["DEFAULT", "CHARSET"],
            &["CHARACTER", "SET"],
            &["CHARSET"],
        ],
        OptionValue::FreeForm,
        None,
        false,
    ),
    option("CHECKSUM", &[&["CHECKSUM"]], OptionValue::Boolean, Some("0"), false),
    option(
        "COLLATE",
        &[&["DEFAULT", "COLLATE"], &["COLLATE"]],
        OptionValue::FreeForm,
        None,
        false,
    ),
    option("COMMENT", &[&["COMMENT"]], OptionValue::FreeForm, Some(""), true),
    option(
        "COMPRESSION",
        &[&["COMPRESSION"]],
        OptionValue::OneOf(&["ZLIB", "LZ4", "NONE"]),
        Some("NONE"),
        true,
    ),
    option("CONNECTION", &[&["CONNECTION"]], OptionValue::FreeForm, None, true),
    option("DATA DIRECTORY", &[&["DATA", "DIRECTORY"]], OptionValue::FreeForm, None, true),
    option("DELAY_KEY_WRITE", &[&["DELAY_KEY_WRITE"]], OptionValue::Boolean, Some("0"), false),
    option(
        "ENCRYPTION",
        &[&["ENCRYPTION"]],
        OptionValue::OneOf(&["Y", "N"]),
        Some("N"),
        true,
    ),
    option("ENGINE", &[&["ENGINE"]], OptionValue::FreeForm, None, false),
    option("INDEX DIRECTORY", &[&["INDEX", "DIRECTORY"]], OptionValue::FreeForm, None, true),
    option(
        "INSERT_METHOD",
        &[&["INSERT_METHOD"]],
        OptionValue::OneOf(&["NO", "FIRST", "LAST"]),
        Some("NO"),
        false,
    ),
    option("KEY_BLOCK_SIZE", &[&["KEY_BLOCK_SIZE"]], OptionValue::FreeForm, Some("0"), false),
    option("MAX_ROWS", &[&["MAX_ROWS"]], OptionValue::FreeForm, Some("0"), false),
    option("MIN_ROWS", &[&["MIN_ROWS"]], OptionValue::FreeForm, Some("0"), false),
    option("PACK_KEYS", &[&["PACK_KEYS"]], TRI_STATE, Some("DEFAULT"), false),
    option("PASSWORD", &[&["PASSWORD"]], OptionValue::FreeForm, None, true),
    option(
        "ROW_FORMAT",
        &[&["ROW_FORMAT"]],
        OptionValue::OneOf(&[
            "DEFAULT",
            "DYNAMIC",
            "FIXED",
            "COMPRESSED",
            "REDUNDANT",
            "COMPACT",
        ]),
        Some("DEFAULT"),
        false,
    ),
    option("STATS_AUTO_RECALC", &[&["STATS_AUTO_RECALC"]], TRI_STATE, Some("DEFAULT"), false),
    option("STATS_PERSISTENT", &[&["STATS_PERSISTENT"]], TRI_STATE, Some("DEFAULT"), false),
    option("STATS_SAMPLE_PAGES", &[&["STATS_SAMPLE_PAGES"]], OptionValue::FreeForm, None, false),
    option("TABLESPACE", &[&["TABLESPACE"]], OptionValue::FreeForm, None, false),
];

/// Looks up an option by canonical name.
#[must_use]
pub fn table_option(name: &str) -> Option<&'static TableOptionSpec> {
    TABLE_OPTIONS
        .iter()
        .find(|spec| spec.name.eq_ignore_ascii_case(name))
}

/// Declared table options keyed by canonical name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TableOptions(BTreeMap<String, String>);

impl TableOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of an option, if declared.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Stores a value, returning the previous one.
    pub fn insert(&mut self, name: &str, value: String) -> Option<String> {
        self.0.insert(name.to_string(), value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TableOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            match table_option(name) {
                Some(spec) => f.write_str(&spec.render(value))?,
                None => write!(f, "{name}={value}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_canonical_name() {
        let spec = table_option("row_format").expect("known option");
        assert_eq!(spec.default, Some("DEFAULT"));
        assert!(spec.accepts("dynamic"));
        assert!(!spec.accepts("SPARSE"));
        assert!(table_option("PARTITIONS").is_none());
    }

    #[test]
    fn quoted_values_compare_exactly() {
        let comment = table_option("COMMENT").expect("known option");
        assert!(!comment.same_value("Users", "users"));
        let engine = table_option("ENGINE").expect("known option");
        assert!(engine.same_value("InnoDB", "INNODB"));
    }

    #[test]
    fn renders_sorted_and_quoted() {
        let mut options = TableOptions::new();
        options.insert("ENGINE", "InnoDB".into());
        options.insert("COMMENT", "it's".into());
        options.insert("CHARSET", "utf8mb4".into());
        assert_eq!(
            options.to_string(),
            "CHARSET=utf8mb4 COMMENT='it''s' ENGINE=InnoDB"
        );
    }
}
