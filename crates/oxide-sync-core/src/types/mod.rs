//! Column data types.
//!
//! Every type the parser accepts lands in one [`DataType`] variant, with
//! synonyms already resolved (`INTEGER` is `INT`, `BOOL` is `TINYINT(1)`,
//! `NUMERIC` is `DECIMAL`, ...). [`DataType::normalized`] strips the
//! remaining spellings that mean the same thing so that two descriptors can
//! be compared with `==`.

mod charset;
mod lossless;

use std::fmt;

use serde::Serialize;

pub use charset::{
    charset_covers, charset_of_collation, normalize_charset, normalize_collation, CharsetCatalog,
    CharsetInfo, DEFAULT_CHARSET,
};

use crate::ast::quote_string;

/// How `REAL` is interpreted (the server's `REAL_AS_FLOAT` SQL mode).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RealPolicy {
    /// `REAL` is `DOUBLE` (server default).
    #[default]
    Double,
    /// `REAL` is `FLOAT`.
    Float,
}

/// Broad family of a type; decides which arguments the type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCategory {
    Integer,
    FixedPoint,
    FloatingPoint,
    SizedString,
    UnsizedString,
    Enumeration,
    Temporal,
    GenericSized,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegerKind {
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
}

impl IntegerKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::MediumInt => "MEDIUMINT",
            Self::Int => "INT",
            Self::BigInt => "BIGINT",
        }
    }

    /// Storage size in bytes.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::TinyInt => 1,
            Self::SmallInt => 2,
            Self::MediumInt => 3,
            Self::Int => 4,
            Self::BigInt => 8,
        }
    }

    /// Inclusive value range.
    #[must_use]
    pub const fn bounds(self, unsigned: bool) -> (i128, i128) {
        let bits = self.bytes() * 8;
        if unsigned {
            (0, (1i128 << bits) - 1)
        } else {
            (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
        }
    }

    /// Widest decimal rendering of any value, sign included.
    #[must_use]
    pub const fn max_chars(self, unsigned: bool) -> u32 {
        match (self, unsigned) {
            (Self::TinyInt, false) => 4,
            (Self::TinyInt, true) => 3,
            (Self::SmallInt, false) => 6,
            (Self::SmallInt, true) => 5,
            (Self::MediumInt, _) => 8,
            (Self::Int, false) => 11,
            (Self::Int, true) => 10,
            (Self::BigInt, _) => 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FloatKind {
    Float,
    Double,
}

impl FloatKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
        }
    }
}

/// String types declared with a length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizedStringKind {
    Char,
    VarChar,
    Binary,
    VarBinary,
}

impl SizedStringKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Char => "CHAR",
            Self::VarChar => "VARCHAR",
            Self::Binary => "BINARY",
            Self::VarBinary => "VARBINARY",
        }
    }

    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(self, Self::Binary | Self::VarBinary)
    }

    /// Fixed-width kinds pad stored values.
    #[must_use]
    pub const fn is_padded(self) -> bool {
        matches!(self, Self::Char | Self::Binary)
    }
}

/// `TEXT` and `BLOB` families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsizedStringKind {
    TinyText,
    Text,
    MediumText,
    LongText,
    TinyBlob,
    Blob,
    MediumBlob,
    LongBlob,
}

impl UnsizedStringKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TinyText => "TINYTEXT",
            Self::Text => "TEXT",
            Self::MediumText => "MEDIUMTEXT",
            Self::LongText => "LONGTEXT",
            Self::TinyBlob => "TINYBLOB",
            Self::Blob => "BLOB",
            Self::MediumBlob => "MEDIUMBLOB",
            Self::LongBlob => "LONGBLOB",
        }
    }

    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(
            self,
            Self::TinyBlob | Self::Blob | Self::MediumBlob | Self::LongBlob
        )
    }

    /// Maximum stored size in bytes.
    #[must_use]
    pub const fn capacity(self) -> u64 {
        match self {
            Self::TinyText | Self::TinyBlob => 255,
            Self::Text | Self::Blob => 65_535,
            Self::MediumText | Self::MediumBlob => 16_777_215,
            Self::LongText | Self::LongBlob => 4_294_967_295,
        }
    }

    /// Smallest kind of the same family holding `length` bytes, as the
    /// server picks for `TEXT(n)` and `BLOB(n)`.
    #[must_use]
    pub fn fitting(length: u64, binary: bool) -> Self {
        let family: [Self; 4] = if binary {
            [Self::TinyBlob, Self::Blob, Self::MediumBlob, Self::LongBlob]
        } else {
            [Self::TinyText, Self::Text, Self::MediumText, Self::LongText]
        };
        family
            .into_iter()
            .find(|kind| kind.capacity() >= length)
            .unwrap_or(family[3])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumerationKind {
    Enum,
    Set,
}

impl EnumerationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enum => "ENUM",
            Self::Set => "SET",
        }
    }
}

/// Temporal types carrying fractional seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalKind {
    Time,
    DateTime,
    Timestamp,
}

impl TemporalKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "TIME",
            Self::DateTime => "DATETIME",
            Self::Timestamp => "TIMESTAMP",
        }
    }
}

/// Charset and collation attached to a textual type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Encoding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
}

impl Encoding {
    #[must_use]
    pub fn new(charset: Option<&str>, collation: Option<&str>) -> Self {
        Self {
            charset: charset.map(String::from),
            collation: collation.map(String::from),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.charset.is_none() && self.collation.is_none()
    }

    /// Effective charset: explicit, else derived from the collation.
    #[must_use]
    pub fn effective_charset(&self) -> Option<String> {
        self.charset
            .as_deref()
            .map(normalize_charset)
            .or_else(|| self.collation.as_deref().map(charset_of_collation))
    }

    /// Canonical form: names normalized, missing parts taken from
    /// `defaults`, and a collation equal to the charset default dropped.
    #[must_use]
    pub fn normalized(&self, defaults: &Encoding, catalog: &CharsetCatalog) -> Self {
        let charset = self
            .effective_charset()
            .or_else(|| defaults.effective_charset());
        let collation = match (&self.collation, &charset) {
            (Some(collation), _) => Some(normalize_collation(collation)),
            (None, Some(charset))
                if defaults.effective_charset().as_deref() == Some(charset.as_str()) =>
            {
                defaults.collation.as_deref().map(normalize_collation)
            }
            _ => None,
        };
        let collation = match (&charset, collation) {
            (Some(cs), Some(co)) if catalog.is_default_collation(cs, &co) => None,
            (_, co) => co,
        };
        Self { charset, collation }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(charset) = &self.charset {
            write!(f, " CHARACTER SET {charset}")?;
        }
        if let Some(collation) = &self.collation {
            write!(f, " COLLATE {collation}")?;
        }
        Ok(())
    }
}

/// A resolved column type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum DataType {
    Integer {
        kind: IntegerKind,
        display_width: Option<u32>,
        unsigned: bool,
        zerofill: bool,
    },
    FixedPoint {
        precision: u32,
        scale: u32,
        unsigned: bool,
        zerofill: bool,
    },
    FloatingPoint {
        kind: FloatKind,
        precision: Option<(u32, u32)>,
        unsigned: bool,
        zerofill: bool,
    },
    SizedString {
        kind: SizedStringKind,
        length: u32,
        encoding: Encoding,
    },
    UnsizedString {
        kind: UnsizedStringKind,
        encoding: Encoding,
    },
    Enumeration {
        kind: EnumerationKind,
        values: Vec<String>,
        encoding: Encoding,
    },
    Temporal {
        kind: TemporalKind,
        fsp: u32,
    },
    /// Types with an optional length and no other arguments, such as `BIT`.
    GenericSized { name: String, length: Option<u32> },
    /// Argument-less types: `DATE`, `YEAR`, `JSON`, spatial types.
    Other { name: String },
}

/// Argument-less type names accepted as [`DataType::Other`].
pub const OTHER_TYPES: &[&str] = &[
    "DATE",
    "YEAR",
    "JSON",
    "GEOMETRY",
    "POINT",
    "LINESTRING",
    "POLYGON",
    "MULTIPOINT",
    "MULTILINESTRING",
    "MULTIPOLYGON",
    "GEOMETRYCOLLECTION",
    "GEOMCOLLECTION",
];

impl DataType {
    /// Plain signed integer without display width.
    #[must_use]
    pub const fn integer(kind: IntegerKind) -> Self {
        Self::Integer {
            kind,
            display_width: None,
            unsigned: false,
            zerofill: false,
        }
    }

    /// `CHAR`/`VARCHAR`/`BINARY`/`VARBINARY` with no explicit encoding.
    #[must_use]
    pub fn sized(kind: SizedStringKind, length: u32) -> Self {
        Self::SizedString {
            kind,
            length,
            encoding: Encoding::default(),
        }
    }

    #[must_use]
    pub const fn category(&self) -> TypeCategory {
        match self {
            Self::Integer { .. } => TypeCategory::Integer,
            Self::FixedPoint { .. } => TypeCategory::FixedPoint,
            Self::FloatingPoint { .. } => TypeCategory::FloatingPoint,
            Self::SizedString { .. } => TypeCategory::SizedString,
            Self::UnsizedString { .. } => TypeCategory::UnsizedString,
            Self::Enumeration { .. } => TypeCategory::Enumeration,
            Self::Temporal { .. } => TypeCategory::Temporal,
            Self::GenericSized { .. } => TypeCategory::GenericSized,
            Self::Other { .. } => TypeCategory::Other,
        }
    }

    /// Type name without arguments, e.g. `VARCHAR`.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Integer { kind, .. } => kind.as_str(),
            Self::FixedPoint { .. } => "DECIMAL",
            Self::FloatingPoint { kind, .. } => kind.as_str(),
            Self::SizedString { kind, .. } => kind.as_str(),
            Self::UnsizedString { kind, .. } => kind.as_str(),
            Self::Enumeration { kind, .. } => kind.as_str(),
            Self::Temporal { kind, .. } => kind.as_str(),
            Self::GenericSized { name, .. } | Self::Other { name } => name,
        }
    }

    /// Returns true for types holding character data (as opposed to bytes).
    #[must_use]
    pub const fn is_textual(&self) -> bool {
        match self {
            Self::SizedString { kind, .. } => !kind.is_binary(),
            Self::UnsizedString { kind, .. } => !kind.is_binary(),
            Self::Enumeration { .. } => true,
            _ => false,
        }
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Integer { .. } | Self::FixedPoint { .. } | Self::FloatingPoint { .. }
        )
    }

    #[must_use]
    pub const fn encoding(&self) -> Option<&Encoding> {
        match self {
            Self::SizedString { encoding, .. }
            | Self::UnsizedString { encoding, .. }
            | Self::Enumeration { encoding, .. } => Some(encoding),
            _ => None,
        }
    }

    /// Mutable access to the encoding of textual types.
    pub fn encoding_mut(&mut self) -> Option<&mut Encoding> {
        match self {
            Self::SizedString { kind, encoding, .. } if !kind.is_binary() => Some(encoding),
            Self::UnsizedString { kind, encoding } if !kind.is_binary() => Some(encoding),
            Self::Enumeration { encoding, .. } => Some(encoding),
            _ => None,
        }
    }

    /// Canonical form for comparison.
    ///
    /// Integer display widths are dropped unless `ZEROFILL` (which then gets
    /// its default width), `ZEROFILL` implies `UNSIGNED`, and textual
    /// encodings are resolved against the table defaults.
    #[must_use]
    pub fn normalized(&self, defaults: &Encoding, catalog: &CharsetCatalog) -> Self {
        let mut normalized = self.clone();
        match &mut normalized {
            Self::Integer {
                kind,
                display_width,
                unsigned,
                zerofill,
            } => {
                if *zerofill {
                    *unsigned = true;
                    *display_width =
                        Some(display_width.unwrap_or_else(|| kind.max_chars(true)));
                } else {
                    *display_width = None;
                }
            }
            Self::FixedPoint {
                unsigned, zerofill, ..
            }
            | Self::FloatingPoint {
                unsigned, zerofill, ..
            } => {
                if *zerofill {
                    *unsigned = true;
                }
            }
            Self::SizedString { kind, encoding, .. } if kind.is_binary() => {
                *encoding = Encoding::default();
            }
            Self::UnsizedString { kind, encoding } if kind.is_binary() => {
                *encoding = Encoding::default();
            }
            Self::SizedString { encoding, .. }
            | Self::UnsizedString { encoding, .. }
            | Self::Enumeration { encoding, .. } => {
                *encoding = encoding.normalized(defaults, catalog);
            }
            Self::Temporal { .. } | Self::GenericSized { .. } | Self::Other { .. } => {}
        }
        normalized
    }
}

fn write_sign(f: &mut fmt::Formatter<'_>, unsigned: bool, zerofill: bool) -> fmt::Result {
    if unsigned {
        f.write_str(" UNSIGNED")?;
    }
    if zerofill {
        f.write_str(" ZEROFILL")?;
    }
    Ok(())
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        match self {
            Self::Integer {
                display_width,
                unsigned,
                zerofill,
                ..
            } => {
                if let Some(width) = display_width {
                    write!(f, "({width})")?;
                }
                write_sign(f, *unsigned, *zerofill)
            }
            Self::FixedPoint {
                precision,
                scale,
                unsigned,
                zerofill,
            } => {
                write!(f, "({precision},{scale})")?;
                write_sign(f, *unsigned, *zerofill)
            }
            Self::FloatingPoint {
                precision,
                unsigned,
                zerofill,
                ..
            } => {
                if let Some((p, s)) = precision {
                    write!(f, "({p},{s})")?;
                }
                write_sign(f, *unsigned, *zerofill)
            }
            Self::SizedString {
                length, encoding, ..
            } => write!(f, "({length}){encoding}"),
            Self::UnsizedString { encoding, .. } => write!(f, "{encoding}"),
            Self::Enumeration {
                values, encoding, ..
            } => {
                let values: Vec<String> = values.iter().map(|v| quote_string(v)).collect();
                write!(f, "({}){encoding}", values.join(","))
            }
            Self::Temporal { fsp, .. } => {
                if *fsp > 0 {
                    write!(f, "({fsp})")?;
                }
                Ok(())
            }
            Self::GenericSized { length, .. } => {
                if let Some(length) = length {
                    write!(f, "({length})")?;
                }
                Ok(())
            }
            Self::Other { .. } => Ok(()),
        }
    }
}
