//! Character set facts: per-character byte widths, default collations,
//! synonym normalization, and repertoire containment.

use std::collections::HashMap;

/// Facts the server reports for one character set
/// (`SHOW CHARACTER SET`: `Charset`, `Default collation`, `Maxlen`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharsetInfo {
    /// Normalized charset name.
    pub name: String,
    /// Collation used when a column names only the charset.
    pub default_collation: String,
    /// Maximum bytes per character.
    pub max_len: u32,
}

/// `(charset, default collation, max bytes per character)` as shipped with
/// MySQL 8.0.
const BUILTIN: &[(&str, &str, u32)] = &[
    ("armscii8", "armscii8_general_ci", 1),
    ("ascii", "ascii_general_ci", 1),
    ("big5", "big5_chinese_ci", 2),
    ("binary", "binary", 1),
    ("cp1250", "cp1250_general_ci", 1),
    ("cp1251", "cp1251_general_ci", 1),
    ("cp1256", "cp1256_general_ci", 1),
    ("cp1257", "cp1257_general_ci", 1),
    ("cp850", "cp850_general_ci", 1),
    ("cp852", "cp852_general_ci", 1),
    ("cp866", "cp866_general_ci", 1),
    ("cp932", "cp932_japanese_ci", 2),
    ("dec8", "dec8_swedish_ci", 1),
    ("eucjpms", "eucjpms_japanese_ci", 3),
    ("euckr", "euckr_korean_ci", 2),
    ("gb18030", "gb18030_chinese_ci", 4),
    ("gb2312", "gb2312_chinese_ci", 2),
    ("gbk", "gbk_chinese_ci", 2),
    ("geostd8", "geostd8_general_ci", 1),
    ("greek", "greek_general_ci", 1),
    ("hebrew", "hebrew_general_ci", 1),
    ("hp8", "hp8_english_ci", 1),
    ("keybcs2", "keybcs2_general_ci", 1),
    ("koi8r", "koi8r_general_ci", 1),
    ("koi8u", "koi8u_general_ci", 1),
    ("latin1", "latin1_swedish_ci", 1),
    ("latin2", "latin2_general_ci", 1),
    ("latin5", "latin5_turkish_ci", 1),
    ("latin7", "latin7_general_ci", 1),
    ("macce", "macce_general_ci", 1),
    ("macroman", "macroman_general_ci", 1),
    ("sjis", "sjis_japanese_ci", 2),
    ("swe7", "swe7_swedish_ci", 1),
    ("tis620", "tis620_thai_ci", 1),
    ("ucs2", "ucs2_general_ci", 2),
    ("ujis", "ujis_japanese_ci", 3),
    ("utf16", "utf16_general_ci", 4),
    ("utf16le", "utf16le_general_ci", 4),
    ("utf32", "utf32_general_ci", 4),
    ("utf8mb3", "utf8mb3_general_ci", 3),
    ("utf8mb4", "utf8mb4_0900_ai_ci", 4),
];

/// Charset assumed when nothing names one (the server default since 8.0).
pub const DEFAULT_CHARSET: &str = "utf8mb4";

/// Charsets able to store every Unicode code point.
const FULL_UNICODE: &[&str] = &["utf8mb4", "utf16", "utf16le", "utf32", "gb18030"];

/// Charsets limited to the Basic Multilingual Plane.
const BMP_ONLY: &[&str] = &["utf8mb3", "ucs2"];

/// Normalizes a charset name: lowercase, `utf8` becomes `utf8mb3`.
#[must_use]
pub fn normalize_charset(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if lower == "utf8" {
        String::from("utf8mb3")
    } else {
        lower
    }
}

/// Normalizes a collation name: lowercase, `utf8_` becomes `utf8mb3_`.
#[must_use]
pub fn normalize_collation(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    match lower.strip_prefix("utf8_") {
        Some(rest) => format!("utf8mb3_{rest}"),
        None => lower,
    }
}

/// Returns the charset a collation belongs to.
#[must_use]
pub fn charset_of_collation(collation: &str) -> String {
    let collation = normalize_collation(collation);
    match collation.split_once('_') {
        Some((charset, _)) => normalize_charset(charset),
        None => collation,
    }
}

/// Returns true if every character representable in `from` is also
/// representable in `to`.
#[must_use]
pub fn charset_covers(from: &str, to: &str) -> bool {
    let from = normalize_charset(from);
    let to = normalize_charset(to);
    if from == to {
        return true;
    }
    if from == "binary" || to == "binary" {
        return false;
    }
    if from == "ascii" {
        return true;
    }
    if FULL_UNICODE.contains(&to.as_str()) {
        return true;
    }
    if BMP_ONLY.contains(&to.as_str()) {
        return from == "latin1" || BMP_ONLY.contains(&from.as_str());
    }
    false
}

/// Charset lookup table.
///
/// Starts from the built-in MySQL 8.0 table; entries read from a live server
/// override it, so "default collation" means what that server reports.
#[derive(Debug, Clone, Default)]
pub struct CharsetCatalog {
    reported: HashMap<String, CharsetInfo>,
}

impl CharsetCatalog {
    /// Creates a catalog backed by the built-in table only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog from server-reported `(charset, default collation,
    /// maxlen)` rows.
    #[must_use]
    pub fn from_reported<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, S, u32)>,
        S: AsRef<str>,
    {
        let reported = rows
            .into_iter()
            .map(|(name, collation, max_len)| {
                let name = normalize_charset(name.as_ref());
                let info = CharsetInfo {
                    name: name.clone(),
                    default_collation: normalize_collation(collation.as_ref()),
                    max_len,
                };
                (name, info)
            })
            .collect();
        Self { reported }
    }

    /// Looks up a charset by (possibly synonymous) name.
    #[must_use]
    pub fn get(&self, charset: &str) -> Option<CharsetInfo> {
        let name = normalize_charset(charset);
        if let Some(info) = self.reported.get(&name) {
            return Some(info.clone());
        }
        BUILTIN
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(n, collation, max_len)| CharsetInfo {
                name: (*n).to_string(),
                default_collation: (*collation).to_string(),
                max_len: *max_len,
            })
    }

    /// Maximum bytes per character; unknown charsets count as 4.
    #[must_use]
    pub fn max_len(&self, charset: &str) -> u32 {
        self.get(charset).map_or(4, |info| info.max_len)
    }

    /// Returns true if `collation` is the default collation of `charset`.
    #[must_use]
    pub fn is_default_collation(&self, charset: &str, collation: &str) -> bool {
        self.get(charset)
            .is_some_and(|info| info.default_collation == normalize_collation(collation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_is_an_alias() {
        assert_eq!(normalize_charset("UTF8"), "utf8mb3");
        assert_eq!(normalize_collation("utf8_general_ci"), "utf8mb3_general_ci");
        assert_eq!(charset_of_collation("utf8_bin"), "utf8mb3");
        assert_eq!(charset_of_collation("utf8mb4_0900_ai_ci"), "utf8mb4");
        assert_eq!(charset_of_collation("binary"), "binary");
    }

    #[test]
    fn builtin_widths() {
        let catalog = CharsetCatalog::new();
        assert_eq!(catalog.max_len("latin1"), 1);
        assert_eq!(catalog.max_len("utf8"), 3);
        assert_eq!(catalog.max_len("utf8mb4"), 4);
        assert_eq!(catalog.max_len("klingon"), 4);
    }

    #[test]
    fn reported_rows_override_builtin() {
        let catalog = CharsetCatalog::from_reported([("utf8mb4", "utf8mb4_general_ci", 4)]);
        assert!(catalog.is_default_collation("utf8mb4", "UTF8MB4_GENERAL_CI"));
        assert!(!catalog.is_default_collation("utf8mb4", "utf8mb4_0900_ai_ci"));
        assert!(catalog.is_default_collation("latin1", "latin1_swedish_ci"));
    }

    #[test]
    fn repertoire_containment() {
        assert!(charset_covers("latin1", "utf8mb4"));
        assert!(charset_covers("latin1", "utf8"));
        assert!(charset_covers("ascii", "latin1"));
        assert!(charset_covers("utf8mb3", "utf8mb4"));
        assert!(!charset_covers("utf8mb4", "utf8mb3"));
        assert!(!charset_covers("utf8mb4", "latin1"));
        assert!(!charset_covers("latin1", "latin2"));
        assert!(!charset_covers("binary", "utf8mb4"));
    }
}
