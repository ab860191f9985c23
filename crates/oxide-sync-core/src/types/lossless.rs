//! Lossless conversion between column types.
//!
//! `a.is_lossless(&b)` answers whether every value storable in `a` survives
//! an `ALTER TABLE ... MODIFY` to `b` unchanged. The predicate is
//! conservative: `false` only means the change has to be checked against
//! the actual data.

use super::{charset_covers, CharsetCatalog, DataType, Encoding, EnumerationKind, DEFAULT_CHARSET};

/// Most members a `SET` may declare.
const MAX_SET_MEMBERS: usize = 64;

/// Character and byte capacity of a string type.
struct Capacity {
    chars: u64,
    bytes: u64,
    binary: bool,
    padded: bool,
    charset: String,
}

impl Capacity {
    fn of(ty: &DataType, catalog: &CharsetCatalog) -> Option<Self> {
        match ty {
            DataType::SizedString {
                kind,
                length,
                encoding,
            } => {
                let charset = charset_name(encoding, kind.is_binary());
                let width = if kind.is_binary() {
                    1
                } else {
                    catalog.max_len(&charset)
                };
                Some(Self {
                    chars: u64::from(*length),
                    bytes: u64::from(*length) * u64::from(width),
                    binary: kind.is_binary(),
                    padded: kind.is_padded(),
                    charset,
                })
            }
            DataType::UnsizedString { kind, encoding } => Some(Self {
                chars: kind.capacity(),
                bytes: kind.capacity(),
                binary: kind.is_binary(),
                padded: false,
                charset: charset_name(encoding, kind.is_binary()),
            }),
            _ => None,
        }
    }
}

fn charset_name(encoding: &Encoding, binary: bool) -> String {
    if binary {
        return String::from("binary");
    }
    encoding
        .effective_charset()
        .unwrap_or_else(|| DEFAULT_CHARSET.to_string())
}

/// Widest rendering of a decimal value: digits, decimal point, sign.
fn decimal_chars(precision: u32, scale: u32, unsigned: bool) -> u64 {
    u64::from(precision) + u64::from(scale > 0) + u64::from(!unsigned)
}

/// Rendered width for numbers stored into a character column.
fn numeric_chars(ty: &DataType) -> Option<u64> {
    match ty {
        DataType::Integer { kind, unsigned, .. } => Some(u64::from(kind.max_chars(*unsigned))),
        DataType::FixedPoint {
            precision,
            scale,
            unsigned,
            ..
        } => Some(decimal_chars(*precision, *scale, *unsigned)),
        _ => None,
    }
}

fn sign_preserved(from_unsigned: bool, to_unsigned: bool) -> bool {
    from_unsigned || !to_unsigned
}

impl DataType {
    /// Returns true if converting a column from `self` to `other` cannot
    /// change or reject any stored value.
    ///
    /// Uses the built-in charset table; see [`DataType::is_lossless_with`].
    #[must_use]
    pub fn is_lossless(&self, other: &Self) -> bool {
        self.is_lossless_with(other, &CharsetCatalog::new())
    }

    /// [`DataType::is_lossless`] with server-reported charset widths.
    #[must_use]
    pub fn is_lossless_with(&self, other: &Self, catalog: &CharsetCatalog) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (
                Self::Integer {
                    kind: a,
                    unsigned: ua,
                    ..
                },
                Self::Integer {
                    kind: b,
                    unsigned: ub,
                    ..
                },
            ) => match (ua, ub) {
                (false, true) => false,
                (true, false) => a.bytes() < b.bytes(),
                _ => a.bytes() <= b.bytes(),
            },
            (
                Self::FixedPoint {
                    precision: p1,
                    scale: s1,
                    unsigned: u1,
                    ..
                },
                Self::FixedPoint {
                    precision: p2,
                    scale: s2,
                    unsigned: u2,
                    ..
                },
            ) => {
                sign_preserved(*u1, *u2)
                    && s2 >= s1
                    && p2.saturating_sub(*s2) >= p1.saturating_sub(*s1)
            }
            (
                Self::FloatingPoint {
                    kind: k1,
                    precision: pr1,
                    unsigned: u1,
                    ..
                },
                Self::FloatingPoint {
                    kind: k2,
                    precision: pr2,
                    unsigned: u2,
                    ..
                },
            ) => {
                if !sign_preserved(*u1, *u2) || k1 > k2 {
                    return false;
                }
                match (pr1, pr2) {
                    (_, None) => true,
                    (None, Some(_)) => false,
                    (Some((p1, s1)), Some((p2, s2))) => {
                        s2 >= s1 && p2.saturating_sub(*s2) >= p1.saturating_sub(*s1)
                    }
                }
            }
            (Self::Integer { .. } | Self::FixedPoint { .. }, Self::SizedString { kind, length, .. })
                if !kind.is_binary() =>
            {
                numeric_chars(self).is_some_and(|chars| chars <= u64::from(*length))
            }
            (Self::Integer { .. } | Self::FixedPoint { .. }, Self::UnsizedString { kind, .. }) => {
                !kind.is_binary()
            }
            (
                Self::SizedString { .. } | Self::UnsizedString { .. },
                Self::SizedString { .. } | Self::UnsizedString { .. },
            ) => string_fits(self, other, catalog),
            (
                Self::Enumeration {
                    kind: k1,
                    values: v1,
                    encoding: e1,
                },
                Self::Enumeration {
                    kind: k2,
                    values: v2,
                    encoding: e2,
                },
            ) => {
                let kinds_ok = match (k1, k2) {
                    (EnumerationKind::Set, EnumerationKind::Enum) => false,
                    (EnumerationKind::Enum, EnumerationKind::Set) => v2.len() <= MAX_SET_MEMBERS,
                    _ => true,
                };
                kinds_ok
                    && v1.iter().all(|value| v2.contains(value))
                    && charset_covers(
                        &charset_name(e1, false),
                        &charset_name(e2, false),
                    )
            }
            (Self::Temporal { kind: k1, fsp: f1 }, Self::Temporal { kind: k2, fsp: f2 }) => {
                k1 == k2 && f1 <= f2
            }
            (
                Self::GenericSized {
                    name: n1,
                    length: l1,
                },
                Self::GenericSized {
                    name: n2,
                    length: l2,
                },
            ) => n1 == n2 && l1.unwrap_or(1) <= l2.unwrap_or(1),
            (Self::Other { name: a }, Self::Other { name: b }) => a == b,
            _ => false,
        }
    }
}

fn string_fits(from: &DataType, to: &DataType, catalog: &CharsetCatalog) -> bool {
    let (Some(a), Some(b)) = (Capacity::of(from, catalog), Capacity::of(to, catalog)) else {
        return false;
    };
    if a.binary != b.binary {
        return false;
    }
    // Padded targets strip (or add) trailing pad characters on read.
    if b.padded && !a.padded {
        return false;
    }
    if !a.binary && !charset_covers(&a.charset, &b.charset) {
        return false;
    }
    a.chars <= b.chars && a.bytes <= b.bytes
}

#[cfg(test)]
mod tests {
    use super::super::{FloatKind, IntegerKind, SizedStringKind, TemporalKind, UnsizedStringKind};
    use super::*;

    fn int(kind: IntegerKind, unsigned: bool) -> DataType {
        DataType::Integer {
            kind,
            display_width: None,
            unsigned,
            zerofill: false,
        }
    }

    fn decimal(precision: u32, scale: u32) -> DataType {
        DataType::FixedPoint {
            precision,
            scale,
            unsigned: false,
            zerofill: false,
        }
    }

    fn varchar(length: u32, charset: &str) -> DataType {
        DataType::SizedString {
            kind: SizedStringKind::VarChar,
            length,
            encoding: Encoding::new(Some(charset), None),
        }
    }

    fn text(kind: UnsizedStringKind, charset: &str) -> DataType {
        DataType::UnsizedString {
            kind,
            encoding: Encoding::new(Some(charset), None),
        }
    }

    fn enumeration(kind: EnumerationKind, values: &[&str]) -> DataType {
        DataType::Enumeration {
            kind,
            values: values.iter().map(|v| (*v).to_string()).collect(),
            encoding: Encoding::default(),
        }
    }

    #[test]
    fn reflexive() {
        let samples = [
            int(IntegerKind::Int, false),
            decimal(10, 2),
            varchar(10, "latin1"),
            text(UnsizedStringKind::Text, "utf8mb4"),
            enumeration(EnumerationKind::Set, &["a", "b"]),
            DataType::Temporal {
                kind: TemporalKind::Timestamp,
                fsp: 6,
            },
            DataType::Other {
                name: "JSON".into(),
            },
        ];
        for ty in &samples {
            assert!(ty.is_lossless(ty), "{ty} should convert to itself");
        }
    }

    #[test]
    fn integer_widening() {
        use IntegerKind::*;
        assert!(int(TinyInt, false).is_lossless(&int(Int, false)));
        assert!(!int(BigInt, false).is_lossless(&int(Int, false)));
        assert!(!int(Int, false).is_lossless(&int(BigInt, true)));
        assert!(!int(Int, true).is_lossless(&int(Int, false)));
        assert!(int(Int, true).is_lossless(&int(BigInt, false)));
        assert!(int(SmallInt, true).is_lossless(&int(SmallInt, true)));
    }

    #[test]
    fn integer_into_characters() {
        assert!(int(IntegerKind::Int, false).is_lossless(&varchar(11, "latin1")));
        assert!(!int(IntegerKind::Int, false).is_lossless(&varchar(10, "latin1")));
        assert!(int(IntegerKind::Int, true).is_lossless(&varchar(10, "latin1")));
        assert!(int(IntegerKind::BigInt, false)
            .is_lossless(&text(UnsizedStringKind::TinyText, "ascii")));
        assert!(!int(IntegerKind::TinyInt, false).is_lossless(&DataType::sized(
            SizedStringKind::VarBinary,
            100
        )));
    }

    #[test]
    fn decimal_digits() {
        assert!(decimal(10, 2).is_lossless(&decimal(12, 4)));
        assert!(!decimal(10, 2).is_lossless(&decimal(10, 3)));
        assert!(!decimal(10, 2).is_lossless(&decimal(12, 1)));
        assert!(decimal(5, 2).is_lossless(&varchar(7, "ascii")));
        assert!(!decimal(5, 2).is_lossless(&varchar(6, "ascii")));
        assert!(!decimal(5, 2).is_lossless(&DataType::FloatingPoint {
            kind: FloatKind::Double,
            precision: None,
            unsigned: false,
            zerofill: false,
        }));
    }

    #[test]
    fn floating_point() {
        let float = DataType::FloatingPoint {
            kind: FloatKind::Float,
            precision: None,
            unsigned: false,
            zerofill: false,
        };
        let double = DataType::FloatingPoint {
            kind: FloatKind::Double,
            precision: None,
            unsigned: false,
            zerofill: false,
        };
        assert!(float.is_lossless(&double));
        assert!(!double.is_lossless(&float));
        assert!(!float.is_lossless(&varchar(255, "utf8mb4")));
    }

    #[test]
    fn string_capacity() {
        use UnsizedStringKind::*;
        assert!(varchar(10, "latin1").is_lossless(&varchar(20, "latin1")));
        assert!(!varchar(20, "latin1").is_lossless(&varchar(10, "latin1")));
        assert!(varchar(10, "latin1").is_lossless(&varchar(10, "utf8mb4")));
        assert!(!varchar(10, "utf8mb4").is_lossless(&varchar(10, "latin1")));
        assert!(!varchar(10, "utf8mb4").is_lossless(&varchar(40, "utf8mb3")));
        assert!(varchar(255, "latin1").is_lossless(&text(TinyText, "latin1")));
        assert!(!varchar(255, "utf8mb4").is_lossless(&text(TinyText, "utf8mb4")));
        assert!(varchar(16_383, "utf8mb4").is_lossless(&text(Text, "utf8mb4")));
        assert!(text(Text, "utf8mb4").is_lossless(&text(MediumText, "utf8mb4")));
        assert!(!text(MediumText, "utf8mb4").is_lossless(&text(Text, "utf8mb4")));
        assert!(!text(Text, "utf8mb4").is_lossless(&text(Blob, "utf8mb4")));
    }

    #[test]
    fn padded_targets_are_lossy() {
        let char10 = DataType::SizedString {
            kind: SizedStringKind::Char,
            length: 10,
            encoding: Encoding::new(Some("latin1"), None),
        };
        assert!(char10.is_lossless(&varchar(10, "latin1")));
        assert!(!varchar(10, "latin1").is_lossless(&char10));
    }

    #[test]
    fn enumerations() {
        let ab = enumeration(EnumerationKind::Enum, &["a", "b"]);
        let abc = enumeration(EnumerationKind::Enum, &["a", "b", "c"]);
        assert!(ab.is_lossless(&abc));
        assert!(!abc.is_lossless(&ab));

        let set_abc = enumeration(EnumerationKind::Set, &["a", "b", "c"]);
        assert!(ab.is_lossless(&set_abc));
        assert!(!set_abc.is_lossless(&abc));
    }

    #[test]
    fn temporal_precision() {
        let ts = |fsp| DataType::Temporal {
            kind: TemporalKind::DateTime,
            fsp,
        };
        assert!(ts(0).is_lossless(&ts(3)));
        assert!(!ts(6).is_lossless(&ts(3)));
        assert!(!ts(0).is_lossless(&DataType::Temporal {
            kind: TemporalKind::Timestamp,
            fsp: 0,
        }));
    }
}
