//! Column type grammar.
//!
//! Synonyms are resolved here, so the rest of the crate only ever sees
//! canonical [`DataType`] values.

use super::error::ParseError;
use super::parser::Parser;
use crate::lexer::TokenKind;
use crate::types::{
    DataType, Encoding, EnumerationKind, FloatKind, IntegerKind, RealPolicy, SizedStringKind,
    TemporalKind, UnsizedStringKind, OTHER_TYPES,
};

/// Charset implied by `NATIONAL`/`NCHAR`.
const NATIONAL_CHARSET: &str = "utf8mb3";

const MAX_DECIMAL_PRECISION: u32 = 65;
const MAX_DECIMAL_SCALE: u32 = 30;
const MAX_FSP: u32 = 6;

impl Parser<'_> {
    /// Parses a type name with its arguments and numeric modifiers.
    pub(super) fn parse_data_type(&mut self) -> Result<DataType, ParseError> {
        let Some(word) = self.current_word() else {
            return Err(self.error("data type"));
        };
        self.advance();

        let data_type = match word.as_str() {
            "TINYINT" | "INT1" => self.parse_integer(IntegerKind::TinyInt)?,
            "SMALLINT" | "INT2" => self.parse_integer(IntegerKind::SmallInt)?,
            "MEDIUMINT" | "INT3" | "MIDDLEINT" => self.parse_integer(IntegerKind::MediumInt)?,
            "INT" | "INTEGER" | "INT4" => self.parse_integer(IntegerKind::Int)?,
            "BIGINT" | "INT8" => self.parse_integer(IntegerKind::BigInt)?,
            "BOOL" | "BOOLEAN" => DataType::Integer {
                kind: IntegerKind::TinyInt,
                display_width: Some(1),
                unsigned: false,
                zerofill: false,
            },
            "DECIMAL" | "DEC" | "NUMERIC" | "FIXED" => self.parse_decimal()?,
            "FLOAT" => self.parse_float()?,
            "FLOAT4" => self.parse_floating(FloatKind::Float)?,
            "FLOAT8" => self.parse_floating(FloatKind::Double)?,
            "DOUBLE" => {
                self.eat_word("PRECISION");
                self.parse_floating(FloatKind::Double)?
            }
            "REAL" => match self.options.real_policy {
                RealPolicy::Double => self.parse_floating(FloatKind::Double)?,
                RealPolicy::Float => self.parse_floating(FloatKind::Float)?,
            },
            "CHAR" | "CHARACTER" => {
                if self.eat_word("VARYING") {
                    self.parse_sized(SizedStringKind::VarChar, None)?
                } else {
                    self.parse_sized(SizedStringKind::Char, None)?
                }
            }
            "NCHAR" => {
                if self.eat_word("VARCHAR") || self.eat_word("VARYING") {
                    self.parse_sized(SizedStringKind::VarChar, Some(NATIONAL_CHARSET))?
                } else {
                    self.parse_sized(SizedStringKind::Char, Some(NATIONAL_CHARSET))?
                }
            }
            "NVARCHAR" => self.parse_sized(SizedStringKind::VarChar, Some(NATIONAL_CHARSET))?,
            "NATIONAL" => {
                if self.eat_word("VARCHAR") {
                    self.parse_sized(SizedStringKind::VarChar, Some(NATIONAL_CHARSET))?
                } else if self.eat_word("CHAR") || self.eat_word("CHARACTER") {
                    if self.eat_word("VARYING") {
                        self.parse_sized(SizedStringKind::VarChar, Some(NATIONAL_CHARSET))?
                    } else {
                        self.parse_sized(SizedStringKind::Char, Some(NATIONAL_CHARSET))?
                    }
                } else {
                    return Err(self.error("CHAR or VARCHAR after NATIONAL"));
                }
            }
            "VARCHAR" | "VARCHARACTER" => self.parse_sized(SizedStringKind::VarChar, None)?,
            "BINARY" => self.parse_sized(SizedStringKind::Binary, None)?,
            "VARBINARY" => self.parse_sized(SizedStringKind::VarBinary, None)?,
            "TINYTEXT" => unsized_string(UnsizedStringKind::TinyText),
            "TEXT" => self.parse_sized_blob(false)?,
            "MEDIUMTEXT" => unsized_string(UnsizedStringKind::MediumText),
            "LONGTEXT" => unsized_string(UnsizedStringKind::LongText),
            "TINYBLOB" => unsized_string(UnsizedStringKind::TinyBlob),
            "BLOB" => self.parse_sized_blob(true)?,
            "MEDIUMBLOB" => unsized_string(UnsizedStringKind::MediumBlob),
            "LONGBLOB" => unsized_string(UnsizedStringKind::LongBlob),
            "LONG" => {
                if self.eat_word("VARBINARY") {
                    unsized_string(UnsizedStringKind::MediumBlob)
                } else {
                    self.eat_word("VARCHAR");
                    unsized_string(UnsizedStringKind::MediumText)
                }
            }
            "ENUM" => self.parse_enumeration(EnumerationKind::Enum)?,
            "SET" => self.parse_enumeration(EnumerationKind::Set)?,
            "TIME" => self.parse_temporal(TemporalKind::Time)?,
            "DATETIME" => self.parse_temporal(TemporalKind::DateTime)?,
            "TIMESTAMP" => self.parse_temporal(TemporalKind::Timestamp)?,
            "BIT" => DataType::GenericSized {
                name: String::from("BIT"),
                length: self.parse_optional_length("bit count")?,
            },
            "YEAR" => {
                // YEAR(4) is the only display width the server still accepts.
                self.parse_optional_length("year width")?;
                DataType::Other {
                    name: String::from("YEAR"),
                }
            }
            other if OTHER_TYPES.contains(&other) => DataType::Other {
                name: other.to_string(),
            },
            _ => return Err(self.invalid(format!("unknown data type {word}"), 1)),
        };

        if data_type.is_numeric() {
            return Ok(self.parse_numeric_modifiers(data_type));
        }
        Ok(data_type)
    }

    fn parse_optional_length(&mut self, what: &str) -> Result<Option<u32>, ParseError> {
        if self.check(&TokenKind::LeftParen) {
            self.parse_parenthesized_number(what).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Parses optional `(p)` or `(p,s)`.
    fn parse_optional_decimals(&mut self) -> Result<Option<(u32, Option<u32>)>, ParseError> {
        if !self.eat(&TokenKind::LeftParen) {
            return Ok(None);
        }
        let precision = self.expect_number("precision")?;
        let scale = if self.eat(&TokenKind::Comma) {
            Some(self.expect_number("scale")?)
        } else {
            None
        };
        self.expect(&TokenKind::RightParen, "`)` closing the precision")?;
        Ok(Some((precision, scale)))
    }

    fn parse_integer(&mut self, kind: IntegerKind) -> Result<DataType, ParseError> {
        Ok(DataType::Integer {
            kind,
            display_width: self.parse_optional_length("display width")?,
            unsigned: false,
            zerofill: false,
        })
    }

    fn parse_decimal(&mut self) -> Result<DataType, ParseError> {
        let (precision, scale) = match self.parse_optional_decimals()? {
            None => (10, 0),
            Some((precision, scale)) => (precision, scale.unwrap_or(0)),
        };
        if precision == 0 || precision > MAX_DECIMAL_PRECISION {
            return Err(self.invalid(format!("decimal precision {precision} out of range"), 1));
        }
        if scale > MAX_DECIMAL_SCALE || scale > precision {
            return Err(self.invalid(format!("decimal scale {scale} out of range"), 1));
        }
        Ok(DataType::FixedPoint {
            precision,
            scale,
            unsigned: false,
            zerofill: false,
        })
    }

    /// `FLOAT`, `FLOAT(p)` (which may become `DOUBLE`) or `FLOAT(p,s)`.
    fn parse_float(&mut self) -> Result<DataType, ParseError> {
        let (kind, precision) = match self.parse_optional_decimals()? {
            None => (FloatKind::Float, None),
            Some((p, Some(s))) => (FloatKind::Float, Some((p, s))),
            Some((p, None)) if p <= 24 => (FloatKind::Float, None),
            Some((p, None)) if p <= 53 => (FloatKind::Double, None),
            Some((p, None)) => {
                return Err(self.invalid(format!("float precision {p} out of range"), 1));
            }
        };
        Ok(floating(kind, precision))
    }

    fn parse_floating(&mut self, kind: FloatKind) -> Result<DataType, ParseError> {
        match self.parse_optional_decimals()? {
            None => Ok(floating(kind, None)),
            Some((p, Some(s))) => Ok(floating(kind, Some((p, s)))),
            Some((_, None)) => Err(self.invalid("expected precision and scale", 1)),
        }
    }

    /// `UNSIGNED`, `SIGNED` and `ZEROFILL` in any order.
    fn parse_numeric_modifiers(&mut self, mut data_type: DataType) -> DataType {
        loop {
            let (sign, fill) = if self.eat_word("UNSIGNED") {
                (Some(true), false)
            } else if self.eat_word("SIGNED") {
                (Some(false), false)
            } else if self.eat_word("ZEROFILL") {
                (None, true)
            } else {
                return data_type;
            };
            if let DataType::Integer {
                unsigned, zerofill, ..
            }
            | DataType::FixedPoint {
                unsigned, zerofill, ..
            }
            | DataType::FloatingPoint {
                unsigned, zerofill, ..
            } = &mut data_type
            {
                if let Some(sign) = sign {
                    *unsigned = sign;
                }
                *zerofill |= fill;
            }
        }
    }

    /// `CHAR`-like types; `CHAR` and `BINARY` default to length 1.
    fn parse_sized(
        &mut self,
        kind: SizedStringKind,
        charset: Option<&str>,
    ) -> Result<DataType, ParseError> {
        let length = match self.parse_optional_length("length")? {
            Some(length) => length,
            None if kind.is_padded() => 1,
            None => return Err(self.error("`(` with the length")),
        };
        Ok(DataType::SizedString {
            kind,
            length,
            encoding: Encoding::new(charset, None),
        })
    }

    /// `TEXT[(n)]` / `BLOB[(n)]`: a length picks the smallest fitting kind.
    fn parse_sized_blob(&mut self, binary: bool) -> Result<DataType, ParseError> {
        let kind = match self.parse_optional_length("length")? {
            Some(length) => UnsizedStringKind::fitting(u64::from(length), binary),
            None if binary => UnsizedStringKind::Blob,
            None => UnsizedStringKind::Text,
        };
        Ok(unsized_string(kind))
    }

    fn parse_enumeration(&mut self, kind: EnumerationKind) -> Result<DataType, ParseError> {
        self.expect(&TokenKind::LeftParen, "`(` opening the value list")?;
        let mut values = Vec::new();
        loop {
            values.push(self.expect_string("quoted value")?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen, "`,` or `)` in the value list")?;
        Ok(DataType::Enumeration {
            kind,
            values,
            encoding: Encoding::default(),
        })
    }

    fn parse_temporal(&mut self, kind: TemporalKind) -> Result<DataType, ParseError> {
        let fsp = self.parse_optional_length("fractional seconds precision")?.unwrap_or(0);
        if fsp > MAX_FSP {
            return Err(self.invalid(format!("fractional seconds precision {fsp} out of range"), 1));
        }
        Ok(DataType::Temporal { kind, fsp })
    }
}

fn unsized_string(kind: UnsizedStringKind) -> DataType {
    DataType::UnsizedString {
        kind,
        encoding: Encoding::default(),
    }
}

const fn floating(kind: FloatKind, precision: Option<(u32, u32)>) -> DataType {
    DataType::FloatingPoint {
        kind,
        precision,
        unsigned: false,
        zerofill: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseOptions;

    fn parse_type(sql: &str) -> DataType {
        Parser::new(sql, ParseOptions::default())
            .parse_data_type()
            .unwrap_or_else(|e| panic!("{sql}: {e}"))
    }

    fn parse_type_err(sql: &str) -> ParseError {
        Parser::new(sql, ParseOptions::default())
            .parse_data_type()
            .expect_err(sql)
    }

    #[test]
    fn integer_synonyms() {
        assert_eq!(parse_type("INTEGER"), DataType::integer(IntegerKind::Int));
        assert_eq!(parse_type("int4"), DataType::integer(IntegerKind::Int));
        assert_eq!(parse_type("MIDDLEINT"), DataType::integer(IntegerKind::MediumInt));
        assert_eq!(parse_type("BOOLEAN").to_string(), "TINYINT(1)");
        assert_eq!(parse_type("int(11) unsigned zerofill").to_string(), "INT(11) UNSIGNED ZEROFILL");
    }

    #[test]
    fn numeric_synonyms() {
        assert_eq!(parse_type("NUMERIC").to_string(), "DECIMAL(10,0)");
        assert_eq!(parse_type("DEC(5)").to_string(), "DECIMAL(5,0)");
        assert_eq!(parse_type("FIXED(8,2) UNSIGNED").to_string(), "DECIMAL(8,2) UNSIGNED");
        assert_eq!(parse_type("REAL").to_string(), "DOUBLE");
        assert_eq!(parse_type("DOUBLE PRECISION").to_string(), "DOUBLE");
        assert_eq!(parse_type("FLOAT(30)").to_string(), "DOUBLE");
        assert_eq!(parse_type("FLOAT(10)").to_string(), "FLOAT");
        assert_eq!(parse_type("FLOAT(7,4)").to_string(), "FLOAT(7,4)");

        let float_mode = ParseOptions {
            real_policy: RealPolicy::Float,
        };
        let real = Parser::new("REAL", float_mode).parse_data_type().unwrap();
        assert_eq!(real.to_string(), "FLOAT");
    }

    #[test]
    fn string_synonyms() {
        assert_eq!(parse_type("CHARACTER VARYING(20)").to_string(), "VARCHAR(20)");
        assert_eq!(parse_type("CHAR").to_string(), "CHAR(1)");
        assert_eq!(
            parse_type("NATIONAL VARCHAR(5)").to_string(),
            "VARCHAR(5) CHARACTER SET utf8mb3"
        );
        assert_eq!(parse_type("NCHAR(2)").to_string(), "CHAR(2) CHARACTER SET utf8mb3");
        assert_eq!(parse_type("LONG VARCHAR").to_string(), "MEDIUMTEXT");
        assert_eq!(parse_type("LONG VARBINARY").to_string(), "MEDIUMBLOB");
        assert_eq!(parse_type("TEXT(1000)").to_string(), "TEXT");
        assert_eq!(parse_type("BLOB(100)").to_string(), "TINYBLOB");
    }

    #[test]
    fn text_and_blob_kinds() {
        assert_eq!(parse_type("tinytext").to_string(), "TINYTEXT");
        assert_eq!(parse_type("MEDIUMTEXT").to_string(), "MEDIUMTEXT");
        assert_eq!(parse_type("LONGTEXT").to_string(), "LONGTEXT");
        assert_eq!(parse_type("LONGBLOB").to_string(), "LONGBLOB");
        assert_eq!(parse_type("TEXT(70000)").to_string(), "MEDIUMTEXT");
    }

    #[test]
    fn enumerations_and_temporals() {
        assert_eq!(parse_type("enum('a', 'b')").to_string(), "ENUM('a','b')");
        assert_eq!(parse_type("SET('x')").to_string(), "SET('x')");
        assert_eq!(parse_type("datetime(6)").to_string(), "DATETIME(6)");
        assert_eq!(parse_type("TIMESTAMP").to_string(), "TIMESTAMP");
        assert_eq!(parse_type("YEAR(4)").to_string(), "YEAR");
        assert_eq!(parse_type("BIT(8)").to_string(), "BIT(8)");
        assert_eq!(parse_type("json").to_string(), "JSON");
    }

    #[test]
    fn rejects_bad_types() {
        assert_eq!(parse_type_err("VARCHAR").expected, "`(` with the length");
        assert_eq!(parse_type_err("WIBBLE").message, "unknown data type WIBBLE");
        assert!(parse_type_err("DECIMAL(70,2)").message.contains("precision"));
        assert!(parse_type_err("DATETIME(7)").message.contains("fractional"));
        assert!(parse_type_err("ENUM()").message.starts_with("expected quoted value"));
    }
}
