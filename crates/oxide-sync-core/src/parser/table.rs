//! `CREATE TABLE` grammar.

use super::error::ParseError;
use super::parser::Parser;
use crate::ast::{
    ColumnDescription, DefaultValue, IndexColumn, IndexDescription, IndexKind, IndexOrder,
    Position, TableDescription, TableName, TableOptionSpec, TableOptions, TABLE_OPTIONS,
};
use crate::lexer::{Keyword, TokenKind};
use crate::types::{normalize_charset, normalize_collation};

impl Parser<'_> {
    /// Parses `CREATE [TEMPORARY] TABLE [IF NOT EXISTS] name (...) [options]`.
    pub(super) fn parse_create_table(&mut self) -> Result<TableDescription, ParseError> {
        self.expect_keyword(Keyword::Create)?;
        let temporary = self.eat_keyword(Keyword::Temporary);
        self.expect_keyword(Keyword::Table)?;
        let if_not_exists = if self.eat_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Not)?;
            self.expect_keyword(Keyword::Exists)?;
            true
        } else {
            false
        };

        let mut table = TableDescription::new(self.parse_table_name()?);
        table.temporary = temporary;
        table.if_not_exists = if_not_exists;

        self.expect(&TokenKind::LeftParen, "`(` opening the definition list")?;
        loop {
            self.parse_create_definition(&mut table)?;
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen, "`,` or `)` after a definition")?;

        table.options = self.parse_table_options()?;
        self.expect_end()?;
        self.finish_table(&mut table)?;
        Ok(table)
    }

    /// Parses `[database.]table`.
    pub(super) fn parse_table_name(&mut self) -> Result<TableName, ParseError> {
        let first = self.expect_identifier("table name")?;
        if self.eat(&TokenKind::Dot) {
            let name = self.expect_identifier("table name")?;
            Ok(TableName::qualified(first, name))
        } else {
            Ok(TableName::new(first))
        }
    }

    fn parse_create_definition(&mut self, table: &mut TableDescription) -> Result<(), ParseError> {
        let start = self.current().span.start;

        if self.eat_keyword(Keyword::Constraint) {
            let symbol = if self.at_constraint_body() {
                None
            } else {
                Some(self.expect_identifier("constraint name")?)
            };
            if self.check_keyword(Keyword::Primary) || self.check_keyword(Keyword::Unique) {
                let index = self.parse_index(symbol)?;
                table.indexes.push(index);
            } else if self.check_keyword(Keyword::Foreign) || self.check_keyword(Keyword::Check) {
                let text = self.parse_until_separator(start)?;
                table.constraints.push(text);
            } else {
                return Err(self.error("PRIMARY KEY, UNIQUE, FOREIGN KEY or CHECK"));
            }
            return Ok(());
        }

        match self.current().as_keyword() {
            Some(
                Keyword::Primary
                | Keyword::Unique
                | Keyword::Key
                | Keyword::Index
                | Keyword::Fulltext
                | Keyword::Spatial,
            ) => {
                let index = self.parse_index(None)?;
                table.indexes.push(index);
            }
            Some(Keyword::Foreign | Keyword::Check) => {
                let text = self.parse_until_separator(start)?;
                table.constraints.push(text);
            }
            _ => self.parse_column(table)?,
        }
        Ok(())
    }

    fn at_constraint_body(&self) -> bool {
        [
            Keyword::Primary,
            Keyword::Unique,
            Keyword::Foreign,
            Keyword::Check,
        ]
        .into_iter()
        .any(|keyword| self.check_keyword(keyword))
    }

    fn parse_column(&mut self, table: &mut TableDescription) -> Result<(), ParseError> {
        let name = self.expect_identifier("column name or key definition")?;
        let data_type = self.parse_data_type()?;
        let mut column = ColumnDescription::new(name, data_type);
        let mut charset = None;
        let mut collation = None;

        while !(self.check(&TokenKind::Comma) || self.check(&TokenKind::RightParen) || self.at_end())
        {
            if self.eat_keyword(Keyword::Not) {
                self.expect_keyword(Keyword::Null)?;
                column.nullable = false;
            } else if self.eat_keyword(Keyword::Null) {
                column.nullable = true;
            } else if self.eat_keyword(Keyword::Default) {
                column.default = Some(self.parse_default_value()?);
            } else if self.eat_keyword(Keyword::AutoIncrement) {
                column.auto_increment = true;
            } else if self.eat_keyword(Keyword::Comment) {
                column.comment = Some(self.expect_string("comment string")?);
            } else if self.eat_keyword(Keyword::On) {
                self.expect_keyword(Keyword::Update)?;
                let value = self.parse_default_value()?;
                if !matches!(value, DefaultValue::CurrentTimestamp(_)) {
                    return Err(self.invalid("ON UPDATE only accepts CURRENT_TIMESTAMP", 1));
                }
                column.on_update = Some(value);
            } else if self.eat_keyword(Keyword::Character) {
                self.expect_keyword(Keyword::Set)?;
                charset = Some(normalize_charset(&self.expect_value("charset name")?));
            } else if self.eat_keyword(Keyword::Charset) {
                charset = Some(normalize_charset(&self.expect_value("charset name")?));
            } else if self.eat_keyword(Keyword::Collate) {
                collation = Some(normalize_collation(&self.expect_value("collation name")?));
            } else if self.eat_keyword(Keyword::Primary) {
                self.expect_keyword(Keyword::Key)?;
                table.indexes.push(inline_key(IndexKind::Primary, &column.name));
            } else if self.eat_keyword(Keyword::Key) {
                table.indexes.push(inline_key(IndexKind::Primary, &column.name));
            } else if self.eat_keyword(Keyword::Unique) {
                self.eat_keyword(Keyword::Key);
                table.indexes.push(inline_key(IndexKind::Unique, &column.name));
            } else if self.eat_keyword(Keyword::Check) {
                let expression = self.parse_balanced()?;
                table.constraints.push(format!("CHECK ({expression})"));
            } else if self.eat_word("COLUMN_FORMAT") || self.eat_word("STORAGE") {
                self.expect_value("column format or storage")?;
            } else if self.eat_word("VISIBLE") || self.eat_word("INVISIBLE") {
            } else {
                return Err(self.error("column attribute"));
            }
        }

        if charset.is_some() || collation.is_some() {
            let Some(encoding) = column.data_type.encoding_mut() else {
                return Err(self.invalid(
                    format!("{} does not take a character set", column.data_type.name()),
                    1,
                ));
            };
            if charset.is_some() {
                encoding.charset = charset;
            }
            if collation.is_some() {
                encoding.collation = collation;
            }
        }

        table.columns.push(column);
        Ok(())
    }

    /// Parses a column default (also used for `ON UPDATE`).
    fn parse_default_value(&mut self) -> Result<DefaultValue, ParseError> {
        let kind = self.current().kind.clone();
        match kind {
            TokenKind::String(value) => {
                self.advance();
                Ok(DefaultValue::Literal(value))
            }
            TokenKind::Number(number) => {
                self.advance();
                Ok(DefaultValue::Literal(number))
            }
            TokenKind::Other(sign @ ('-' | '+')) => {
                self.advance();
                let TokenKind::Number(number) = self.current().kind.clone() else {
                    return Err(self.error("number"));
                };
                self.advance();
                if sign == '-' {
                    Ok(DefaultValue::Literal(format!("-{number}")))
                } else {
                    Ok(DefaultValue::Literal(number))
                }
            }
            TokenKind::Literal(text) => {
                self.advance();
                Ok(DefaultValue::Raw(text))
            }
            TokenKind::LeftParen => Ok(DefaultValue::Expression(self.parse_balanced()?)),
            TokenKind::Word(word) => {
                let upper = word.to_ascii_uppercase();
                match upper.as_str() {
                    "NULL" => {
                        self.advance();
                        Ok(DefaultValue::Null)
                    }
                    "TRUE" | "FALSE" => {
                        self.advance();
                        let value = if upper == "TRUE" { "1" } else { "0" };
                        Ok(DefaultValue::Literal(value.to_string()))
                    }
                    "CURRENT_TIMESTAMP" | "NOW" | "LOCALTIME" | "LOCALTIMESTAMP" => {
                        self.advance();
                        let mut fsp = 0;
                        if self.eat(&TokenKind::LeftParen) {
                            if self.check(&TokenKind::Number(String::new())) {
                                fsp = self.expect_number("fractional seconds precision")?;
                            }
                            self.expect(&TokenKind::RightParen, "`)`")?;
                        }
                        Ok(DefaultValue::CurrentTimestamp(fsp))
                    }
                    // Charset introducer: _utf8mb4'text'
                    _ if upper.starts_with('_')
                        && matches!(self.peek(1).kind, TokenKind::String(_)) =>
                    {
                        self.advance();
                        Ok(DefaultValue::Literal(self.expect_string("string")?))
                    }
                    _ => Err(self.error("default value")),
                }
            }
            _ => Err(self.error("default value")),
        }
    }

    /// Parses a key definition; `constraint_name` comes from a preceding
    /// `CONSTRAINT symbol`.
    fn parse_index(&mut self, constraint_name: Option<String>) -> Result<IndexDescription, ParseError> {
        let kind = if self.eat_keyword(Keyword::Primary) {
            self.expect_keyword(Keyword::Key)?;
            IndexKind::Primary
        } else if self.eat_keyword(Keyword::Unique) {
            self.eat_key_or_index();
            IndexKind::Unique
        } else if self.eat_keyword(Keyword::Fulltext) {
            self.eat_key_or_index();
            IndexKind::Fulltext
        } else if self.eat_keyword(Keyword::Spatial) {
            self.eat_key_or_index();
            IndexKind::Spatial
        } else if self.eat_key_or_index() {
            IndexKind::Plain
        } else {
            return Err(self.error("key definition"));
        };

        let mut name = constraint_name;
        if kind != IndexKind::Primary
            && !self.check(&TokenKind::LeftParen)
            && !self.check_keyword(Keyword::Using)
        {
            name = Some(self.expect_identifier("key name")?);
        }
        if kind == IndexKind::Primary {
            name = None;
        }

        let mut index = IndexDescription::new(kind, name, Vec::new());
        if self.eat_keyword(Keyword::Using) {
            index.using = Some(self.parse_index_method()?);
        }

        self.expect(&TokenKind::LeftParen, "`(` opening the key column list")?;
        loop {
            index.columns.push(self.parse_index_column()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen, "`,` or `)` in the key column list")?;

        loop {
            if self.eat_keyword(Keyword::Using) {
                index.using = Some(self.parse_index_method()?);
            } else if self.eat_keyword(Keyword::Comment) {
                index.comment = Some(self.expect_string("comment string")?);
            } else if self.eat_word("KEY_BLOCK_SIZE") {
                self.eat(&TokenKind::Eq);
                self.expect_number("key block size")?;
            } else if self.eat_word("VISIBLE") || self.eat_word("INVISIBLE") {
            } else if self.eat_keyword(Keyword::With) {
                if !self.eat_word("PARSER") {
                    return Err(self.error("PARSER"));
                }
                self.expect_identifier("parser name")?;
            } else {
                break;
            }
        }
        Ok(index)
    }

    fn eat_key_or_index(&mut self) -> bool {
        self.eat_keyword(Keyword::Key) || self.eat_keyword(Keyword::Index)
    }

    fn parse_index_method(&mut self) -> Result<String, ParseError> {
        match self.current_word().as_deref() {
            Some(method @ ("BTREE" | "HASH")) => {
                let method = method.to_string();
                self.advance();
                Ok(method)
            }
            _ => Err(self.error("BTREE or HASH")),
        }
    }

    fn parse_index_column(&mut self) -> Result<IndexColumn, ParseError> {
        let mut column = if self.check(&TokenKind::LeftParen) {
            let mut column = IndexColumn::new(self.parse_balanced()?);
            column.expression = true;
            column
        } else {
            let mut column = IndexColumn::new(self.expect_identifier("key column")?);
            if self.check(&TokenKind::LeftParen) {
                column.prefix = Some(self.parse_parenthesized_number("prefix length")?);
            }
            column
        };
        if self.eat_keyword(Keyword::Desc) {
            column.order = IndexOrder::Desc;
        } else {
            self.eat_keyword(Keyword::Asc);
        }
        Ok(column)
    }

    /// Parses table options until the end of the statement.
    fn parse_table_options(&mut self) -> Result<TableOptions, ParseError> {
        let mut options = TableOptions::new();
        loop {
            if !options.is_empty() {
                self.eat(&TokenKind::Comma);
            }
            if self.at_end() {
                return Ok(options);
            }
            let Some(spec) = self.parse_table_option_name() else {
                return Err(self.error("table option"));
            };
            self.eat(&TokenKind::Eq);
            let value = self.expect_value(&format!("value for {}", spec.name))?;
            if !spec.accepts(&value) {
                return Err(self.invalid(
                    format!("invalid value {value} for table option {}", spec.name),
                    1,
                ));
            }
            let value = match spec.name {
                "CHARSET" => normalize_charset(&value),
                "COLLATE" => normalize_collation(&value),
                _ => value,
            };
            if options.insert(spec.name, value).is_some() {
                return Err(self.invalid(format!("duplicate table option {}", spec.name), 1));
            }
        }
    }

    /// Consumes the longest option spelling at the cursor.
    fn parse_table_option_name(&mut self) -> Option<&'static TableOptionSpec> {
        let (spec, length) = TABLE_OPTIONS
            .iter()
            .flat_map(|spec| spec.spellings.iter().map(move |spelling| (spec, *spelling)))
            .filter(|(_, spelling)| {
                spelling
                    .iter()
                    .enumerate()
                    .all(|(offset, word)| self.word_at(offset, word))
            })
            .map(|(spec, spelling)| (spec, spelling.len()))
            .max_by_key(|(_, length)| *length)?;
        for _ in 0..length {
            self.advance();
        }
        Some(spec)
    }

    /// Assigns positions and checks cross-definition rules.
    fn finish_table(&self, table: &mut TableDescription) -> Result<(), ParseError> {
        for (ordinal, column) in table.columns.iter().enumerate() {
            if table.columns[..ordinal]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&column.name))
            {
                return Err(self.invalid(format!("duplicate column name {}", column.name), 0));
            }
        }
        let mut previous: Option<String> = None;
        for (ordinal, column) in table.columns.iter_mut().enumerate() {
            column.ordinal = ordinal;
            column.position = match previous.replace(column.name.clone()) {
                Some(name) => Position::After(name),
                None => Position::First,
            };
        }

        let primary_keys = table
            .indexes
            .iter()
            .filter(|index| index.kind == IndexKind::Primary)
            .count();
        if primary_keys > 1 {
            return Err(self.invalid("multiple primary keys defined", 0));
        }

        for index in &table.indexes {
            for part in index.columns.iter().filter(|part| !part.expression) {
                if table.column(&part.name).is_none() {
                    return Err(self.invalid(format!("key column {} does not exist", part.name), 0));
                }
            }
        }

        let primary: Vec<String> = table
            .primary_key()
            .map(|pk| pk.columns.iter().map(|part| part.name.clone()).collect())
            .unwrap_or_default();
        for column in &mut table.columns {
            if primary.iter().any(|name| name.eq_ignore_ascii_case(&column.name)) {
                column.nullable = false;
            }
        }
        Ok(())
    }
}

fn inline_key(kind: IndexKind, column: &str) -> IndexDescription {
    IndexDescription::new(kind, None, vec![IndexColumn::new(column)])
}
