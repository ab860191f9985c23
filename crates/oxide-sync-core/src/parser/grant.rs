//! `GRANT` / `REVOKE` grammar.

use super::error::ParseError;
use super::parser::Parser;
use crate::ast::{
    merge_privilege, GrantDescription, GrantKind, ObjectType, PrivilegeMap, PrivilegeScope,
    UserHost, GRANT_OPTION,
};
use crate::lexer::{Keyword, TokenKind};

/// Static privilege names, longest spellings first.
const PRIVILEGES: &[&[&str]] = &[
    &["CREATE", "TEMPORARY", "TABLES"],
    &["ALL", "PRIVILEGES"],
    &["ALTER", "ROUTINE"],
    &["CREATE", "ROUTINE"],
    &["CREATE", "TABLESPACE"],
    &["CREATE", "USER"],
    &["CREATE", "VIEW"],
    &["CREATE", "ROLE"],
    &["DROP", "ROLE"],
    &["GRANT", "OPTION"],
    &["LOCK", "TABLES"],
    &["REPLICATION", "CLIENT"],
    &["REPLICATION", "SLAVE"],
    &["SHOW", "DATABASES"],
    &["SHOW", "VIEW"],
    &["ALL"],
    &["ALTER"],
    &["CREATE"],
    &["DELETE"],
    &["DROP"],
    &["EVENT"],
    &["EXECUTE"],
    &["FILE"],
    &["INDEX"],
    &["INSERT"],
    &["PROCESS"],
    &["PROXY"],
    &["REFERENCES"],
    &["RELOAD"],
    &["SELECT"],
    &["SHUTDOWN"],
    &["SUPER"],
    &["TRIGGER"],
    &["UPDATE"],
    &["USAGE"],
];

impl Parser<'_> {
    /// Parses `GRANT privs ON level TO users [WITH GRANT OPTION]` or
    /// `REVOKE privs ON level FROM users`, one descriptor per account.
    pub(super) fn parse_grant(
        &mut self,
        kind: GrantKind,
    ) -> Result<Vec<GrantDescription>, ParseError> {
        match kind {
            GrantKind::Grant => self.expect_keyword(Keyword::Grant)?,
            GrantKind::Revoke => self.expect_keyword(Keyword::Revoke)?,
        }

        let mut privileges = PrivilegeMap::new();
        loop {
            let (name, scope) = self.parse_privilege()?;
            merge_privilege(&mut privileges, &name, scope);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.expect_keyword(Keyword::On)?;
        let object_type = if self.eat_keyword(Keyword::Table) {
            Some(ObjectType::Table)
        } else if self.eat_word("FUNCTION") {
            Some(ObjectType::Function)
        } else if self.eat_word("PROCEDURE") {
            Some(ObjectType::Procedure)
        } else {
            None
        };
        let (database, table) = self.parse_privilege_level()?;

        match kind {
            GrantKind::Grant => self.expect_keyword(Keyword::To)?,
            GrantKind::Revoke => self.expect_keyword(Keyword::From)?,
        }
        let mut users = Vec::new();
        loop {
            users.push(self.parse_user_host()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        if kind == GrantKind::Grant && self.eat_keyword(Keyword::With) {
            if !self.eat_words(&["GRANT", "OPTION"]) {
                return Err(self.error("GRANT OPTION"));
            }
            privileges.insert(GRANT_OPTION.to_string(), PrivilegeScope::Table);
        }
        self.expect_end()?;

        Ok(users
            .into_iter()
            .map(|user| GrantDescription {
                kind,
                user,
                object_type,
                database: database.clone(),
                table: table.clone(),
                privileges: privileges.clone(),
            })
            .collect())
    }

    /// Parses one privilege with an optional column list.
    fn parse_privilege(&mut self) -> Result<(String, PrivilegeScope), ParseError> {
        let name = if let Some(spelling) = PRIVILEGES.iter().find(|spelling| {
            spelling
                .iter()
                .enumerate()
                .all(|(offset, word)| self.word_at(offset, word))
        }) {
            self.eat_words(spelling);
            let name = spelling.join(" ");
            if name == "ALL" {
                String::from("ALL PRIVILEGES")
            } else {
                name
            }
        } else {
            // Dynamic privileges such as BACKUP_ADMIN.
            match self.current_word() {
                Some(word) if word.contains('_') => {
                    self.advance();
                    word
                }
                _ => return Err(self.error("privilege type")),
            }
        };

        let scope = if self.eat(&TokenKind::LeftParen) {
            let mut columns = Vec::new();
            loop {
                columns.push(self.expect_identifier("column name")?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RightParen, "`,` or `)` in the column list")?;
            PrivilegeScope::columns(columns)
        } else {
            PrivilegeScope::Table
        };
        Ok((name, scope))
    }

    /// Parses `*`, `*.*`, `db.*`, `db.table` or `table`.
    fn parse_privilege_level(&mut self) -> Result<(Option<String>, String), ParseError> {
        let first = self.parse_level_part()?;
        if self.eat(&TokenKind::Dot) {
            let second = self.parse_level_part()?;
            Ok((Some(first), second))
        } else {
            Ok((None, first))
        }
    }

    fn parse_level_part(&mut self) -> Result<String, ParseError> {
        if self.eat(&TokenKind::Star) {
            Ok(String::from("*"))
        } else {
            self.expect_identifier("database or table name")
        }
    }

    /// Parses `user[@host]`; the host defaults to `%`.
    pub(super) fn parse_user_host(&mut self) -> Result<UserHost, ParseError> {
        let user = self.parse_account_part("user name")?;
        let host = if self.eat(&TokenKind::At) {
            self.parse_account_part("host name")?
        } else {
            String::from("%")
        };
        Ok(UserHost::new(user, host))
    }

    fn parse_account_part(&mut self, what: &str) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::String(value) | TokenKind::QuotedIdentifier(value) | TokenKind::Word(value) => {
                let value = value.clone();
                self.advance();
                Ok(value)
            }
            _ => Err(self.error(what)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ParsedStatement;
    use crate::parser::ParseOptions;

    fn parse_grants(sql: &str) -> Vec<GrantDescription> {
        match Parser::new(sql, ParseOptions::default()).parse_statement() {
            ParsedStatement::Grant(grants) | ParsedStatement::Revoke(grants) => grants,
            other => panic!("{sql}: {other:?}"),
        }
    }

    #[test]
    fn database_level_grant() {
        let grants = parse_grants("GRANT SELECT, INSERT ON `shop`.* TO 'app'@'10.0.%'");
        assert_eq!(grants.len(), 1);
        let grant = &grants[0];
        assert_eq!(grant.kind, GrantKind::Grant);
        assert_eq!(grant.database.as_deref(), Some("shop"));
        assert!(grant.is_database_level());
        assert_eq!(grant.user, UserHost::new("app", "10.0.%"));
        assert_eq!(
            grant.privileges.keys().collect::<Vec<_>>(),
            vec!["INSERT", "SELECT"]
        );
    }

    #[test]
    fn column_privileges_merge() {
        let grants = parse_grants("GRANT SELECT (a), SELECT (B), UPDATE ON shop.orders TO app");
        let grant = &grants[0];
        assert_eq!(
            grant.privileges["SELECT"],
            PrivilegeScope::columns(["a", "b"])
        );
        assert_eq!(grant.privileges["UPDATE"], PrivilegeScope::Table);
        assert_eq!(grant.user.host, "%");
    }

    #[test]
    fn all_and_grant_option() {
        let grants = parse_grants("GRANT ALL ON shop.* TO 'admin'@'localhost' WITH GRANT OPTION");
        let names: Vec<&String> = grants[0].privileges.keys().collect();
        assert_eq!(names, vec!["ALL PRIVILEGES", "GRANT OPTION"]);
    }

    #[test]
    fn multi_word_and_dynamic_privileges() {
        let grants = parse_grants(
            "GRANT CREATE TEMPORARY TABLES, LOCK TABLES, BACKUP_ADMIN ON *.* TO a@localhost",
        );
        let names: Vec<&String> = grants[0].privileges.keys().collect();
        assert_eq!(names, vec!["BACKUP_ADMIN", "CREATE TEMPORARY TABLES", "LOCK TABLES"]);
        assert_eq!(grants[0].database.as_deref(), Some("*"));
    }

    #[test]
    fn one_descriptor_per_grantee() {
        let grants = parse_grants("REVOKE DELETE ON TABLE shop.orders FROM 'a'@'%', 'b'@'%'");
        assert_eq!(grants.len(), 2);
        assert_eq!(grants[1].user.user, "b");
        assert_eq!(grants[0].kind, GrantKind::Revoke);
        assert_eq!(grants[0].object_type, Some(ObjectType::Table));
        assert_eq!(grants[0].key(), "revoke:a@%:shop.orders");
    }

    #[test]
    fn bare_table_has_no_database() {
        let grants = parse_grants("GRANT SELECT ON orders TO app");
        assert_eq!(grants[0].database, None);
        assert_eq!(grants[0].clone().in_database("shop").key(), "grant:app@%:shop.orders");
    }

    #[test]
    fn rejects_unknown_privilege() {
        let parsed = Parser::new("GRANT FLY ON shop.* TO app", ParseOptions::default())
            .parse_statement();
        let ParsedStatement::Invalid { error, .. } = parsed else {
            panic!("expected a parse error");
        };
        assert_eq!(error.expected, "privilege type");
        assert_eq!(error.remainder[0], "FLY");
    }
}
