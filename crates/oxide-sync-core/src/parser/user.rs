//! `CREATE USER` / `ALTER USER` grammar.
//!
//! Only the account names and the `REQUIRE` clause are kept; credentials
//! and account options are consumed and dropped.

use std::collections::BTreeMap;

use super::error::ParseError;
use super::parser::Parser;
use crate::ast::{TlsOption, TlsRequirement, UserDescription, UserStatementKind};
use crate::lexer::{Keyword, TokenKind};

impl Parser<'_> {
    pub(super) fn parse_user(&mut self) -> Result<Vec<UserDescription>, ParseError> {
        let kind = if self.eat_keyword(Keyword::Create) {
            UserStatementKind::Create
        } else {
            self.expect_keyword(Keyword::Alter)?;
            UserStatementKind::Alter
        };
        self.expect_keyword(Keyword::User)?;

        let conditional = if self.eat_keyword(Keyword::If) {
            if kind == UserStatementKind::Create {
                self.expect_keyword(Keyword::Not)?;
            }
            self.expect_keyword(Keyword::Exists)?;
            true
        } else {
            false
        };

        let mut accounts = Vec::new();
        loop {
            accounts.push(self.parse_user_host()?);
            self.skip_auth_option()?;
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        if self.eat_keyword(Keyword::Default) {
            if !self.eat_word("ROLE") {
                return Err(self.error("ROLE"));
            }
            loop {
                self.parse_user_host()?;
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }

        let tls = if self.eat_keyword(Keyword::Require) {
            Some(self.parse_tls_requirement()?)
        } else {
            None
        };

        // Resource limits, password and lock options, COMMENT, ATTRIBUTE.
        while !self.at_end() {
            self.advance();
        }
        self.expect_end()?;

        Ok(accounts
            .into_iter()
            .map(|user| UserDescription {
                kind,
                user,
                conditional,
                tls: tls.clone(),
            })
            .collect())
    }

    /// Skips `IDENTIFIED BY ...` / `IDENTIFIED WITH plugin [BY|AS ...]`.
    fn skip_auth_option(&mut self) -> Result<(), ParseError> {
        if !self.eat_keyword(Keyword::Identified) {
            return Ok(());
        }
        if self.eat_word("BY") {
            self.skip_password()?;
            if self.eat_keyword(Keyword::Replace) {
                self.expect_string("current password")?;
            }
            self.eat_words(&["RETAIN", "CURRENT", "PASSWORD"]);
        } else if self.eat_keyword(Keyword::With) {
            self.expect_value("authentication plugin")?;
            if self.eat_word("BY") {
                self.skip_password()?;
            } else if self.eat_keyword(Keyword::As) {
                self.expect_string("authentication string")?;
            }
        } else {
            return Err(self.error("BY or WITH"));
        }
        Ok(())
    }

    fn skip_password(&mut self) -> Result<(), ParseError> {
        if self.eat_words(&["RANDOM", "PASSWORD"]) {
            return Ok(());
        }
        self.eat_word("PASSWORD");
        self.expect_string("password")?;
        Ok(())
    }

    /// Parses `NONE`, `SSL`, `X509`, or `option 'value' [[AND] option 'value']...`.
    fn parse_tls_requirement(&mut self) -> Result<TlsRequirement, ParseError> {
        if self.eat_keyword(Keyword::None) {
            return Ok(TlsRequirement::None);
        }
        if self.eat_keyword(Keyword::Ssl) {
            return Ok(TlsRequirement::Ssl);
        }
        if self.eat_keyword(Keyword::X509) {
            return Ok(TlsRequirement::X509);
        }

        let mut options = BTreeMap::new();
        loop {
            let option = if self.eat_keyword(Keyword::Subject) {
                TlsOption::Subject
            } else if self.eat_keyword(Keyword::Issuer) {
                TlsOption::Issuer
            } else if self.eat_keyword(Keyword::Cipher) {
                TlsOption::Cipher
            } else if options.is_empty() {
                return Err(self.error("NONE, SSL, X509, SUBJECT, ISSUER or CIPHER"));
            } else {
                return Err(self.error("SUBJECT, ISSUER or CIPHER after AND"));
            };
            let value = self.expect_string("quoted value")?;
            if options.insert(option, value).is_some() {
                return Err(self.invalid(
                    format!("duplicate REQUIRE option {}", option.as_str()),
                    2,
                ));
            }
            if self.eat_keyword(Keyword::And) {
                continue;
            }
            if !(self.check_keyword(Keyword::Subject)
                || self.check_keyword(Keyword::Issuer)
                || self.check_keyword(Keyword::Cipher))
            {
                break;
            }
        }
        Ok(TlsRequirement::Specified(options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ParsedStatement, UserHost};
    use crate::parser::ParseOptions;

    fn parse_users(sql: &str) -> Vec<UserDescription> {
        match Parser::new(sql, ParseOptions::default()).parse_statement() {
            ParsedStatement::User(users) => users,
            other => panic!("{sql}: {other:?}"),
        }
    }

    #[test]
    fn create_with_credentials_and_require() {
        let users = parse_users(
            "CREATE USER IF NOT EXISTS 'app'@'%' IDENTIFIED BY 'secret' \
             REQUIRE SUBJECT '/CN=app' AND ISSUER '/CN=ca' WITH MAX_QUERIES_PER_HOUR 10",
        );
        assert_eq!(users.len(), 1);
        let user = &users[0];
        assert_eq!(user.kind, UserStatementKind::Create);
        assert!(user.conditional);
        assert_eq!(user.user, UserHost::new("app", "%"));
        let Some(TlsRequirement::Specified(options)) = &user.tls else {
            panic!("expected REQUIRE options");
        };
        assert_eq!(options[&TlsOption::Subject], "/CN=app");
        assert_eq!(options[&TlsOption::Issuer], "/CN=ca");
    }

    #[test]
    fn plugin_authentication_is_skipped() {
        let users = parse_users(
            "CREATE USER 'a'@'localhost' IDENTIFIED WITH caching_sha2_password AS 'hash', \
             'b'@'localhost' IDENTIFIED WITH 'mysql_native_password' BY 'pw' REQUIRE SSL",
        );
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].user.user, "b");
        assert_eq!(users[1].tls, Some(TlsRequirement::Ssl));
    }

    #[test]
    fn alter_user() {
        let users = parse_users("ALTER USER IF EXISTS app@'10.%' REQUIRE NONE ACCOUNT UNLOCK");
        assert_eq!(users[0].kind, UserStatementKind::Alter);
        assert!(users[0].conditional);
        assert_eq!(users[0].tls, Some(TlsRequirement::None));

        let users = parse_users("ALTER USER app REQUIRE CIPHER 'AES' ISSUER 'x'");
        assert!(matches!(&users[0].tls, Some(TlsRequirement::Specified(o)) if o.len() == 2));
    }

    #[test]
    fn missing_require_clause() {
        let users = parse_users("CREATE USER 'app'@'%'");
        assert_eq!(users[0].tls, None);
        assert_eq!(users[0].effective_tls(), TlsRequirement::None);
    }

    #[test]
    fn duplicate_require_option() {
        let parsed = Parser::new(
            "ALTER USER app REQUIRE CIPHER 'a' AND CIPHER 'b'",
            ParseOptions::default(),
        )
        .parse_statement();
        let ParsedStatement::Invalid { error, .. } = parsed else {
            panic!("expected a parse error");
        };
        assert_eq!(error.message, "duplicate REQUIRE option CIPHER");
    }
}
