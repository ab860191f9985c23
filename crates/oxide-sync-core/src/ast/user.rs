//! `CREATE USER` / `ALTER USER` descriptors.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::{quote_string, UserHost};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatementKind {
    Create,
    Alter,
}

/// Named `REQUIRE` options, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsOption {
    Subject,
    Issuer,
    Cipher,
}

impl TlsOption {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subject => "SUBJECT",
            Self::Issuer => "ISSUER",
            Self::Cipher => "CIPHER",
        }
    }
}

/// Transport requirement of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "require", content = "options", rename_all = "snake_case")]
pub enum TlsRequirement {
    #[default]
    None,
    Ssl,
    X509,
    Specified(BTreeMap<TlsOption, String>),
}

impl fmt::Display for TlsRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("NONE"),
            Self::Ssl => f.write_str("SSL"),
            Self::X509 => f.write_str("X509"),
            Self::Specified(options) => {
                let parts: Vec<String> = options
                    .iter()
                    .map(|(option, value)| format!("{} {}", option.as_str(), quote_string(value)))
                    .collect();
                f.write_str(&parts.join(" AND "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDescription {
    pub kind: UserStatementKind,
    pub user: UserHost,
    /// `IF NOT EXISTS` for create, `IF EXISTS` for alter.
    pub conditional: bool,
    /// `None` when the statement has no `REQUIRE` clause.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsRequirement>,
}

impl UserDescription {
    #[must_use]
    pub fn new(kind: UserStatementKind, user: UserHost) -> Self {
        Self {
            kind,
            user,
            conditional: false,
            tls: None,
        }
    }

    /// TLS requirement, an absent clause meaning `NONE`.
    #[must_use]
    pub fn effective_tls(&self) -> TlsRequirement {
        self.tls.clone().unwrap_or_default()
    }
}

impl fmt::Display for UserDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.conditional) {
            (UserStatementKind::Create, false) => f.write_str("CREATE USER ")?,
            (UserStatementKind::Create, true) => f.write_str("CREATE USER IF NOT EXISTS ")?,
            (UserStatementKind::Alter, false) => f.write_str("ALTER USER ")?,
            (UserStatementKind::Alter, true) => f.write_str("ALTER USER IF EXISTS ")?,
        }
        write!(f, "{}", self.user)?;
        if let Some(tls) = &self.tls {
            write!(f, " REQUIRE {tls}")?;
        }
        Ok(())
    }
}
