//! Structural comparison of declared and live state.
//!
//! Every comparison produces [`Change`] values: the live (`before`) and
//! declared (`after`) sides of one object, either of which may be absent.

mod permission;
mod table;
mod user;

pub use permission::{PermissionChange, PermissionDiff};
pub use table::{ColumnChange, KeyChange, OptionChange, TableChangeKind, TableDiff};
pub use user::{UserChange, UserDiff};

use serde::Serialize;

/// What a diff entry amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Add,
    Drop,
    Modify,
    Unchanged,
}

/// Both sides of one compared object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change<T> {
    /// As found on the server.
    pub before: Option<T>,
    /// As declared in the sources.
    pub after: Option<T>,
}

impl<T> Change<T> {
    pub fn new(before: Option<T>, after: Option<T>) -> Self {
        Self { before, after }
    }

    /// Classifies the entry; `same` decides whether two present sides match.
    pub fn kind_by(&self, same: impl FnOnce(&T, &T) -> bool) -> ChangeKind {
        match (&self.before, &self.after) {
            (None, Some(_)) => ChangeKind::Add,
            (Some(_), None) => ChangeKind::Drop,
            (Some(before), Some(after)) if same(before, after) => ChangeKind::Unchanged,
            (Some(_), Some(_)) => ChangeKind::Modify,
            (None, None) => ChangeKind::Unchanged,
        }
    }
}

impl<T: PartialEq> Change<T> {
    /// Classifies the entry by plain equality.
    pub fn kind(&self) -> ChangeKind {
        self.kind_by(|a, b| a == b)
    }
}
