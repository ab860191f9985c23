//! Declarative schema and privilege reconciliation for MySQL.
//!
//! `oxide-sync` compares a set of SQL files describing the desired state of
//! one database (tables, accounts, privileges) with what the server
//! actually holds, and computes the statements that close the gap:
//! - Tables are diffed column by column, key by key and option by option,
//!   including reordered columns
//! - Destructive statements carry a guard query and run only when it
//!   proves that no existing row would be affected
//! - Grants are compared per account and table, honouring database-level
//!   privileges and column lists
//!
//! # Architecture
//!
//! - **Parser** - `oxide-sync-core` turns statements into descriptions
//! - **Introspector** - Reads the live descriptions through an [`Executor`]
//! - **Differs** - Compare tables, permissions and users
//! - **Guards** - Decide whether destructive statements are safe
//! - **Reconciler / Applier** - Assemble the ordered result, then execute it
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_sync::prelude::*;
//!
//! let pool = sqlx::MySqlPool::connect("mysql://root@localhost/shop").await?;
//! let executor = MySqlExecutor::new(pool);
//! let sources = SourceLoader::new().load_all(&["schema/shop.sql"])?;
//!
//! let mut reconciliation = Reconciler::new(&executor, "shop").reconcile(&sources).await?;
//! let report = Applier::new(&executor).apply(&mut reconciliation).await;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show what would change
//! oxide-sync --database shop diff schema/shop.sql
//!
//! # Same, as JSON
//! oxide-sync --database shop diff --json schema/shop.sql
//!
//! # Apply, printing the statements instead of executing them
//! oxide-sync --database shop apply --dry-run schema/shop.sql
//! ```
//!
//! [`Executor`]: executor::Executor

pub mod diff;
pub mod error;
pub mod executor;
pub mod guard;
pub mod introspect;
pub mod orchestrator;
pub mod source;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::diff::{
        Change, ChangeKind, PermissionChange, PermissionDiff, TableDiff, UserChange, UserDiff,
    };
    pub use crate::error::{Result, SyncError};
    pub use crate::executor::{Executor, MySqlExecutor, Row};
    pub use crate::guard::{GuardState, GuardedStatement, Operation};
    pub use crate::introspect::{Introspector, LiveGrants};
    pub use crate::orchestrator::{
        Applier, ApplyReport, Reconciler, Reconciliation, ResultItem, Source, SyncOptions,
        TablePresence,
    };
    pub use crate::source::SourceLoader;
    pub use oxide_sync_core::RealPolicy;
}
