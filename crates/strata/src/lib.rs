//! strata - additive schema synchronization and record mapping.
//!
//! strata keeps application tables in step with in-process
//! [`TableDescriptor`]s and moves records in and out of them without
//! per-entity SQL.
//!
//! - The [`Migrator`] stores the last-applied descriptor of every table in a
//!   registry table (`__scheme`), creates tables it has never seen and
//!   applies the additive diff to the rest. Nothing is ever dropped.
//! - The [`Mapper`] builds INSERT and UPDATE statements from a record's
//!   bound fields and writes generated keys back.
//! - The [`Scanner`] fills records from result rows, matching columns to
//!   fields by name.
//!
//! Everything runs over the small [`Connection`] trait, implemented for
//! tokio-postgres / deadpool-postgres and, with the `mysql` feature, for
//! `mysql_async`.
//!
//! ## Example
//!
//! ```ignore
//! use strata::{Column, Index, Mapper, TableDescriptor};
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! strata::record!(User { id, name });
//!
//! let user_table = TableDescriptor::new("user")
//!     .with_key("id")
//!     .column("name", Column::string(45))
//!     .index("name", Index::new("name"));
//!
//! let pool = strata::pool::connect_postgres("postgres://localhost/app")?;
//! strata::registry::init(&pool).await?;
//! strata::migrate(&pool, &user_table, "app_", 1000).await?;
//!
//! let mapper = Mapper::new(&pool, "app_");
//! let mut user = User { id: 0, name: "alice".into() };
//! mapper.insert(&user_table, &mut user).await?;
//! assert!(user.id >= 1000);
//! ```

mod binder;
pub mod config;
mod connection;
mod error;
mod migrate;
#[cfg(feature = "mysql")]
mod mysql;
pub mod pool;
mod query;
mod record;
pub mod registry;
mod scan;
mod traced;

pub use binder::{Mapper, Statement, insert_statement, update_statement};
pub use config::Config;
pub use connection::{BoxFuture, Connection, ExecResult};
pub use error::{Error, Result};
pub use migrate::{MigrateOptions, MigrationOutcome, MigrationReport, Migrator, migrate};
pub use query::{ConvertError, FromValue, Row, Value};
pub use record::{Bindings, BindingsBuilder, FieldBinding, Getter, Record, Setter};
pub use scan::{ScanPlan, Scanner, scan_rows};
pub use traced::{ConnectionExt, TracedConn};

pub use strata_schema::{
    Change, Column, ColumnKind, Dialect, Index, SnapshotError, SortOrder, TableDescriptor,
    TableDiff,
};
