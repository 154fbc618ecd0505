//! Additive schema migration driven by the registry.
//!
//! Migrating a descriptor either creates its table (no registry entry yet) or
//! applies the additive diff against the stored snapshot. Statements run one
//! at a time, in order, and the first failure stops the migrator with
//! [`Error::MigrationFailed`]. A new table is registered only once it has
//! been created. When an alter fails partway, the changes that did apply are
//! recorded first, so the next run resumes at the failed statement.
//!
//! The migrator takes no lock. Run a single migrating process per
//! deployment: two migrators racing on one table can overwrite each other's
//! registry snapshot.

use crate::registry::{self, RegistryEntry};
use crate::{Change, Connection, Error, Result, TableDescriptor};
use strata_schema::create_table_sql;
use tracing::{debug, info, warn};

/// Options shared by every table a [`Migrator`] handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateOptions {
    /// Prepended to every descriptor name to form the physical table name.
    pub table_prefix: String,
    /// Starting value of a new table's key column.
    pub initial_auto_increment: i64,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            table_prefix: String::new(),
            initial_auto_increment: 1,
        }
    }
}

/// What a migration did to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    Created,
    Altered,
    UpToDate,
}

/// Result of migrating one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Physical table name.
    pub table: String,
    pub outcome: MigrationOutcome,
    /// DDL executed, in order.
    pub statements: Vec<String>,
}

/// Applies table descriptors to a database.
pub struct Migrator<'c, C: Connection + ?Sized> {
    conn: &'c C,
    options: MigrateOptions,
}

impl<'c, C: Connection + ?Sized> Migrator<'c, C> {
    pub fn new(conn: &'c C, options: MigrateOptions) -> Self {
        Self { conn, options }
    }

    pub fn options(&self) -> &MigrateOptions {
        &self.options
    }

    /// Create the registry table if needed.
    pub async fn init(&self) -> Result<()> {
        registry::init(self.conn).await
    }

    /// Bring the table described by `table` up to date.
    pub async fn migrate(&self, table: &TableDescriptor) -> Result<MigrationReport> {
        let name = table.qualified_name(&self.options.table_prefix);

        let stored = registry::find(self.conn, &name)
            .await
            .map_err(|e| self.failed(&name, registry::select_sql(self.conn.dialect()), e))?;

        match stored {
            None => self.create(&name, table).await,
            Some(entry) => self.alter(&name, table, entry).await,
        }
    }

    /// Migrate several tables in order, stopping at the first failure.
    pub async fn migrate_all(&self, tables: &[TableDescriptor]) -> Result<Vec<MigrationReport>> {
        let mut reports = Vec::with_capacity(tables.len());
        for table in tables {
            reports.push(self.migrate(table).await?);
        }
        Ok(reports)
    }

    async fn create(&self, name: &str, table: &TableDescriptor) -> Result<MigrationReport> {
        let dialect = self.conn.dialect();
        let statements = create_table_sql(
            dialect,
            name,
            table,
            self.options.initial_auto_increment,
        );

        for sql in &statements {
            self.execute(name, sql).await?;
        }

        registry::insert(self.conn, name, table)
            .await
            .map_err(|e| self.failed(name, registry::insert_sql(dialect), e))?;

        info!(table = %name, statements = statements.len(), "created table");

        Ok(MigrationReport {
            table: name.to_string(),
            outcome: MigrationOutcome::Created,
            statements,
        })
    }

    async fn alter(
        &self,
        name: &str,
        table: &TableDescriptor,
        entry: RegistryEntry,
    ) -> Result<MigrationReport> {
        let dialect = self.conn.dialect();
        let diff = table.diff(&entry.table);

        if diff.is_empty() {
            debug!(table = %name, "table up to date");
            return Ok(MigrationReport {
                table: name.to_string(),
                outcome: MigrationOutcome::UpToDate,
                statements: Vec::new(),
            });
        }

        let statements = diff.to_sql(dialect, name);
        for (applied, sql) in statements.iter().enumerate() {
            if let Err(err) = self.execute(name, sql).await {
                self.record_partial(name, &entry, &diff.changes[..applied])
                    .await;
                return Err(err);
            }
        }

        registry::update(self.conn, name, entry.id, table)
            .await
            .map_err(|e| self.failed(name, registry::update_sql(dialect), e))?;

        info!(table = %name, changes = diff.len(), "altered table\n{diff}");

        Ok(MigrationReport {
            table: name.to_string(),
            outcome: MigrationOutcome::Altered,
            statements,
        })
    }

    async fn execute(&self, name: &str, sql: &str) -> Result<()> {
        debug!(table = %name, sql = %sql, "applying");
        self.conn
            .execute(sql, &[])
            .await
            .map_err(|e| self.failed(name, sql.to_string(), e))?;
        Ok(())
    }

    /// Register the stored descriptor plus `applied`. A failed write is
    /// logged, not returned.
    async fn record_partial(&self, name: &str, entry: &RegistryEntry, applied: &[Change]) {
        if applied.is_empty() {
            return;
        }

        let mut partial = entry.table.clone();
        for change in applied {
            change.apply(&mut partial);
        }

        match registry::update(self.conn, name, entry.id, &partial).await {
            Ok(()) => info!(
                table = %name,
                applied = applied.len(),
                "recorded partially applied migration"
            ),
            Err(e) => warn!(
                table = %name,
                error = %e,
                "failed to record partially applied migration"
            ),
        }
    }

    /// Wrap an execution error. Snapshot errors keep their own kind.
    fn failed(&self, name: &str, statement: String, source: Error) -> Error {
        match source {
            e @ (Error::SchemaCorrupt { .. } | Error::Encode { .. }) => e,
            source => Error::MigrationFailed {
                table: name.to_string(),
                statement,
                source: Box::new(source),
            },
        }
    }
}

/// Migrate a single table with the given prefix and starting key value.
pub async fn migrate<C: Connection + ?Sized>(
    conn: &C,
    table: &TableDescriptor,
    table_prefix: &str,
    initial_auto_increment: i64,
) -> Result<MigrationReport> {
    let options = MigrateOptions {
        table_prefix: table_prefix.to_string(),
        initial_auto_increment,
    };
    Migrator::new(conn, options).migrate(table).await
}
