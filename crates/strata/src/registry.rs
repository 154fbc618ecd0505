//! The schema registry: one metadata table holding the last-applied
//! descriptor of every migrated table.
//!
//! The registry is the migrator's only source of truth about what a live
//! table looks like. The database catalog is never consulted, so DDL applied
//! outside of strata is invisible to it.

use crate::{Connection, Dialect, Error, Result, TableDescriptor, Value};

/// Name of the metadata table.
pub const REGISTRY_TABLE: &str = "__scheme";

/// One row of the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub id: i64,
    /// Physical table name (prefix included).
    pub name: String,
    /// Descriptor as of the last successful migration.
    pub table: TableDescriptor,
}

/// Statements that create the registry table if it does not exist.
///
/// `name` is indexed but not unique.
pub fn bootstrap_sql(dialect: Dialect) -> Vec<String> {
    match dialect {
        Dialect::MySql => vec![format!(
            "CREATE TABLE IF NOT EXISTS {REGISTRY_TABLE} (id BIGINT NOT NULL AUTO_INCREMENT, name VARCHAR(64) NULL, scheme TEXT NULL, PRIMARY KEY (id), INDEX name (name ASC)) AUTO_INCREMENT = 1;"
        )],
        Dialect::Postgres => vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {REGISTRY_TABLE} (id BIGINT GENERATED BY DEFAULT AS IDENTITY, name VARCHAR(64) NULL, scheme TEXT NULL, PRIMARY KEY (id));"
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {REGISTRY_TABLE}_name ON {REGISTRY_TABLE} (name ASC);"
            ),
        ],
    }
}

pub fn select_sql(dialect: Dialect) -> String {
    format!(
        "SELECT id, name, scheme FROM {REGISTRY_TABLE} WHERE name = {}",
        dialect.placeholder(1)
    )
}

pub fn insert_sql(dialect: Dialect) -> String {
    format!(
        "INSERT INTO {REGISTRY_TABLE}(name, scheme) VALUES ({}, {})",
        dialect.placeholder(1),
        dialect.placeholder(2)
    )
}

pub fn update_sql(dialect: Dialect) -> String {
    format!(
        "UPDATE {REGISTRY_TABLE} SET scheme = {} WHERE id = {}",
        dialect.placeholder(1),
        dialect.placeholder(2)
    )
}

/// Create the registry table. Execution errors are returned as-is.
pub async fn init<C: Connection + ?Sized>(conn: &C) -> Result<()> {
    for sql in bootstrap_sql(conn.dialect()) {
        conn.execute(&sql, &[]).await?;
    }
    Ok(())
}

/// Look up the entry for the physical table `name`.
///
/// If several rows share the name, the first one returned wins. A stored
/// snapshot that does not decode is [`Error::SchemaCorrupt`].
pub async fn find<C: Connection + ?Sized>(conn: &C, name: &str) -> Result<Option<RegistryEntry>> {
    let sql = select_sql(conn.dialect());
    let rows = conn.query(&sql, &[Value::from(name)]).await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let id: i64 = row.try_get("id").map_err(|source| Error::Convert {
        field: "id".to_string(),
        source,
    })?;
    let scheme: Option<String> = row.try_get("scheme").map_err(|source| Error::Convert {
        field: "scheme".to_string(),
        source,
    })?;

    let table = TableDescriptor::from_snapshot(scheme.as_deref().unwrap_or_default()).map_err(
        |source| Error::SchemaCorrupt {
            table: name.to_string(),
            source,
        },
    )?;

    Ok(Some(RegistryEntry {
        id,
        name: name.to_string(),
        table,
    }))
}

/// Register `table` under the physical name `name`.
pub async fn insert<C: Connection + ?Sized>(
    conn: &C,
    name: &str,
    table: &TableDescriptor,
) -> Result<()> {
    let snapshot = encode(name, table)?;
    let sql = insert_sql(conn.dialect());
    conn.execute(&sql, &[Value::from(name), Value::from(snapshot)])
        .await?;
    Ok(())
}

/// Overwrite the snapshot of entry `id`, registered as `name`.
pub async fn update<C: Connection + ?Sized>(
    conn: &C,
    name: &str,
    id: i64,
    table: &TableDescriptor,
) -> Result<()> {
    let snapshot = encode(name, table)?;
    let sql = update_sql(conn.dialect());
    conn.execute(&sql, &[Value::from(snapshot), Value::from(id)])
        .await?;
    Ok(())
}

fn encode(name: &str, table: &TableDescriptor) -> Result<String> {
    table.to_snapshot().map_err(|source| Error::Encode {
        table: name.to_string(),
        source,
    })
}
