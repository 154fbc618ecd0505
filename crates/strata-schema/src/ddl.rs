//! CREATE TABLE / CREATE INDEX generation.

use crate::{Dialect, Index, TableDescriptor};

/// Generate the statements that create `table` as `table_name`.
///
/// MySQL gets a single statement with inline index clauses and the starting
/// `AUTO_INCREMENT` value as a table option. Postgres has no inline indexes,
/// so each index follows as its own `CREATE INDEX`, and the starting value
/// goes on the identity column.
pub fn create_table_sql(
    dialect: Dialect,
    table_name: &str,
    table: &TableDescriptor,
    auto_increment: i64,
) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(key) = table.key() {
        parts.push(match dialect {
            Dialect::MySql => format!("{key} BIGINT NOT NULL AUTO_INCREMENT"),
            Dialect::Postgres => format!(
                "{key} BIGINT GENERATED BY DEFAULT AS IDENTITY (START WITH {})",
                auto_increment.max(1)
            ),
        });
    }

    for (name, column) in &table.columns {
        parts.push(format!("{} {}", name, column.sql_type(dialect)));
    }

    if let Some(key) = table.key() {
        parts.push(format!("PRIMARY KEY({key})"));
    }

    let mut statements = Vec::with_capacity(1 + table.indexes.len());

    match dialect {
        Dialect::MySql => {
            for (name, index) in &table.indexes {
                let unique = if index.unique { "UNIQUE " } else { "" };
                parts.push(format!("{}INDEX {} ({})", unique, name, index.to_sql()));
            }

            let options = if table.key().is_some() {
                format!(" AUTO_INCREMENT = {auto_increment}")
            } else {
                String::new()
            };

            statements.push(format!(
                "CREATE TABLE IF NOT EXISTS {} ({}){};",
                table_name,
                parts.join(", "),
                options
            ));
        }
        Dialect::Postgres => {
            statements.push(format!(
                "CREATE TABLE IF NOT EXISTS {} ({});",
                table_name,
                parts.join(", ")
            ));

            for (name, index) in &table.indexes {
                statements.push(create_index_sql(dialect, table_name, name, index));
            }
        }
    }

    statements
}

/// Generate `CREATE [UNIQUE] INDEX IF NOT EXISTS` for one index.
pub fn create_index_sql(dialect: Dialect, table_name: &str, name: &str, index: &Index) -> String {
    let unique = if index.unique { "UNIQUE " } else { "" };
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({});",
        unique,
        index_name(dialect, table_name, name),
        table_name,
        index.to_sql()
    )
}

/// Physical name of an index.
///
/// Postgres index names share one namespace per schema, so they are
/// qualified with the table name there.
pub fn index_name(dialect: Dialect, table_name: &str, name: &str) -> String {
    match dialect {
        Dialect::MySql => name.to_string(),
        Dialect::Postgres => format!("{table_name}_{name}"),
    }
}
