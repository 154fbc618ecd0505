//! Additive table diffing.
//!
//! Compares the descriptor an application wants against the one last applied
//! and lists the changes that bring the live table forward. Diffs only ever
//! add or retype: a column or index that exists in the stored descriptor but
//! not in the desired one produces nothing.
//!
//! Changes come out columns first, then indexes, each group sorted by name:
//!
//! ```text
//! user:
//!   + email: String(128)
//!   ~ age: Int32 -> Int64
//!   + UNIQUE INDEX email (email ASC)
//! ```

use crate::{Column, Dialect, Index, TableDescriptor, create_index_sql};
use std::fmt;

/// Changes for a single table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDiff {
    /// Logical table name (without prefix).
    pub table: String,
    pub changes: Vec<Change>,
}

impl TableDiff {
    /// Compute the changes that take `stored` to `desired`.
    pub fn between(desired: &TableDescriptor, stored: &TableDescriptor) -> Self {
        let mut changes = Vec::new();

        for (name, column) in &desired.columns {
            match stored.columns.get(name) {
                None => changes.push(Change::AddColumn {
                    name: name.clone(),
                    column: *column,
                }),
                Some(current) if current != column => changes.push(Change::AlterColumn {
                    name: name.clone(),
                    from: *current,
                    to: *column,
                }),
                Some(_) => {}
            }
        }

        for (name, index) in &desired.indexes {
            if !stored.indexes.contains_key(name) {
                changes.push(Change::AddIndex {
                    name: name.clone(),
                    index: index.clone(),
                });
            }
        }

        Self {
            table: desired.name.clone(),
            changes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// One DDL statement per change, in order.
    pub fn to_sql(&self, dialect: Dialect, table_name: &str) -> Vec<String> {
        self.changes
            .iter()
            .map(|change| change.to_sql(dialect, table_name))
            .collect()
    }
}

impl fmt::Display for TableDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "{}: up to date", self.table);
        }
        writeln!(f, "{}:", self.table)?;
        for change in &self.changes {
            writeln!(f, "  {change}")?;
        }
        Ok(())
    }
}

/// A single additive schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Add a column the table does not have yet.
    AddColumn { name: String, column: Column },
    /// Retype or widen an existing column.
    AlterColumn {
        name: String,
        from: Column,
        to: Column,
    },
    /// Add an index the table does not have yet.
    AddIndex { name: String, index: Index },
}

impl Change {
    /// Generate the SQL statement for this change against `table_name`.
    pub fn to_sql(&self, dialect: Dialect, table_name: &str) -> String {
        match self {
            Change::AddColumn { name, column } => format!(
                "ALTER TABLE {} ADD COLUMN {} {};",
                table_name,
                name,
                column.sql_type(dialect)
            ),
            Change::AlterColumn { name, to, .. } => match dialect {
                Dialect::MySql => format!(
                    "ALTER TABLE {} CHANGE {} {} {};",
                    table_name,
                    name,
                    name,
                    to.sql_type(dialect)
                ),
                Dialect::Postgres => {
                    let ty = to.sql_type(dialect);
                    format!(
                        "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{};",
                        table_name, name, ty, name, ty
                    )
                }
            },
            Change::AddIndex { name, index } => create_index_sql(dialect, table_name, name, index),
        }
    }

    /// Record this change in `table`, as if its DDL had been applied.
    pub fn apply(&self, table: &mut TableDescriptor) {
        match self {
            Change::AddColumn { name, column } | Change::AlterColumn { name, to: column, .. } => {
                table.columns.insert(name.clone(), *column);
            }
            Change::AddIndex { name, index } => {
                table.indexes.insert(name.clone(), index.clone());
            }
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::AddColumn { name, column } => write!(f, "+ {name}: {column}"),
            Change::AlterColumn { name, from, to } => write!(f, "~ {name}: {from} -> {to}"),
            Change::AddIndex { name, index } => {
                let unique = if index.unique { "UNIQUE " } else { "" };
                write!(f, "+ {}INDEX {} ({})", unique, name, index.to_sql())
            }
        }
    }
}
