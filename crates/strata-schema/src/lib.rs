//! Table descriptors for strata.
//!
//! A [`TableDescriptor`] is the in-process truth about one application table:
//! its name, an optional auto-increment key column, and the columns and
//! indexes keyed by lower-cased name. This crate renders descriptors to DDL
//! for a [`Dialect`] and computes the additive [`TableDiff`] between the
//! descriptor an application wants and the one last applied.
//!
//! ## Example
//!
//! ```
//! use strata_schema::{Column, Dialect, Index, TableDescriptor};
//!
//! let user = TableDescriptor::new("user")
//!     .with_key("id")
//!     .column("name", Column::string(45))
//!     .index("name", Index::new("name"));
//!
//! let sql = strata_schema::create_table_sql(Dialect::MySql, "app_user", &user, 1000);
//! assert_eq!(
//!     sql,
//!     vec!["CREATE TABLE IF NOT EXISTS app_user (id BIGINT NOT NULL AUTO_INCREMENT, \
//!           name VARCHAR(45), PRIMARY KEY(id), INDEX name (name ASC)) AUTO_INCREMENT = 1000;"]
//! );
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

mod ddl;
mod diff;

pub use ddl::{create_index_sql, create_table_sql, index_name};
pub use diff::{Change, TableDiff};

/// SQL flavour used when rendering DDL and placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// MySQL / MariaDB (`?` placeholders, `AUTO_INCREMENT`).
    #[default]
    MySql,
    /// PostgreSQL (`$n` placeholders, identity columns).
    Postgres,
}

impl Dialect {
    /// Placeholder for the parameter at 1-based position `n`.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Dialect::MySql => "?".to_string(),
            Dialect::Postgres => format!("${n}"),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::MySql => write!(f, "mysql"),
            Dialect::Postgres => write!(f, "postgres"),
        }
    }
}

/// The storage kind of a column.
///
/// Snapshots store the kind as its numeric code. Unknown codes decode as
/// [`ColumnKind::String`], which renders as `VARCHAR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ColumnKind {
    String = 1,
    Int32 = 2,
    Int64 = 3,
    Double = 4,
    Boolean = 5,
    Text = 6,
    LongText = 7,
}

impl From<u8> for ColumnKind {
    fn from(code: u8) -> Self {
        match code {
            2 => ColumnKind::Int32,
            3 => ColumnKind::Int64,
            4 => ColumnKind::Double,
            5 => ColumnKind::Boolean,
            6 => ColumnKind::Text,
            7 => ColumnKind::LongText,
            _ => ColumnKind::String,
        }
    }
}

impl From<ColumnKind> for u8 {
    fn from(kind: ColumnKind) -> Self {
        kind as u8
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::String => "String",
            ColumnKind::Int32 => "Int32",
            ColumnKind::Int64 => "Int64",
            ColumnKind::Double => "Double",
            ColumnKind::Boolean => "Boolean",
            ColumnKind::Text => "Text",
            ColumnKind::LongText => "LongText",
        };
        f.write_str(name)
    }
}

/// A column's SQL type and width.
///
/// A `length` of zero selects the kind's default width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub kind: ColumnKind,
    #[serde(default)]
    pub length: u32,
}

impl Column {
    pub fn new(kind: ColumnKind, length: u32) -> Self {
        Self { kind, length }
    }

    pub fn string(length: u32) -> Self {
        Self::new(ColumnKind::String, length)
    }

    pub fn int32() -> Self {
        Self::new(ColumnKind::Int32, 0)
    }

    pub fn int64() -> Self {
        Self::new(ColumnKind::Int64, 0)
    }

    pub fn double() -> Self {
        Self::new(ColumnKind::Double, 0)
    }

    pub fn boolean() -> Self {
        Self::new(ColumnKind::Boolean, 0)
    }

    pub fn text() -> Self {
        Self::new(ColumnKind::Text, 0)
    }

    pub fn long_text() -> Self {
        Self::new(ColumnKind::LongText, 0)
    }

    /// Set an explicit width.
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    /// Render the SQL type fragment for this column.
    ///
    /// Booleans have no native storage and always render as a 1-width
    /// integer type.
    pub fn sql_type(&self, dialect: Dialect) -> String {
        let sized = |base: &str| {
            if self.length == 0 {
                base.to_string()
            } else {
                format!("{}({})", base, self.length)
            }
        };

        match dialect {
            Dialect::MySql => match self.kind {
                ColumnKind::Int32 => sized("INT"),
                ColumnKind::Int64 => sized("BIGINT"),
                ColumnKind::Double => sized("DOUBLE"),
                ColumnKind::Boolean => "INT(1)".to_string(),
                ColumnKind::Text => sized("TEXT"),
                ColumnKind::LongText => sized("LONGTEXT"),
                ColumnKind::String => varchar(self.length),
            },
            // Postgres has no display widths on numeric types and a single
            // unbounded TEXT.
            Dialect::Postgres => match self.kind {
                ColumnKind::Int32 => "INTEGER".to_string(),
                ColumnKind::Int64 => "BIGINT".to_string(),
                ColumnKind::Double => "DOUBLE PRECISION".to_string(),
                ColumnKind::Boolean => "SMALLINT".to_string(),
                ColumnKind::Text | ColumnKind::LongText => "TEXT".to_string(),
                ColumnKind::String => varchar(self.length),
            },
        }
    }
}

fn varchar(length: u32) -> String {
    if length == 0 {
        "VARCHAR(45)".to_string()
    } else {
        format!("VARCHAR({length})")
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.length == 0 {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}({})", self.kind, self.length)
        }
    }
}

/// Sort direction of an indexed field.
///
/// Snapshots store the direction as its numeric code; anything other than
/// `2` decodes as ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum SortOrder {
    #[default]
    Asc = 1,
    Desc = 2,
}

impl SortOrder {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl From<u8> for SortOrder {
    fn from(code: u8) -> Self {
        match code {
            2 => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

impl From<SortOrder> for u8 {
    fn from(order: SortOrder) -> Self {
        order as u8
    }
}

/// A single-field index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default)]
    pub unique: bool,
}

impl Index {
    /// A non-unique ascending index on `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into().to_lowercase(),
            order: SortOrder::Asc,
            unique: false,
        }
    }

    /// A unique ascending index on `field`.
    pub fn unique(field: impl Into<String>) -> Self {
        Self {
            unique: true,
            ..Self::new(field)
        }
    }

    pub fn desc(mut self) -> Self {
        self.order = SortOrder::Desc;
        self
    }

    /// The `field direction` fragment used inside index clauses.
    pub fn to_sql(&self) -> String {
        format!("{} {}", self.field, self.order.to_sql())
    }
}

/// In-process description of one table.
///
/// Column and index maps are keyed by lower-cased name; the same name is the
/// contract used to match record fields. A non-empty `key_column` is an
/// auto-incrementing 64-bit primary key and never appears in `columns`.
///
/// Maps are ordered so every rendering of a descriptor is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    #[serde(default)]
    pub key_column: String,
    #[serde(default)]
    pub columns: BTreeMap<String, Column>,
    #[serde(default)]
    pub indexes: BTreeMap<String, Index>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the auto-increment key column, removing it from `columns` if present.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into().to_lowercase();
        self.columns.remove(&key);
        self.key_column = key;
        self
    }

    /// Add a column. A column named like the key column is ignored.
    pub fn column(mut self, name: impl Into<String>, column: Column) -> Self {
        let name = name.into().to_lowercase();
        if name != self.key_column {
            self.columns.insert(name, column);
        }
        self
    }

    pub fn index(mut self, name: impl Into<String>, index: Index) -> Self {
        self.indexes.insert(name.into().to_lowercase(), index);
        self
    }

    /// The key column, if the table has one.
    pub fn key(&self) -> Option<&str> {
        if self.key_column.is_empty() {
            None
        } else {
            Some(&self.key_column)
        }
    }

    /// Whether `name` is the key column, ignoring case.
    pub fn is_key(&self, name: &str) -> bool {
        !self.key_column.is_empty() && self.key_column.eq_ignore_ascii_case(name)
    }

    /// Whether `name` is a non-key column, ignoring case.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
            || self.columns.keys().any(|c| c.eq_ignore_ascii_case(name))
    }

    /// Lower-case the key column and every column and index name, as the
    /// builders do.
    pub fn normalized(self) -> Self {
        let key_column = self.key_column.to_lowercase();
        let columns = self
            .columns
            .into_iter()
            .map(|(name, column)| (name.to_lowercase(), column))
            .filter(|(name, _)| *name != key_column)
            .collect();
        let indexes = self
            .indexes
            .into_iter()
            .map(|(name, index)| (name.to_lowercase(), index))
            .collect();
        Self {
            name: self.name,
            key_column,
            columns,
            indexes,
        }
    }

    /// Physical table name under `prefix`.
    pub fn qualified_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.name)
    }

    /// Encode as the JSON snapshot stored in the schema registry.
    pub fn to_snapshot(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(SnapshotError::Encode)
    }

    /// Decode a JSON snapshot produced by [`TableDescriptor::to_snapshot`].
    ///
    /// Names are normalized the same way the builders normalize them.
    pub fn from_snapshot(snapshot: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str::<Self>(snapshot)
            .map(Self::normalized)
            .map_err(SnapshotError::Decode)
    }

    /// Changes needed to bring a table described by `stored` up to `self`.
    pub fn diff(&self, stored: &TableDescriptor) -> TableDiff {
        TableDiff::between(self, stored)
    }
}

/// Failure to encode or decode a descriptor snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to encode schema snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode schema snapshot: {0}")]
    Decode(#[source] serde_json::Error),
}
