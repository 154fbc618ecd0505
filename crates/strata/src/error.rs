use crate::query::ConvertError;
use strata_schema::SnapshotError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("failed to create connection pool: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    #[cfg(feature = "mysql")]
    #[error("mysql error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// Error reported by a custom [`Connection`](crate::Connection) implementation.
    #[error("driver error: {0}")]
    Driver(String),

    #[error("migration of `{table}` failed at `{statement}`: {source}")]
    MigrationFailed {
        table: String,
        statement: String,
        #[source]
        source: Box<Error>,
    },

    #[error("stored schema for `{table}` is corrupt: {source}")]
    SchemaCorrupt {
        table: String,
        #[source]
        source: SnapshotError,
    },

    #[error("failed to encode schema for `{table}`: {source}")]
    Encode {
        table: String,
        #[source]
        source: SnapshotError,
    },

    #[error("table `{0}` has no key column")]
    MissingKeyColumn(String),

    #[error("insert into `{0}` did not return a generated key")]
    MissingGeneratedKey(String),

    #[error("result columns changed between rows: planned {planned:?}, got {found:?}")]
    ColumnsChanged {
        planned: Vec<String>,
        found: Vec<String>,
    },

    #[error("field `{field}`: {source}")]
    Convert {
        field: String,
        #[source]
        source: ConvertError,
    },

    #[error("column `{column}` has unsupported type {actual}")]
    TypeMismatch { column: String, actual: String },

    #[error("configuration error: {0}")]
    Config(String),
}
