//! Traced database connection wrapper.
//!
//! Wraps any [`Connection`] and logs every statement via tracing.

use crate::connection::{BoxFuture, Connection, ExecResult};
use crate::query::{Row, Value};
use crate::{Dialect, Result};
use tracing::Instrument;

/// A wrapper around a database connection that logs all statements via tracing.
///
/// This is a thin wrapper that delegates to the underlying connection but adds
/// `tracing::debug_span!` around each query/execute call. It is itself a
/// [`Connection`], so it can be handed to a [`Migrator`](crate::Migrator) or a
/// [`Mapper`](crate::Mapper).
///
/// # Example
///
/// ```ignore
/// use strata::ConnectionExt;
///
/// let traced = pool.traced();
/// strata::migrate(&traced, &user, "app_", 1000).await?;
/// ```
pub struct TracedConn<'a, C: Connection + ?Sized> {
    conn: &'a C,
}

impl<'a, C: Connection + ?Sized> TracedConn<'a, C> {
    /// Create a new traced connection wrapper.
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Get the inner connection.
    pub fn inner(&self) -> &'a C {
        self.conn
    }
}

impl<C: Connection + ?Sized> Connection for TracedConn<'_, C> {
    fn dialect(&self) -> Dialect {
        Connection::dialect(self.conn)
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<ExecResult>> {
        Box::pin(async move {
            let span = tracing::debug_span!(
                "db.execute",
                sql = %sql,
                params = params.len(),
                affected = tracing::field::Empty,
            );
            let result = Connection::execute(self.conn, sql, params)
                .instrument(span.clone())
                .await?;
            span.record("affected", result.rows_affected);
            Ok(result)
        })
    }

    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, Result<Vec<Row>>> {
        Box::pin(async move {
            let span = tracing::debug_span!(
                "db.query",
                sql = %sql,
                params = params.len(),
                rows = tracing::field::Empty,
            );
            let rows = Connection::query(self.conn, sql, params)
                .instrument(span.clone())
                .await?;
            span.record("rows", rows.len());
            Ok(rows)
        })
    }
}

/// Extension trait to get a traced wrapper from a connection.
pub trait ConnectionExt: Connection {
    /// Wrap this connection in a `TracedConn` for statement logging.
    fn traced(&self) -> TracedConn<'_, Self> {
        TracedConn::new(self)
    }
}

impl<C: Connection + ?Sized> ConnectionExt for C {}
