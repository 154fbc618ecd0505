//! The minimal execution capability strata needs from a database.

use crate::query::{Row, SqlParam, Value, from_pg_rows};
use crate::{Dialect, Result};
use std::future::Future;
use std::pin::Pin;
use tokio_postgres::types::ToSql;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Generated key of the last inserted row, where the driver reports one.
    pub last_insert_id: Option<u64>,
}

/// Trait for database connections that can execute parameterized statements.
///
/// Placeholders in `sql` follow [`Connection::dialect`]. Implemented for
/// `tokio_postgres::Client`, `deadpool_postgres::Object` and
/// `deadpool_postgres::Pool`, and for `mysql_async::Pool` with the `mysql`
/// feature.
pub trait Connection: Send + Sync {
    /// SQL flavour this connection speaks.
    fn dialect(&self) -> Dialect;

    /// Execute a statement, returning the number of rows affected.
    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<ExecResult>>;

    /// Execute a query, returning all rows.
    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, Result<Vec<Row>>>;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn dialect(&self) -> Dialect {
        Connection::dialect(&**self)
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<ExecResult>> {
        Connection::execute(&**self, sql, params)
    }

    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, Result<Vec<Row>>> {
        Connection::query(&**self, sql, params)
    }
}

async fn pg_execute(
    client: &tokio_postgres::Client,
    sql: &str,
    params: &[Value],
) -> Result<ExecResult> {
    let params: Vec<SqlParam<'_>> = params.iter().map(SqlParam).collect();
    let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
    let rows_affected = client.execute(sql, &refs).await?;
    Ok(ExecResult {
        rows_affected,
        last_insert_id: None,
    })
}

async fn pg_query(
    client: &tokio_postgres::Client,
    sql: &str,
    params: &[Value],
) -> Result<Vec<Row>> {
    let params: Vec<SqlParam<'_>> = params.iter().map(SqlParam).collect();
    let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
    let rows = client.query(sql, &refs).await?;
    from_pg_rows(&rows)
}

impl Connection for tokio_postgres::Client {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<ExecResult>> {
        Box::pin(pg_execute(self, sql, params))
    }

    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, Result<Vec<Row>>> {
        Box::pin(pg_query(self, sql, params))
    }
}

impl Connection for deadpool_postgres::Object {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<ExecResult>> {
        // Deref to the underlying Client to avoid recursion
        use std::ops::Deref;
        let client: &tokio_postgres::Client = self.deref();
        Box::pin(pg_execute(client, sql, params))
    }

    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, Result<Vec<Row>>> {
        use std::ops::Deref;
        let client: &tokio_postgres::Client = self.deref();
        Box::pin(pg_query(client, sql, params))
    }
}

/// Each call checks a connection out of the pool for the duration of one
/// statement.
impl Connection for deadpool_postgres::Pool {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<ExecResult>> {
        Box::pin(async move {
            let conn = self.get().await?;
            Connection::execute(&conn, sql, params).await
        })
    }

    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, Result<Vec<Row>>> {
        Box::pin(async move {
            let conn = self.get().await?;
            Connection::query(&conn, sql, params).await
        })
    }
}
