//! MySQL / MariaDB backend over `mysql_async`.

use crate::connection::{BoxFuture, Connection, ExecResult};
use crate::query::{Row, Value};
use crate::{Dialect, Result};
use mysql_async::Params;
use mysql_async::prelude::{Queryable, ToValue};
use std::sync::Arc;

impl ToValue for Value {
    fn to_value(&self) -> mysql_async::Value {
        match self {
            Value::Null => mysql_async::Value::NULL,
            Value::Bool(v) => i64::from(*v).to_value(),
            Value::I16(v) => v.to_value(),
            Value::I32(v) => v.to_value(),
            Value::I64(v) => v.to_value(),
            Value::F64(v) => v.to_value(),
            Value::String(v) => v.to_value(),
        }
    }
}

fn params(values: &[Value]) -> Params {
    if values.is_empty() {
        Params::Empty
    } else {
        Params::Positional(values.iter().map(ToValue::to_value).collect())
    }
}

fn from_mysql_value(column: &str, value: &mysql_async::Value) -> Result<Value> {
    use mysql_async::Value as My;

    Ok(match value {
        My::NULL => Value::Null,
        My::Bytes(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        My::Int(v) => Value::I64(*v),
        My::UInt(v) => match i64::try_from(*v) {
            Ok(v) => Value::I64(v),
            Err(_) => Value::String(v.to_string()),
        },
        My::Float(v) => Value::F64(f64::from(*v)),
        My::Double(v) => Value::F64(*v),
        My::Date(..) => {
            return Err(crate::Error::TypeMismatch {
                column: column.to_string(),
                actual: "DATE".to_string(),
            });
        }
        My::Time(..) => {
            return Err(crate::Error::TypeMismatch {
                column: column.to_string(),
                actual: "TIME".to_string(),
            });
        }
    })
}

fn from_mysql_rows(rows: Vec<mysql_async::Row>) -> Result<Vec<Row>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };

    let columns: Arc<[String]> = first
        .columns_ref()
        .iter()
        .map(|c| c.name_str().into_owned())
        .collect();

    rows.iter()
        .map(|row| {
            let values = columns
                .iter()
                .enumerate()
                .map(|(idx, name)| match row.as_ref(idx) {
                    Some(value) => from_mysql_value(name, value),
                    None => Ok(Value::Null),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Row::new(columns.clone(), values))
        })
        .collect()
}

/// Each call checks a connection out of the pool for the duration of one
/// statement. Statements without parameters go over the text protocol, since
/// not every DDL statement can be prepared.
impl Connection for mysql_async::Pool {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        values: &'a [Value],
    ) -> BoxFuture<'a, Result<ExecResult>> {
        Box::pin(async move {
            let mut conn = self.get_conn().await?;
            if values.is_empty() {
                conn.query_drop(sql).await?;
            } else {
                conn.exec_drop(sql, params(values)).await?;
            }
            Ok(ExecResult {
                rows_affected: conn.affected_rows(),
                last_insert_id: conn.last_insert_id(),
            })
        })
    }

    fn query<'a>(&'a self, sql: &'a str, values: &'a [Value]) -> BoxFuture<'a, Result<Vec<Row>>> {
        Box::pin(async move {
            let mut conn = self.get_conn().await?;
            let rows: Vec<mysql_async::Row> = if values.is_empty() {
                conn.query(sql).await?
            } else {
                conn.exec(sql, params(values)).await?
            };
            from_mysql_rows(rows)
        })
    }
}
