//! Result rows and Postgres value mapping.

use super::{ConvertError, FromValue, Value};
use std::sync::Arc;
use tokio_postgres::types::{IsNull, ToSql, Type as PgTypeInfo};

/// One result row.
///
/// All rows of a result set share the same column list, so a scan plan built
/// from the first row can be checked cheaply against the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row. `values` must line up with `columns`.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &Arc<[String]> {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at column position `idx`.
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Value of the first column named `name` (case-insensitive).
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|idx| self.values.get(idx))
    }

    /// Convert the value of column `name` into `T`.
    ///
    /// A missing column reads as NULL.
    pub fn try_get<T: FromValue>(&self, name: &str) -> Result<T, ConvertError> {
        T::from_value(self.get_by_name(name).cloned().unwrap_or(Value::Null))
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Convert tokio_postgres rows, sharing one column list across all of them.
pub(crate) fn from_pg_rows(rows: &[tokio_postgres::Row]) -> Result<Vec<Row>, crate::Error> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };

    let columns: Arc<[String]> = first
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    rows.iter()
        .map(|row| {
            let values = (0..columns.len())
                .map(|idx| pg_value(row, idx))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Row::new(columns.clone(), values))
        })
        .collect()
}

/// Extract a value from a Postgres row at a given index.
fn pg_value(row: &tokio_postgres::Row, idx: usize) -> Result<Value, crate::Error> {
    let column = &row.columns()[idx];
    let ty = column.type_();

    let value = match *ty {
        PgTypeInfo::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool),
        PgTypeInfo::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(Value::I16),
        PgTypeInfo::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(Value::I32),
        PgTypeInfo::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Value::I64),
        PgTypeInfo::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| Value::F64(f64::from(v))),
        PgTypeInfo::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(Value::F64),
        PgTypeInfo::TEXT | PgTypeInfo::VARCHAR | PgTypeInfo::BPCHAR | PgTypeInfo::NAME => {
            row.try_get::<_, Option<String>>(idx)?.map(Value::String)
        }
        _ => {
            return Err(crate::Error::TypeMismatch {
                column: column.name().to_string(),
                actual: ty.name().to_string(),
            });
        }
    };

    Ok(value.unwrap_or(Value::Null))
}

/// Wrapper to make our Value usable as a ToSql parameter.
///
/// Integers and booleans are coerced to the parameter type Postgres inferred,
/// since records carry whatever width their fields happen to have.
#[derive(Debug)]
pub(crate) struct SqlParam<'a>(pub &'a Value);

impl SqlParam<'_> {
    fn integer(&self) -> Option<i64> {
        match self.0 {
            Value::Bool(v) => Some(i64::from(*v)),
            Value::I16(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }
}

impl ToSql for SqlParam<'_> {
    fn to_sql(
        &self,
        ty: &PgTypeInfo,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        if let Value::Null = self.0 {
            return Ok(IsNull::Yes);
        }

        match *ty {
            PgTypeInfo::BOOL => match self.0 {
                Value::Bool(v) => v.to_sql(ty, out),
                _ => self.integer().map(|v| v != 0).ok_or("expected bool")?.to_sql(ty, out),
            },
            PgTypeInfo::INT2 => {
                let v = self.integer().ok_or("expected integer")?;
                i16::try_from(v)?.to_sql(ty, out)
            }
            PgTypeInfo::INT4 => {
                let v = self.integer().ok_or("expected integer")?;
                i32::try_from(v)?.to_sql(ty, out)
            }
            PgTypeInfo::INT8 => self.integer().ok_or("expected integer")?.to_sql(ty, out),
            PgTypeInfo::FLOAT4 => match self.0 {
                Value::F64(v) => (*v as f32).to_sql(ty, out),
                _ => (self.integer().ok_or("expected number")? as f32).to_sql(ty, out),
            },
            PgTypeInfo::FLOAT8 => match self.0 {
                Value::F64(v) => v.to_sql(ty, out),
                _ => (self.integer().ok_or("expected number")? as f64).to_sql(ty, out),
            },
            _ => match self.0 {
                Value::String(v) => v.to_sql(ty, out),
                Value::Bool(v) => v.to_string().to_sql(ty, out),
                Value::I16(v) => v.to_string().to_sql(ty, out),
                Value::I32(v) => v.to_string().to_sql(ty, out),
                Value::I64(v) => v.to_string().to_sql(ty, out),
                Value::F64(v) => v.to_string().to_sql(ty, out),
                Value::Null => Ok(IsNull::Yes),
            },
        }
    }

    fn accepts(ty: &PgTypeInfo) -> bool {
        matches!(
            *ty,
            PgTypeInfo::BOOL
                | PgTypeInfo::INT2
                | PgTypeInfo::INT4
                | PgTypeInfo::INT8
                | PgTypeInfo::FLOAT4
                | PgTypeInfo::FLOAT8
                | PgTypeInfo::TEXT
                | PgTypeInfo::VARCHAR
                | PgTypeInfo::BPCHAR
                | PgTypeInfo::NAME
        )
    }

    tokio_postgres::types::to_sql_checked!();
}
