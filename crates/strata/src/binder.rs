//! INSERT / UPDATE / SELECT for bound records.
//!
//! Record fields are matched to descriptor columns by lower-cased name. A
//! field that matches the key column is treated specially; fields that match
//! no column are skipped, so a record type may carry state that is never
//! persisted.

use crate::scan::scan_rows;
use crate::{Connection, Dialect, Error, FromValue, Record, Result, Row, TableDescriptor, Value};
use tracing::warn;

/// A SQL statement with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Build the INSERT for `record` into `table_name`.
///
/// The key field is never bound. On Postgres the key is read back with
/// `RETURNING`; MySQL reports it as the last insert id.
pub fn insert_statement<R: Record>(
    dialect: Dialect,
    table_name: &str,
    table: &TableDescriptor,
    record: &R,
) -> Statement {
    let mut columns = Vec::new();
    let mut params = Vec::new();

    for field in R::bindings().fields() {
        if table.is_key(field.name()) {
            continue;
        }
        if table.has_column(field.name()) {
            columns.push(field.name());
            params.push(field.get(record));
        }
    }

    let mut sql = match dialect {
        Dialect::Postgres if columns.is_empty() => {
            format!("INSERT INTO {table_name} DEFAULT VALUES")
        }
        _ => {
            let placeholders: Vec<String> =
                (1..=params.len()).map(|n| dialect.placeholder(n)).collect();
            format!(
                "INSERT INTO {}({}) VALUES ({})",
                table_name,
                columns.join(","),
                placeholders.join(",")
            )
        }
    };

    if let (Dialect::Postgres, Some(key)) = (dialect, table.key()) {
        sql.push_str(&format!(" RETURNING {key}"));
    }

    Statement { sql, params }
}

/// Build the UPDATE for `record`, keyed on the table's key column.
///
/// Returns `Ok(None)` when no field matches a column. A record without a key
/// field binds NULL in the predicate, which matches no row.
pub fn update_statement<R: Record>(
    dialect: Dialect,
    table_name: &str,
    table: &TableDescriptor,
    record: &R,
) -> Result<Option<Statement>> {
    let key = table
        .key()
        .ok_or_else(|| Error::MissingKeyColumn(table_name.to_string()))?;

    let mut sets = Vec::new();
    let mut params = Vec::new();
    let mut key_value = None;

    for field in R::bindings().fields() {
        if table.is_key(field.name()) {
            key_value = Some(field.get(record));
        } else if table.has_column(field.name()) {
            params.push(field.get(record));
            sets.push(format!("{}={}", field.name(), dialect.placeholder(params.len())));
        }
    }

    if sets.is_empty() {
        return Ok(None);
    }

    let key_value = key_value.unwrap_or_else(|| {
        warn!(
            table = %table_name,
            key = %key,
            "record has no key field, update will match no rows"
        );
        Value::Null
    });
    params.push(key_value);

    let sql = format!(
        "UPDATE {} SET {} WHERE {}={}",
        table_name,
        sets.join(", "),
        key,
        dialect.placeholder(params.len())
    );

    Ok(Some(Statement { sql, params }))
}

/// Binds records to the tables of one prefix.
pub struct Mapper<'c, C: Connection + ?Sized> {
    conn: &'c C,
    prefix: String,
}

impl<'c, C: Connection + ?Sized> Mapper<'c, C> {
    pub fn new(conn: &'c C, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Insert `record` and write the generated key back into its key field.
    ///
    /// Returns the generated key, or `None` for a table without a key column.
    pub async fn insert<R: Record>(
        &self,
        table: &TableDescriptor,
        record: &mut R,
    ) -> Result<Option<i64>> {
        let dialect = self.conn.dialect();
        let name = table.qualified_name(&self.prefix);
        let stmt = insert_statement(dialect, &name, table, record);

        let Some(key) = table.key() else {
            self.conn.execute(&stmt.sql, &stmt.params).await?;
            return Ok(None);
        };

        let id = match dialect {
            Dialect::MySql => {
                let result = self.conn.execute(&stmt.sql, &stmt.params).await?;
                result.last_insert_id.and_then(|id| i64::try_from(id).ok())
            }
            Dialect::Postgres => {
                let rows = self.conn.query(&stmt.sql, &stmt.params).await?;
                match rows.first().and_then(|row| row.get(0)) {
                    Some(value) => Some(generated_key(value.clone(), key)?),
                    None => None,
                }
            }
        };

        let id = id.ok_or_else(|| Error::MissingGeneratedKey(name.clone()))?;

        if let Some(field) = R::bindings().field(key) {
            field
                .set(record, Value::I64(id))
                .map_err(|source| Error::Convert {
                    field: key.to_string(),
                    source,
                })?;
        }

        Ok(Some(id))
    }

    /// Update the row whose key equals the record's key field.
    ///
    /// Returns the number of rows affected.
    pub async fn update<R: Record>(&self, table: &TableDescriptor, record: &R) -> Result<u64> {
        let name = table.qualified_name(&self.prefix);
        match update_statement(self.conn.dialect(), &name, table, record)? {
            Some(stmt) => Ok(self.conn.execute(&stmt.sql, &stmt.params).await?.rows_affected),
            None => Ok(0),
        }
    }

    /// `SELECT * FROM <table> <clause>` with positional `params`.
    pub async fn select(
        &self,
        table: &TableDescriptor,
        clause: &str,
        params: &[Value],
    ) -> Result<Vec<Row>> {
        let name = table.qualified_name(&self.prefix);
        let clause = clause.trim();
        let sql = if clause.is_empty() {
            format!("SELECT * FROM {name}")
        } else {
            format!("SELECT * FROM {name} {clause}")
        };
        self.conn.query(&sql, params).await
    }

    /// [`select`](Self::select) and scan every row into a fresh record.
    pub async fn select_as<R: Record + Default>(
        &self,
        table: &TableDescriptor,
        clause: &str,
        params: &[Value],
    ) -> Result<Vec<R>> {
        let rows = self.select(table, clause, params).await?;
        scan_rows(&rows)
    }

    /// Load the record whose key column equals `key`.
    pub async fn find_by_key<R: Record + Default>(
        &self,
        table: &TableDescriptor,
        key: i64,
    ) -> Result<Option<R>> {
        let column = table
            .key()
            .ok_or_else(|| Error::MissingKeyColumn(table.qualified_name(&self.prefix)))?;
        let clause = format!("WHERE {}={}", column, self.conn.dialect().placeholder(1));
        let mut records = self.select_as(table, &clause, &[Value::I64(key)]).await?;
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.swap_remove(0))
        })
    }
}

fn generated_key(value: Value, field: &str) -> Result<i64> {
    i64::from_value(value).map_err(|source| Error::Convert {
        field: field.to_string(),
        source,
    })
}
