//! In-memory `Connection` for integration tests.
//!
//! Understands exactly the statements strata generates: CREATE TABLE,
//! ALTER TABLE ADD COLUMN (other ALTERs and CREATE INDEX are recorded but
//! change nothing), single-table INSERT / UPDATE, and `SELECT ... FROM t
//! [WHERE c = ?]`. `SELECT *` returns columns in reverse declaration order so
//! scans cannot rely on column order.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use strata::{BoxFuture, Connection, Dialect, Error, ExecResult, Result, Row, Value};

#[derive(Debug, Default)]
struct Table {
    columns: Vec<String>,
    key: Option<String>,
    next_id: i64,
    rows: Vec<Vec<Value>>,
}

impl Table {
    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(column))
    }
}

#[derive(Debug, Default)]
struct State {
    executed: Vec<String>,
    queried: Vec<String>,
    fail_on: Option<String>,
    tables: BTreeMap<String, Table>,
}

pub struct MemoryConn {
    dialect: Dialect,
    state: Mutex<State>,
}

impl MemoryConn {
    pub fn new() -> Self {
        Self::with_dialect(Dialect::MySql)
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: Mutex::new(State::default()),
        }
    }

    /// Every statement passed to `execute`, in order.
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }

    /// Executed statements that are not registry reads or writes.
    pub fn ddl(&self) -> Vec<String> {
        self.executed()
            .into_iter()
            .filter(|sql| sql.starts_with("CREATE") || sql.starts_with("ALTER"))
            .filter(|sql| !sql.contains("__scheme"))
            .collect()
    }

    pub fn queried(&self) -> Vec<String> {
        self.state.lock().unwrap().queried.clone()
    }

    pub fn clear_log(&self) {
        let mut state = self.state.lock().unwrap();
        state.executed.clear();
        state.queried.clear();
    }

    /// Fail every statement containing `needle`.
    pub fn fail_on(&self, needle: &str) {
        self.state.lock().unwrap().fail_on = Some(needle.to_string());
    }

    pub fn clear_failure(&self) {
        self.state.lock().unwrap().fail_on = None;
    }

    pub fn columns(&self, table: &str) -> Option<Vec<String>> {
        let state = self.state.lock().unwrap();
        state.tables.get(table).map(|t| t.columns.clone())
    }

    pub fn row_count(&self, table: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.tables.get(table).map_or(0, |t| t.rows.len())
    }

    pub fn next_id(&self, table: &str) -> Option<i64> {
        let state = self.state.lock().unwrap();
        state.tables.get(table).map(|t| t.next_id)
    }

    /// `(name, scheme)` of every registry row.
    pub fn registry(&self) -> Vec<(String, String)> {
        let state = self.state.lock().unwrap();
        let Some(table) = state.tables.get("__scheme") else {
            return Vec::new();
        };
        let name = table.position("name").unwrap();
        let scheme = table.position("scheme").unwrap();
        table
            .rows
            .iter()
            .map(|row| {
                let text = |v: &Value| match v {
                    Value::String(s) => s.clone(),
                    _ => String::new(),
                };
                (text(&row[name]), text(&row[scheme]))
            })
            .collect()
    }

    /// Overwrite the stored snapshot of registry entry `name`.
    pub fn set_registry_scheme(&self, name: &str, scheme: impl Into<Value>) {
        let scheme = scheme.into();
        let mut state = self.state.lock().unwrap();
        let table = state.tables.get_mut("__scheme").unwrap();
        let name_pos = table.position("name").unwrap();
        let scheme_pos = table.position("scheme").unwrap();
        for row in &mut table.rows {
            if row[name_pos] == Value::from(name) {
                row[scheme_pos] = scheme.clone();
            }
        }
    }

    fn check_failure(state: &State, sql: &str) -> Result<()> {
        match &state.fail_on {
            Some(needle) if sql.contains(needle.as_str()) => {
                Err(Error::Driver(format!("injected failure: {sql}")))
            }
            _ => Ok(()),
        }
    }

    fn run_execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(sql.to_string());
        Self::check_failure(&state, sql)?;

        let sql = sql.trim().trim_end_matches(';');
        if let Some(rest) = sql.strip_prefix("CREATE TABLE IF NOT EXISTS ") {
            create_table(&mut state, rest);
            Ok(ExecResult::default())
        } else if let Some(rest) = sql.strip_prefix("ALTER TABLE ") {
            alter_table(&mut state, rest)?;
            Ok(ExecResult::default())
        } else if sql.starts_with("CREATE ") {
            Ok(ExecResult::default())
        } else if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            let (id, _) = insert(&mut state, rest, params)?;
            Ok(ExecResult {
                rows_affected: 1,
                last_insert_id: id.map(|id| id as u64),
            })
        } else if let Some(rest) = sql.strip_prefix("UPDATE ") {
            update(&mut state, rest, params)
        } else {
            Err(Error::Driver(format!("unsupported statement: {sql}")))
        }
    }

    fn run_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut state = self.state.lock().unwrap();
        state.queried.push(sql.to_string());
        Self::check_failure(&state, sql)?;

        let sql = sql.trim().trim_end_matches(';');
        if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            let (id, key) = insert(&mut state, rest, params)?;
            return Ok(match (id, key) {
                (Some(id), Some(key)) => vec![Row::new(vec![key].into(), vec![Value::I64(id)])],
                _ => Vec::new(),
            });
        }

        let rest = sql
            .strip_prefix("SELECT ")
            .ok_or_else(|| Error::Driver(format!("unsupported query: {sql}")))?;
        select(&state, rest, params)
    }
}

impl Connection for MemoryConn {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<ExecResult>> {
        Box::pin(async move { self.run_execute(sql, params) })
    }

    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, Result<Vec<Row>>> {
        Box::pin(async move { self.run_query(sql, params) })
    }
}

fn no_table(name: &str) -> Error {
    Error::Driver(format!("no such table: {name}"))
}

fn create_table(state: &mut State, rest: &str) {
    let open = rest.find('(').unwrap();
    let close = rest.rfind(')').unwrap();
    let name = rest[..open].trim().to_string();
    if state.tables.contains_key(&name) {
        return;
    }

    let mut table = Table {
        next_id: 1,
        ..Default::default()
    };

    for part in rest[open + 1..close].split(", ") {
        let part = part.trim();
        if part.starts_with("PRIMARY KEY")
            || part.starts_with("INDEX")
            || part.starts_with("UNIQUE INDEX")
        {
            continue;
        }
        let column = part.split_whitespace().next().unwrap().to_string();
        if part.contains("AUTO_INCREMENT") || part.contains("IDENTITY") {
            table.key = Some(column.clone());
            if let Some(start) = part.split("START WITH ").nth(1) {
                table.next_id = start.trim_end_matches(')').trim().parse().unwrap();
            }
        }
        table.columns.push(column);
    }

    if let Some(start) = rest[close..].split("AUTO_INCREMENT = ").nth(1) {
        table.next_id = start.trim().parse().unwrap();
    }

    state.tables.insert(name, table);
}

fn alter_table(state: &mut State, rest: &str) -> Result<()> {
    let (name, action) = rest.split_once(' ').unwrap();
    let table = state.tables.get_mut(name).ok_or_else(|| no_table(name))?;
    if let Some(def) = action.strip_prefix("ADD COLUMN ") {
        let column = def.split_whitespace().next().unwrap().to_string();
        if table.position(&column).is_some() {
            return Err(Error::Driver(format!("duplicate column: {column}")));
        }
        table.columns.push(column);
        for row in &mut table.rows {
            row.push(Value::Null);
        }
    }
    Ok(())
}

fn insert(state: &mut State, rest: &str, params: &[Value]) -> Result<(Option<i64>, Option<String>)> {
    let (head, returning) = match rest.split_once(" RETURNING ") {
        Some((head, key)) => (head, Some(key.trim().to_string())),
        None => (rest, None),
    };

    let (name, columns) = match head.split_once('(') {
        Some((name, tail)) => {
            let list = &tail[..tail.find(')').unwrap()];
            let columns: Vec<String> = list
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            (name.trim(), columns)
        }
        None => (head.trim_end_matches(" DEFAULT VALUES").trim(), Vec::new()),
    };

    let table = state.tables.get_mut(name).ok_or_else(|| no_table(name))?;
    let mut row = vec![Value::Null; table.columns.len()];
    for (column, value) in columns.iter().zip(params) {
        let idx = table
            .position(column)
            .ok_or_else(|| Error::Driver(format!("unknown column: {column}")))?;
        row[idx] = value.clone();
    }

    let id = match &table.key {
        Some(key) => {
            let id = table.next_id;
            table.next_id += 1;
            let idx = table.position(key).unwrap();
            row[idx] = Value::I64(id);
            Some(id)
        }
        None => None,
    };

    table.rows.push(row);
    Ok((id, returning))
}

fn update(state: &mut State, rest: &str, params: &[Value]) -> Result<ExecResult> {
    let (name, tail) = rest.split_once(" SET ").unwrap();
    let (sets, predicate) = tail.split_once(" WHERE ").unwrap();
    let table = state.tables.get_mut(name).ok_or_else(|| no_table(name))?;

    let targets: Vec<usize> = sets
        .split(',')
        .map(|set| {
            let column = set.split('=').next().unwrap().trim();
            table
                .position(column)
                .ok_or_else(|| Error::Driver(format!("unknown column: {column}")))
        })
        .collect::<Result<_>>()?;

    let key_column = predicate.split('=').next().unwrap().trim();
    let key_idx = table
        .position(key_column)
        .ok_or_else(|| Error::Driver(format!("unknown column: {key_column}")))?;
    let key = &params[targets.len()];

    let mut affected = 0;
    for row in &mut table.rows {
        if !key.is_null() && row[key_idx] == *key {
            for (idx, value) in targets.iter().zip(params) {
                row[*idx] = value.clone();
            }
            affected += 1;
        }
    }

    Ok(ExecResult {
        rows_affected: affected,
        last_insert_id: None,
    })
}

fn select(state: &State, rest: &str, params: &[Value]) -> Result<Vec<Row>> {
    let (projection, tail) = rest.split_once(" FROM ").unwrap();
    let (name, predicate) = match tail.split_once(" WHERE ") {
        Some((name, predicate)) => (name.trim(), Some(predicate)),
        None => (tail.trim(), None),
    };
    let table = state.tables.get(name).ok_or_else(|| no_table(name))?;

    let selected: Vec<usize> = if projection.trim() == "*" {
        (0..table.columns.len()).rev().collect()
    } else {
        projection
            .split(',')
            .map(|c| table.position(c.trim()).unwrap())
            .collect()
    };

    let filter = predicate.map(|p| {
        let column = p.split('=').next().unwrap().trim();
        (table.position(column).unwrap(), &params[0])
    });

    let columns: Arc<[String]> = selected
        .iter()
        .map(|&idx| table.columns[idx].clone())
        .collect();

    Ok(table
        .rows
        .iter()
        .filter(|row| match filter {
            Some((idx, value)) => !value.is_null() && row[idx] == *value,
            None => true,
        })
        .map(|row| {
            let values = selected.iter().map(|&idx| row[idx].clone()).collect();
            Row::new(columns.clone(), values)
        })
        .collect())
}
