//! Row scanning into records.
//!
//! A [`ScanPlan`] maps each column position of a result set to the record
//! field of the same (case-insensitive) name. It is built once from the first
//! row and reused for the rest; the column list of every later row must be
//! the one the plan was built from.

use crate::record::FieldBinding;
use crate::{Error, Record, Result, Row};
use std::collections::HashMap;
use std::sync::Arc;

/// Column position to field binding, for one result shape.
#[derive(Debug)]
pub struct ScanPlan<R: 'static> {
    columns: Arc<[String]>,
    slots: Vec<Option<&'static FieldBinding<R>>>,
}

impl<R: Record> ScanPlan<R> {
    /// Plan a scan of rows with the given column list.
    ///
    /// When a name appears in several columns, the last one is bound.
    /// Columns with no matching field stay unbound.
    pub fn new(columns: &Arc<[String]>) -> Self {
        let positions: HashMap<String, usize> = columns
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.to_lowercase(), idx))
            .collect();

        let mut slots = vec![None; columns.len()];
        for field in R::bindings().fields() {
            if let Some(&idx) = positions.get(field.name()) {
                slots[idx] = Some(field);
            }
        }

        Self {
            columns: columns.clone(),
            slots,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Bound `(column position, field name)` pairs, in column order.
    pub fn bound(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.map(|field| (idx, field.name())))
    }

    /// Whether `columns` is the column list this plan was built for.
    pub fn matches(&self, columns: &Arc<[String]>) -> bool {
        Arc::ptr_eq(&self.columns, columns) || self.columns == *columns
    }

    /// Copy the bound values of `row` into `record`.
    pub fn apply(&self, row: &Row, record: &mut R) -> Result<()> {
        if !self.matches(row.columns()) {
            return Err(Error::ColumnsChanged {
                planned: self.columns.to_vec(),
                found: row.columns().to_vec(),
            });
        }

        for (slot, value) in self.slots.iter().zip(row.values()) {
            if let Some(field) = slot {
                field
                    .set(record, value.clone())
                    .map_err(|source| Error::Convert {
                        field: field.name().to_string(),
                        source,
                    })?;
            }
        }

        Ok(())
    }
}

/// Scans rows of one query into a single record.
///
/// The plan is built on the first [`scan`](Scanner::scan) and reused after
/// that, so a scanner must not be reused across differently-shaped queries.
pub struct Scanner<'a, R: Record> {
    record: &'a mut R,
    plan: Option<ScanPlan<R>>,
}

impl<'a, R: Record> Scanner<'a, R> {
    pub fn new(record: &'a mut R) -> Self {
        Self { record, plan: None }
    }

    /// Populate the record from `row`.
    pub fn scan(&mut self, row: &Row) -> Result<()> {
        let plan = self
            .plan
            .get_or_insert_with(|| ScanPlan::new(row.columns()));
        plan.apply(row, self.record)
    }

    pub fn record(&self) -> &R {
        &*self.record
    }

    pub fn plan(&self) -> Option<&ScanPlan<R>> {
        self.plan.as_ref()
    }
}

/// Scan every row of a result set into a fresh record, using one plan.
pub fn scan_rows<R: Record + Default>(rows: &[Row]) -> Result<Vec<R>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };

    let plan = ScanPlan::<R>::new(first.columns());
    rows.iter()
        .map(|row| {
            let mut record = R::default();
            plan.apply(row, &mut record)?;
            Ok(record)
        })
        .collect()
}
