//! Runtime values and result rows.

mod row;
mod value;

pub use row::Row;
pub use value::{ConvertError, FromValue, Value};

pub(crate) use row::{SqlParam, from_pg_rows};
