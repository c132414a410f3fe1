// Inventory rows plus the search/sort helpers used by table views

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::schema::ColumnSet;
use crate::value::Value;

/// Surrogate key assigned by the repository on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RowId(pub i64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockRow {
    pub row_id: RowId,
    /// One value per column, in `ColumnSet` order.
    pub fields: Vec<Value>,
}

impl StockRow {
    pub fn display_values(&self) -> Vec<String> {
        self.fields.iter().map(Value::to_string).collect()
    }
}

/// Case-insensitive substring search over every displayed field.
/// An empty query keeps all rows.
pub fn filter_rows<'a>(rows: &'a [StockRow], query: &str) -> Vec<&'a StockRow> {
    let needle = query.to_lowercase();
    rows.iter()
        .filter(|row| {
            needle.is_empty()
                || row
                    .fields
                    .iter()
                    .any(|v| v.to_string().to_lowercase().contains(&needle))
        })
        .collect()
}

/// Stable sort by one column. Numeric columns compare numerically with blank or
/// unparseable cells first; text columns compare case-insensitively.
pub fn sort_rows(
    rows: &mut [StockRow],
    columns: &ColumnSet,
    column: &str,
    descending: bool,
) -> StoreResult<()> {
    let idx = columns
        .index_of(column)
        .ok_or_else(|| StoreError::UnknownColumn(column.to_string()))?;
    let numeric = columns.get(idx).map(|c| c.ty.is_numeric()).unwrap_or(false);

    let cmp = |a: &StockRow, b: &StockRow| -> Ordering {
        let (va, vb) = (&a.fields[idx], &b.fields[idx]);
        if numeric {
            let fa = va.as_f64().unwrap_or(f64::NEG_INFINITY);
            let fb = vb.as_f64().unwrap_or(f64::NEG_INFINITY);
            fa.total_cmp(&fb)
        } else {
            va.to_string().to_lowercase().cmp(&vb.to_string().to_lowercase())
        }
    };

    if descending {
        rows.sort_by(|a, b| cmp(b, a));
    } else {
        rows.sort_by(cmp);
    }
    Ok(())
}
