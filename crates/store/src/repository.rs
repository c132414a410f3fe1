// Stock repository contract shared by the storage engines

use crate::audit::AuditLog;
use crate::error::StoreResult;
use crate::mapping::MappingStore;
use crate::row::{RowId, StockRow};
use crate::schema::ColumnSet;
use crate::value::Value;

/// Names of the environment-supplied inventory table and the columns the
/// repository itself needs to know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    /// Surrogate key column. `None` means the engine's implicit row id
    /// (`rowid` on SQLite, which may hand out the id of a deleted last row
    /// again); MySQL backends need a real column.
    pub row_id_column: Option<String>,
    pub identifier_column: String,
    pub package_column: String,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            row_id_column: None,
            identifier_column: "KOD".to_string(),
            package_column: "PAKET".to_string(),
        }
    }
}

/// Read/write access to the inventory table. Every call is independent:
/// a connection is acquired for the call and released on return, and each
/// mutation writes one audit entry alongside the data change.
pub trait StockRepository {
    /// Introspect the table's columns (row id column excluded).
    fn columns(&self) -> StoreResult<ColumnSet>;

    fn fetch_all(&self, columns: &ColumnSet) -> StoreResult<Vec<StockRow>>;

    fn fetch_row(&self, columns: &ColumnSet, row_id: RowId) -> StoreResult<Option<Vec<Value>>>;

    /// `values` in column order.
    fn insert(&self, columns: &ColumnSet, values: &[Value]) -> StoreResult<RowId>;

    /// Single-cell update. Returns the full row as it was before the write.
    fn update(&self, columns: &ColumnSet, row_id: RowId, column: &str, value: &Value) -> StoreResult<Vec<Value>>;

    /// Returns the deleted row's values, `None` if the row did not exist.
    fn delete(&self, columns: &ColumnSet, row_id: RowId) -> StoreResult<Option<Vec<Value>>>;

    /// Delete a row added earlier (undo of an insert). Fails with
    /// `RowNotFound` when the row is gone and `RowChanged` when it no longer
    /// holds `expected`; nothing is written in either case.
    fn revert_insert(&self, columns: &ColumnSet, row_id: RowId, expected: &[Value]) -> StoreResult<()>;

    /// Overwrite every column of a row in one statement (undo of an update).
    fn restore(&self, columns: &ColumnSet, row_id: RowId, values: &[Value]) -> StoreResult<()>;

    /// Sorted, non-null identifier values.
    fn distinct_identifiers(&self) -> StoreResult<Vec<String>>;

    /// Sorted `(identifier, package)` pairs, null identifiers excluded.
    fn distinct_identifier_packages(&self) -> StoreResult<Vec<(String, Option<String>)>>;
}

/// A storage engine providing the inventory table, mappings and audit log.
pub trait Backend: StockRepository + MappingStore + AuditLog {}

impl<T: StockRepository + MappingStore + AuditLog + ?Sized> Backend for T {}
