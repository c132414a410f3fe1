// Row editing surface: validated inserts and cell edits recorded for undo

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::repository::Backend;
use crate::row::RowId;
use crate::schema::ColumnSet;
use crate::undo::{UndoEntry, UndoLedger};

/// Owns the column descriptors for a session and the undo ledger that
/// records every successful insert and cell edit made through it.
#[derive(Debug)]
pub struct RowEditor {
    columns: ColumnSet,
    ledger: UndoLedger,
}

impl RowEditor {
    pub fn new(columns: ColumnSet) -> Self {
        Self { columns, ledger: UndoLedger::new() }
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn ledger(&self) -> &UndoLedger {
        &self.ledger
    }

    /// Validate raw inputs (one per column) and insert them as a new row.
    pub fn add_row<B, S>(&mut self, backend: &B, raw: &[S]) -> StoreResult<RowId>
    where
        B: Backend + ?Sized,
        S: AsRef<str>,
    {
        let values = self.columns.parse_row(raw)?;
        let row_id = backend.insert(&self.columns, &values)?;
        // column affinity may change how a value is stored
        let values = match backend.fetch_row(&self.columns, row_id) {
            Ok(Some(stored)) => stored,
            Ok(None) => values,
            Err(e) => {
                warn!(%row_id, error = %e, "could not read back inserted row");
                values
            }
        };
        self.ledger.push(UndoEntry::Add { row_id, values });
        Ok(row_id)
    }

    /// Validate and write one cell. Returns `false` when the stored value
    /// already equals the new one; nothing is written or recorded then.
    pub fn edit_cell<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        row_id: RowId,
        column: &str,
        raw: &str,
    ) -> StoreResult<bool> {
        let value = self.columns.parse_value(column, raw)?;
        let current = backend
            .fetch_row(&self.columns, row_id)?
            .ok_or(StoreError::RowNotFound(row_id))?;
        let idx = self
            .columns
            .index_of(column)
            .ok_or_else(|| StoreError::UnknownColumn(column.to_string()))?;
        if current.get(idx) == Some(&value) {
            debug!(%row_id, column, "cell unchanged, skipping write");
            return Ok(false);
        }
        let prior = backend.update(&self.columns, row_id, column, &value)?;
        self.ledger.push(UndoEntry::Update { row_id, prior });
        Ok(true)
    }

    /// Revert the most recent add or edit. `None` when there is nothing to undo.
    pub fn undo<B: Backend + ?Sized>(&mut self, backend: &B) -> StoreResult<Option<UndoEntry>> {
        self.ledger.undo(backend, &self.columns)
    }
}
