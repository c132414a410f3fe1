//! Undo ledger for row edits.
//!
//! A LIFO stack of reversible mutations recorded by the editing surface.
//! It lives in process memory only and is owned by whoever drives the
//! edits (see [`crate::edit::RowEditor`]).

use tracing::debug;

use crate::error::StoreResult;
use crate::repository::Backend;
use crate::row::RowId;
use crate::schema::ColumnSet;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum UndoEntry {
    /// A row was inserted; undo deletes it if it still holds `values`.
    Add { row_id: RowId, values: Vec<Value> },
    /// A cell was changed; `prior` is the full row before the change.
    Update { row_id: RowId, prior: Vec<Value> },
}

impl UndoEntry {
    pub fn row_id(&self) -> RowId {
        match self {
            Self::Add { row_id, .. } | Self::Update { row_id, .. } => *row_id,
        }
    }
}

#[derive(Debug, Default)]
pub struct UndoLedger {
    entries: Vec<UndoEntry>,
}

impl UndoLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: UndoEntry) {
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Option<UndoEntry> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pop the most recent entry and apply it. An empty ledger is a no-op.
    ///
    /// The entry is consumed even when applying it fails.
    pub fn undo<B: Backend + ?Sized>(&mut self, backend: &B, columns: &ColumnSet) -> StoreResult<Option<UndoEntry>> {
        let Some(entry) = self.pop() else {
            debug!("undo requested with empty ledger");
            return Ok(None);
        };
        debug!(row_id = %entry.row_id(), "applying undo entry");
        apply(backend, columns, &entry)?;
        Ok(Some(entry))
    }
}

/// Revert one recorded mutation against the backend.
pub fn apply<B: Backend + ?Sized>(backend: &B, columns: &ColumnSet, entry: &UndoEntry) -> StoreResult<()> {
    match entry {
        UndoEntry::Add { row_id, values } => backend.revert_insert(columns, *row_id, values),
        UndoEntry::Update { row_id, prior } => backend.restore(columns, *row_id, prior),
    }
}
