//! Stock storage for stockmatch.
//!
//! The inventory table is environment-supplied: this crate introspects its
//! columns and reads and writes rows through [`StockRepository`]. Alongside it
//! live the identifier mapping table ([`MappingStore`]) and the append-only
//! audit trail ([`AuditLog`]). Every mutation writes one audit entry.
//!
//! Backends:
//! - [`SqliteStore`]: local database file (always available)
//! - `MySqlStore`: remote server (feature `mysql`)
//!
//! Edits made through [`RowEditor`] are recorded in an [`UndoLedger`].

pub mod audit;
pub mod edit;
pub mod error;
pub mod mapping;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod repository;
pub mod row;
pub mod schema;
pub mod sqlite;
pub mod undo;
pub mod value;

pub use audit::{AuditEntry, AuditLevel, AuditLog};
pub use edit::RowEditor;
pub use error::{StoreError, StoreResult};
pub use mapping::{filter_candidates, IdentifierMapping, MappingStore};
#[cfg(feature = "mysql")]
pub use mysql::MySqlStore;
pub use repository::{Backend, StockRepository, TableSpec};
pub use row::{filter_rows, sort_rows, RowId, StockRow};
pub use schema::{Column, ColumnSet, ColumnType};
pub use sqlite::SqliteStore;
pub use undo::{UndoEntry, UndoLedger};
pub use value::{format_values, Value};
