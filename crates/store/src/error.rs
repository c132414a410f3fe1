use crate::row::RowId;
use crate::schema::ColumnType;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Input does not parse to the column's declared type. Nothing was written.
    #[error("column '{column}' expects type {expected}, invalid value: '{value}'")]
    Validation {
        column: String,
        expected: ColumnType,
        value: String,
    },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// Value list length differs from the column descriptor list.
    #[error("expected {expected} value(s), one per column, got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("row {0} not found")]
    RowNotFound(RowId),

    #[error("row {0} no longer holds the values it was added with; left in place")]
    RowChanged(RowId),

    #[error("table '{0}' not found or has no columns")]
    MissingTable(String),

    #[error("a mapping needs both an original identifier and an alternative value")]
    BlankMapping,

    #[error("invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("unreadable timestamp '{0}'")]
    Timestamp(String),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "mysql")]
    #[error("mysql: {0}")]
    MySql(#[from] sqlx::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Caller-input problems, rejected before any write.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::UnknownColumn(_) | Self::Arity { .. } | Self::BlankMapping
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
