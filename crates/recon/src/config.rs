use stockmatch_store::ColumnSet;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Column names used when reconciling an upload against the stock table.
#[derive(Debug, Clone, Default)]
pub struct ReconConfig {
    pub upload: UploadColumns,
    pub stock: StockColumns,
}

// ---------------------------------------------------------------------------
// Upload file columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct UploadColumns {
    /// Identifier as written in the upload (canonical or alternative).
    pub value_column: String,
    /// Requested quantity. Optional in the file itself.
    pub quantity_column: String,
}

impl Default for UploadColumns {
    fn default() -> Self {
        Self {
            value_column: "Value".into(),
            quantity_column: "Qty".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stock table columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StockColumns {
    pub identifier_column: String,
    pub quantity_column: String,
    /// Storage location, reported as the line's box.
    pub location_column: String,
}

impl Default for StockColumns {
    fn default() -> Self {
        Self {
            identifier_column: "KOD".into(),
            quantity_column: "MİKTAR".into(),
            location_column: "YER".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    /// The identifier column must exist in the stock table. Quantity and
    /// location columns are optional; when absent they read as blank.
    pub fn validate_against(&self, columns: &ColumnSet) -> Result<(), ReconError> {
        if columns.index_of(&self.stock.identifier_column).is_none() {
            return Err(ReconError::MissingColumn {
                source_name: "stock table".into(),
                column: self.stock.identifier_column.clone(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
