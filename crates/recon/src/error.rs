use stockmatch_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    /// A required column is absent from the uploaded file or the stock table.
    #[error("{source_name}: missing column '{column}'")]
    MissingColumn { source_name: String, column: String },

    /// Repository or mapping lookup failed mid-run.
    #[error(transparent)]
    Store(#[from] StoreError),
}
