#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("failed to write XLSX file: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("unsupported file type '{0}' (expected csv, tsv, txt, xlsx, xls, xlsb or ods)")]
    UnsupportedFormat(String),

    #[error("sheet '{0}' not found")]
    SheetNotFound(String),

    /// No header row.
    #[error("file is empty")]
    Empty,
}

pub type IoResult<T> = Result<T, IoError>;
