// File I/O: upload import and table export

use std::path::Path;

use stockmatch_store::Value;

pub mod csv;
pub mod error;
pub mod xlsx;

pub use error::{IoError, IoResult};

/// A header row plus string cells, as read from an uploaded file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Import a tabular file, choosing the reader by extension.
///
/// `sheet` only applies to spreadsheet formats.
pub fn import_table(path: &Path, sheet: Option<&str>) -> IoResult<Table> {
    match extension(path).as_str() {
        "csv" | "txt" => csv::import(path),
        "tsv" => csv::import_tsv(path),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => xlsx::import(path, sheet),
        other => Err(IoError::UnsupportedFormat(other.to_string())),
    }
}

/// Export a header row plus typed rows. `.xlsx` keeps numbers numeric;
/// `.csv`/`.tsv` write display text.
pub fn export_table(path: &Path, sheet_name: &str, headers: &[String], rows: &[Vec<Value>]) -> IoResult<()> {
    match extension(path).as_str() {
        "xlsx" => xlsx::export(path, sheet_name, headers, rows),
        "csv" => csv::export(path, headers, rows),
        "tsv" => csv::export_tsv(path, headers, rows),
        other => Err(IoError::UnsupportedFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn dispatch_by_extension() {
        let dir = tempdir().unwrap();
        let headers = vec!["Value".to_string(), "Qty".to_string()];
        let rows = vec![vec![Value::from("A100"), Value::Integer(3)]];

        for name in ["order.CSV", "order.tsv", "order.xlsx"] {
            let path = dir.path().join(name);
            export_table(&path, "Order", &headers, &rows).unwrap();
            let table = import_table(&path, None).unwrap();
            assert_eq!(table.headers, headers, "{name}");
            assert_eq!(table.rows, vec![vec!["A100", "3"]], "{name}");
        }
    }

    #[test]
    fn unknown_extension_rejected() {
        let err = import_table(Path::new("order.pdf"), None).unwrap_err();
        assert!(matches!(err, IoError::UnsupportedFormat(ref e) if e == "pdf"));
        assert!(err.to_string().contains("unsupported file type 'pdf'"));
        assert!(export_table(Path::new("out.ods"), "x", &[], &[]).is_err());
    }
}
