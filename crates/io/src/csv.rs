// CSV/TSV import/export

use std::io::Read;
use std::path::Path;

use stockmatch_store::Value;
use tracing::debug;

use crate::error::{IoError, IoResult};
use crate::Table;

pub fn import(path: &Path) -> IoResult<Table> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    debug!(path = %path.display(), delimiter = %(delimiter as char).escape_default(), "importing delimited file");
    import_from_string(&content, delimiter)
}

pub fn import_tsv(path: &Path) -> IoResult<Table> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, b'\t')
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        // More columns breaks ties
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (Excel-exported CSVs are often Windows-1252).
pub fn read_file_as_utf8(path: &Path) -> IoResult<String> {
    let mut file = std::fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            debug!(path = %path.display(), "file is not UTF-8, decoded as Windows-1252");
            decoded.into_owned()
        }
    };
    if text.starts_with('\u{feff}') {
        Ok(text['\u{feff}'.len_utf8()..].to_string())
    } else {
        Ok(text)
    }
}

fn import_from_string(content: &str, delimiter: u8) -> IoResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(first) => first?.iter().map(str::to_string).collect(),
        None => return Err(IoError::Empty),
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { headers, rows })
}

pub fn export(path: &Path, headers: &[String], rows: &[Vec<Value>]) -> IoResult<()> {
    export_with_delimiter(path, headers, rows, b',')
}

pub fn export_tsv(path: &Path, headers: &[String], rows: &[Vec<Value>]) -> IoResult<()> {
    export_with_delimiter(path, headers, rows, b'\t')
}

fn export_with_delimiter(path: &Path, headers: &[String], rows: &[Vec<Value>], delimiter: u8) -> IoResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row.iter().map(Value::to_string))?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Value;Qty;Note\nA100;3;x\nB200;5;y\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Value,Qty\nA100,3\nB200,5\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Value\tQty\nA100\t3\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_single_column_defaults_to_comma() {
        assert_eq!(sniff_delimiter("Value\nA100\nB200\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Value;Description;Qty\nA100;\"Resistor, 10k\";3\nB200;\"Cap\";5\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_semicolon_csv_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("order.csv");
        fs::write(&path, "Value;Qty\nA100;3\nALT-1;25\n").unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.headers, vec!["Value", "Qty"]);
        assert_eq!(table.rows, vec![vec!["A100", "3"], vec!["ALT-1", "25"]]);
    }

    #[test]
    fn test_windows_1252_and_bom() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // 0xE9 is é in Windows-1252 and invalid as UTF-8
        fs::write(&path, b"Value,Note\nA100,caf\xe9\n").unwrap();
        let table = import(&path).unwrap();
        assert_eq!(table.rows[0][1], "café");

        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}Value,Qty\nA100,1\n").unwrap();
        let table = import(&path).unwrap();
        assert_eq!(table.headers[0], "Value");
    }

    #[test]
    fn test_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();
        assert!(matches!(import(&path), Err(IoError::Empty)));
    }

    #[test]
    fn test_tsv_export_then_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stock.tsv");
        let headers = vec!["KOD".to_string(), "MİKTAR".to_string(), "YER".to_string()];
        let rows = vec![
            vec![Value::from("A100"), Value::Integer(20), Value::from("B3")],
            vec![Value::from("B200"), Value::Null, Value::Null],
        ];
        export_tsv(&path, &headers, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains('\t'));

        let table = import_tsv(&path).unwrap();
        assert_eq!(table.headers, headers);
        assert_eq!(table.rows[0], vec!["A100", "20", "B3"]);
        assert_eq!(table.rows[1], vec!["B200", "", ""]);
    }
}
