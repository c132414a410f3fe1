// Excel / OpenDocument import (calamine) and XLSX export (rust_xlsxwriter)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook};
use stockmatch_store::Value;
use tracing::debug;

use crate::error::{IoError, IoResult};
use crate::Table;

/// Import one sheet of an Excel file (xlsx, xls, xlsb, ods).
///
/// `sheet` selects by name; `None` takes the first sheet. The first row of
/// the used range is the header row.
pub fn import(path: &Path, sheet: Option<&str>) -> IoResult<Table> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names();

    let name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| IoError::SheetNotFound(wanted.to_string()))?,
        None => sheet_names.first().cloned().ok_or(IoError::Empty)?,
    };

    let range = workbook.worksheet_range(&name)?;
    let (height, width) = range.get_size();
    debug!(path = %path.display(), sheet = %name, height, width, "importing sheet");

    let mut rows = range.rows().map(|r| r.iter().map(cell_text).collect::<Vec<String>>());
    let headers = rows.next().ok_or(IoError::Empty)?;
    Ok(Table { headers, rows: rows.collect() })
}

/// Render a cell the way it reads in the spreadsheet: integral floats without
/// decimals, booleans as TRUE/FALSE.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Write a header row plus typed rows to a single-sheet XLSX file.
/// Numbers are written as numbers; nulls leave the cell empty.
pub fn export(path: &Path, sheet_name: &str, headers: &[String], rows: &[Vec<Value>]) -> IoResult<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    let header_format = Format::new().set_bold();
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    for (r, row) in rows.iter().enumerate() {
        let row32 = (r + 1) as u32;
        for (c, value) in row.iter().enumerate() {
            let col16 = c as u16;
            match value {
                Value::Null => {}
                Value::Integer(n) => {
                    worksheet.write_number(row32, col16, *n as f64)?;
                }
                Value::Real(x) => {
                    worksheet.write_number(row32, col16, *x)?;
                }
                Value::Text(s) => {
                    worksheet.write_string(row32, col16, s)?;
                }
            }
        }
    }
    worksheet.autofit();

    workbook.save(path)?;
    Ok(())
}
