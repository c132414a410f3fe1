//! `stockmatch edit`: line-oriented editing session.
//!
//! Reads one command per line. Adds and cell edits made during the session
//! can be undone in reverse order until the session ends; the undo history is
//! not persisted.

use std::io::{self, BufRead, Write};

use stockmatch_store::{filter_rows, Backend, RowEditor, RowId, UndoEntry};

use crate::util;

const HELP: &str = "\
commands:
  add <value>...              insert a row, one value per column
  set <row> <column> <value>  change one cell
  undo                        revert the last add or set
  rows [search]               show rows
  columns                     show columns
  quit                        leave the session
quote values containing spaces; \"\" is a blank value";

/// Split a command line on whitespace, honouring double quotes.
fn split_args(line: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if in_quotes {
        return Err("unterminated quote".to_string());
    }
    if has_token {
        args.push(current);
    }
    Ok(args)
}

/// Run the session until `quit` or end of input.
pub fn run_session<B, R, W>(backend: &B, mut editor: RowEditor, input: R, mut out: W) -> io::Result<()>
where
    B: Backend + ?Sized,
    R: BufRead,
    W: Write,
{
    writeln!(out, "{} column(s): {}", editor.columns().len(), editor.columns().names().join(", "))?;
    writeln!(out, "type 'help' for commands")?;

    for line in input.lines() {
        let line = line?;
        let args = match split_args(&line) {
            Ok(args) => args,
            Err(e) => {
                writeln!(out, "error: {}", e)?;
                continue;
            }
        };
        let Some((cmd, rest)) = args.split_first() else {
            continue;
        };

        match cmd.as_str() {
            "quit" | "exit" => break,
            "help" => writeln!(out, "{}", HELP)?,
            "add" => match editor.add_row(backend, rest) {
                Ok(id) => writeln!(out, "added row {}", id)?,
                Err(e) => writeln!(out, "error: {}", e)?,
            },
            "set" => {
                let [row, column, value] = rest else {
                    writeln!(out, "usage: set <row> <column> <value>")?;
                    continue;
                };
                let Ok(row_id) = row.parse::<i64>().map(RowId) else {
                    writeln!(out, "error: '{}' is not a row number", row)?;
                    continue;
                };
                match editor.edit_cell(backend, row_id, column, value) {
                    Ok(true) => writeln!(out, "updated row {}", row_id)?,
                    Ok(false) => writeln!(out, "row {} unchanged", row_id)?,
                    Err(e) => writeln!(out, "error: {}", e)?,
                }
            }
            "undo" => match editor.undo(backend) {
                Ok(Some(UndoEntry::Add { row_id, .. })) => writeln!(out, "undid add of row {}", row_id)?,
                Ok(Some(UndoEntry::Update { row_id, .. })) => writeln!(out, "undid edit of row {}", row_id)?,
                Ok(None) => writeln!(out, "nothing to undo")?,
                Err(e) => writeln!(out, "error: {}", e)?,
            },
            "rows" => {
                let query = rest.join(" ");
                match backend.fetch_all(editor.columns()) {
                    Ok(rows) => {
                        let mut headers = vec!["#".to_string()];
                        headers.extend(editor.columns().names().into_iter().map(str::to_string));
                        let table: Vec<Vec<String>> = filter_rows(&rows, &query)
                            .iter()
                            .map(|row| {
                                let mut cells = vec![row.row_id.to_string()];
                                cells.extend(row.display_values());
                                cells
                            })
                            .collect();
                        write!(out, "{}", util::render_table(&headers, &table))?;
                    }
                    Err(e) => writeln!(out, "error: {}", e)?,
                }
            }
            "columns" => {
                for col in editor.columns().iter() {
                    writeln!(out, "{} {}", col.name, col.ty)?;
                }
            }
            other => writeln!(out, "unknown command '{}'; type 'help'", other)?,
        }
    }

    if !editor.ledger().is_empty() {
        writeln!(out, "session ended with {} undoable change(s)", editor.ledger().len())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockmatch_store::{AuditLog, SqliteStore, StockRepository, TableSpec, Value};

    fn store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stock.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE ERP_DB (KOD TEXT, PAKET TEXT, \"MİKTAR\" INTEGER, YER TEXT);
             INSERT INTO ERP_DB VALUES ('A100', 'Resistor 10k', 20, 'B3');",
        )
        .unwrap();
        let store = SqliteStore::open(&path, TableSpec::new("ERP_DB")).unwrap();
        (dir, store)
    }

    fn session(store: &SqliteStore, script: &str) -> String {
        let editor = RowEditor::new(store.columns().unwrap());
        let mut out = Vec::new();
        run_session(store, editor, script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn split_handles_quotes() {
        assert_eq!(split_args("add A200 \"Cap 1uF\" 5 C1").unwrap(), vec!["add", "A200", "Cap 1uF", "5", "C1"]);
        assert_eq!(split_args("set 1 YER \"\"").unwrap(), vec!["set", "1", "YER", ""]);
        assert!(split_args("add \"open").is_err());
        assert!(split_args("   ").unwrap().is_empty());
    }

    #[test]
    fn add_then_undo() {
        let (_dir, store) = store();
        let out = session(&store, "add A200 \"Cap 1uF\" 5 C1\nundo\nundo\n");
        assert!(out.contains("added row 2"), "{out}");
        assert!(out.contains("undid add of row 2"), "{out}");
        assert!(out.contains("nothing to undo"), "{out}");

        let cols = store.columns().unwrap();
        assert_eq!(store.fetch_all(&cols).unwrap().len(), 1);
        let log = store.recent_actions(10).unwrap();
        assert!(log[0].message.starts_with("Undo add: deleted row 2"), "{:?}", log[0]);
        assert!(log[1].message.starts_with("Inserted row 2"), "{:?}", log[1]);
    }

    #[test]
    fn set_then_undo_restores_value() {
        let (_dir, store) = store();
        let out = session(&store, "set 1 MİKTAR 35\nset 1 MİKTAR 35\nundo\nquit\nset 1 MİKTAR 99\n");
        assert!(out.contains("updated row 1"), "{out}");
        assert!(out.contains("row 1 unchanged"), "{out}");
        assert!(out.contains("undid edit of row 1"), "{out}");

        let cols = store.columns().unwrap();
        let row = store.fetch_row(&cols, RowId(1)).unwrap().unwrap();
        assert_eq!(row[2], Value::Integer(20));
    }

    #[test]
    fn invalid_input_keeps_session_going() {
        let (_dir, store) = store();
        let out = session(&store, "set 1 MİKTAR abc\nset x YER A1\nfrobnicate\nadd A300 \"\" 1 D4\n");
        assert!(out.contains("expects type INTEGER"), "{out}");
        assert!(out.contains("'x' is not a row number"), "{out}");
        assert!(out.contains("unknown command 'frobnicate'"), "{out}");
        assert!(out.contains("added row 2"), "{out}");
        assert!(out.contains("session ended with 1 undoable change(s)"), "{out}");
    }
}
