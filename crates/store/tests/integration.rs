use proptest::prelude::*;
use rusqlite::Connection;
use tempfile::TempDir;

use stockmatch_store::{
    AuditLog, MappingStore, RowEditor, RowId, SqliteStore, StockRepository, StoreError, TableSpec,
    UndoEntry, Value,
};

const STOCK_TABLE: &str = r#"
    CREATE TABLE "ERP_DB" (
        "KOD" TEXT,
        "PAKET" TEXT,
        "MİKTAR" INTEGER,
        "YER" TEXT
    );
"#;

fn open_store() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stock.db");
    Connection::open(&path).unwrap().execute_batch(STOCK_TABLE).unwrap();
    let store = SqliteStore::open(&path, TableSpec::new("ERP_DB")).unwrap();
    (dir, store)
}

fn editor(store: &SqliteStore) -> RowEditor {
    RowEditor::new(store.columns().unwrap())
}

fn last_message(store: &SqliteStore) -> String {
    store.recent_actions(1).unwrap().remove(0).message
}

// -------------------------------------------------------------------------
// Row editor + undo
// -------------------------------------------------------------------------

#[test]
fn undo_add_removes_inserted_row() {
    let (_dir, store) = open_store();
    let mut ed = editor(&store);
    let id = ed.add_row(&store, &["A100", "0805", "20", "B3"]).unwrap();
    assert_eq!(ed.ledger().len(), 1);

    let before = store.recent_actions(100).unwrap().len();
    let undone = ed.undo(&store).unwrap();
    assert_eq!(
        undone,
        Some(UndoEntry::Add {
            row_id: id,
            values: vec![Value::from("A100"), Value::from("0805"), Value::Integer(20), Value::from("B3")],
        })
    );
    assert!(store.fetch_row(ed.columns(), id).unwrap().is_none());
    assert_eq!(store.recent_actions(100).unwrap().len(), before + 1);
    assert_eq!(last_message(&store), format!("Undo add: deleted row {id} (values: [A100, 0805, 20, B3])"));
}

#[test]
fn undo_add_of_deleted_row_fails_and_logs_nothing() {
    let (_dir, store) = open_store();
    let mut ed = editor(&store);
    let id = ed.add_row(&store, &["A100", "", "5", "B3"]).unwrap();
    store.delete(ed.columns(), id).unwrap();
    let before = store.recent_actions(100).unwrap().len();

    assert!(matches!(ed.undo(&store), Err(StoreError::RowNotFound(r)) if r == id));
    assert!(ed.ledger().is_empty());
    assert_eq!(store.recent_actions(100).unwrap().len(), before);
}

#[test]
fn undo_add_leaves_row_that_took_over_a_reused_id() {
    let (_dir, store) = open_store();
    let mut ed = editor(&store);
    let id = ed.add_row(&store, &["A100", "", "5", "B3"]).unwrap();
    store.delete(ed.columns(), id).unwrap();

    // implicit rowid: deleting the last row frees its id for the next insert
    let other = vec![Value::from("Z999"), Value::Null, Value::Integer(1), Value::from("Q1")];
    let reused = store.insert(ed.columns(), &other).unwrap();
    assert_eq!(reused, id);
    let before = store.recent_actions(100).unwrap().len();

    assert!(matches!(ed.undo(&store), Err(StoreError::RowChanged(r)) if r == id));
    assert_eq!(store.fetch_row(ed.columns(), id).unwrap(), Some(other));
    assert_eq!(store.recent_actions(100).unwrap().len(), before);
}

#[test]
fn undo_walks_back_through_a_reused_id() {
    let (_dir, store) = open_store();
    let mut ed = editor(&store);
    let first = ed.add_row(&store, &["A100", "", "5", "B3"]).unwrap();
    store.delete(ed.columns(), first).unwrap();
    let second = ed.add_row(&store, &["Z999", "", "1", "Q1"]).unwrap();
    assert_eq!(first, second);

    assert_eq!(ed.undo(&store).unwrap().map(|e| e.row_id()), Some(second));
    assert!(store.fetch_all(ed.columns()).unwrap().is_empty());
    assert!(matches!(ed.undo(&store), Err(StoreError::RowNotFound(_))));
}

#[test]
fn undo_add_matches_values_as_stored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stock.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch(r#"CREATE TABLE "ERP_DB" ("KOD" TEXT, "FIYAT" DECIMAL(10,2));"#)
        .unwrap();
    let store = SqliteStore::open(&path, TableSpec::new("ERP_DB")).unwrap();
    let mut ed = editor(&store);

    let id = ed.add_row(&store, &["A100", "5"]).unwrap();
    assert!(ed.undo(&store).unwrap().is_some());
    assert!(store.fetch_row(ed.columns(), id).unwrap().is_none());
}

#[test]
fn undo_update_restores_full_prior_row() {
    let (_dir, store) = open_store();
    let mut ed = editor(&store);
    let id = ed.add_row(&store, &["A100", "", "5", "B3"]).unwrap();

    assert!(ed.edit_cell(&store, id, "MİKTAR", "7").unwrap());
    assert!(ed.edit_cell(&store, id, "YER", "C1").unwrap());
    let row = store.fetch_row(ed.columns(), id).unwrap().unwrap();
    assert_eq!(row[2], Value::Integer(7));
    assert_eq!(row[3], Value::from("C1"));

    ed.undo(&store).unwrap();
    let row = store.fetch_row(ed.columns(), id).unwrap().unwrap();
    assert_eq!(row[3], Value::from("B3"));
    assert_eq!(row[2], Value::Integer(7));

    ed.undo(&store).unwrap();
    let row = store.fetch_row(ed.columns(), id).unwrap().unwrap();
    assert_eq!(row, vec![Value::from("A100"), Value::Null, Value::Integer(5), Value::from("B3")]);
    assert!(last_message(&store).starts_with(&format!("Undo update: restored row {id}")));
}

#[test]
fn undo_on_empty_ledger_is_noop() {
    let (_dir, store) = open_store();
    let mut ed = editor(&store);
    assert_eq!(ed.undo(&store).unwrap(), None);
    assert!(store.recent_actions(10).unwrap().is_empty());
}

#[test]
fn repeated_undo_walks_back_history() {
    let (_dir, store) = open_store();
    let mut ed = editor(&store);
    let a = ed.add_row(&store, &["A", "", "1", ""]).unwrap();
    let b = ed.add_row(&store, &["B", "", "2", ""]).unwrap();

    assert_eq!(ed.undo(&store).unwrap().map(|e| e.row_id()), Some(b));
    assert_eq!(ed.undo(&store).unwrap().map(|e| e.row_id()), Some(a));
    assert!(store.fetch_all(ed.columns()).unwrap().is_empty());
    assert!(ed.ledger().is_empty());
}

#[test]
fn invalid_input_writes_nothing() {
    let (_dir, store) = open_store();
    let mut ed = editor(&store);
    let err = ed.add_row(&store, &["A100", "", "lots", "B3"]).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("MİKTAR"));
    assert!(store.fetch_all(ed.columns()).unwrap().is_empty());
    assert!(ed.ledger().is_empty());

    let id = ed.add_row(&store, &["A100", "", "5", "B3"]).unwrap();
    let err = ed.edit_cell(&store, id, "MİKTAR", "5.5").unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));
    assert_eq!(ed.ledger().len(), 1);
}

#[test]
fn unchanged_cell_is_not_recorded() {
    let (_dir, store) = open_store();
    let mut ed = editor(&store);
    let id = ed.add_row(&store, &["A100", "", "5", "B3"]).unwrap();
    let before = store.recent_actions(100).unwrap().len();

    assert!(!ed.edit_cell(&store, id, "MİKTAR", " 5 ").unwrap());
    assert_eq!(ed.ledger().len(), 1);
    assert_eq!(store.recent_actions(100).unwrap().len(), before);
}

#[test]
fn edit_missing_row_fails() {
    let (_dir, store) = open_store();
    let mut ed = editor(&store);
    let err = ed.edit_cell(&store, RowId(42), "YER", "B1").unwrap_err();
    assert!(matches!(err, StoreError::RowNotFound(RowId(42))));
    assert!(ed.ledger().is_empty());
}

#[test]
fn undo_entry_is_consumed_even_if_row_vanished() {
    let (_dir, store) = open_store();
    let mut ed = editor(&store);
    let id = ed.add_row(&store, &["A100", "", "5", "B3"]).unwrap();
    ed.edit_cell(&store, id, "YER", "C1").unwrap();
    store.delete(ed.columns(), id).unwrap();

    assert!(matches!(ed.undo(&store), Err(StoreError::RowNotFound(_))));
    assert_eq!(ed.ledger().len(), 1);
}

// -------------------------------------------------------------------------
// Mapping laws
// -------------------------------------------------------------------------

// Each case opens a scratch database, so keep the default run small.
fn config_64() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(64),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

proptest! {
    #![proptest_config(config_64())]

    #[test]
    fn create_then_resolve(original in "[A-Z][A-Z0-9-]{0,11}", alternative in "[a-z0-9][a-z0-9 ./-]{0,15}") {
        let (_dir, store) = open_store();
        prop_assert!(store.create_mapping(&original, &alternative).unwrap());
        prop_assert_eq!(store.resolve(&alternative).unwrap(), Some(original.clone()));

        prop_assert!(!store.create_mapping(&original, &alternative).unwrap());
        prop_assert_eq!(store.list_mappings().unwrap().len(), 1);
    }
}
