// SQLite backend
//
// One connection per call. A data write and its audit entry share one
// transaction, so a failed call leaves neither behind.

use std::path::{Path, PathBuf};

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use tracing::debug;

use crate::audit::{parse_timestamp, trace_audit, AuditEntry, AuditLevel, AuditLog};
use crate::error::{StoreError, StoreResult};
use crate::mapping::{normalize_pair, IdentifierMapping, MappingStore, RESOLVE_ORDER};
use crate::repository::{StockRepository, TableSpec};
use crate::row::{RowId, StockRow};
use crate::schema::{Column, ColumnSet, ColumnType};
use crate::value::{format_values, Value};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kod_mappings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    original_kod TEXT NOT NULL,
    alternative_value TEXT NOT NULL,
    created_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(original_kod, alternative_value)
);

CREATE TABLE IF NOT EXISTS actions_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    level TEXT,
    message TEXT
);
"#;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(n) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*n)),
            Value::Real(x) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*x)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(n) => Value::Integer(n),
            ValueRef::Real(x) => Value::Real(x),
            ValueRef::Text(t) | ValueRef::Blob(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        })
    }
}

/// Quote an identifier for SQLite (`"name"`, embedded quotes doubled).
fn quote_ident(name: &str) -> StoreResult<String> {
    if name.is_empty() || name.contains('\0') {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

fn column_list(columns: &ColumnSet) -> StoreResult<String> {
    let quoted = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(quoted.join(", "))
}

fn log_in(conn: &Connection, level: AuditLevel, message: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO actions_log (level, message) VALUES (?1, ?2)",
        params![level.as_str(), message],
    )?;
    trace_audit(level, message);
    Ok(())
}

fn select_row(conn: &Connection, sql: &str, row_id: RowId, width: usize) -> StoreResult<Option<Vec<Value>>> {
    conn.query_row(sql, [row_id.0], |row| {
        (0..width).map(|i| row.get::<_, Value>(i)).collect::<rusqlite::Result<Vec<_>>>()
    })
    .optional()
    .map_err(StoreError::from)
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    table: TableSpec,
}

impl SqliteStore {
    /// Open a database file and create the auxiliary tables if absent.
    /// The inventory table itself must already exist.
    pub fn open(path: impl Into<PathBuf>, table: TableSpec) -> StoreResult<Self> {
        let store = Self { path: path.into(), table };
        store.init_schema()?;
        Ok(store)
    }

    pub fn init_schema(&self) -> StoreResult<()> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &TableSpec {
        &self.table
    }

    fn connect(&self) -> StoreResult<Connection> {
        debug!(path = %self.path.display(), "opening sqlite connection");
        Ok(Connection::open(&self.path)?)
    }

    fn table_ident(&self) -> StoreResult<String> {
        quote_ident(&self.table.name)
    }

    fn row_id_ident(&self) -> StoreResult<String> {
        match &self.table.row_id_column {
            Some(col) => quote_ident(col),
            None => Ok("rowid".to_string()),
        }
    }

    fn select_by_id_sql(&self, columns: &ColumnSet) -> StoreResult<String> {
        if columns.is_empty() {
            return Err(StoreError::MissingTable(self.table.name.clone()));
        }
        Ok(format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            column_list(columns)?,
            self.table_ident()?,
            self.row_id_ident()?,
        ))
    }
}

impl StockRepository for SqliteStore {
    fn columns(&self) -> StoreResult<ColumnSet> {
        let conn = self.connect()?;
        let sql = format!("PRAGMA table_info({})", self.table_ident()?);
        let mut stmt = conn.prepare(&sql)?;
        let declared = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let ty: Option<String> = row.get(2)?;
                Ok((name, ty.unwrap_or_default()))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let skip = self.table.row_id_column.as_deref();
        let columns: Vec<Column> = declared
            .into_iter()
            .filter(|(name, _)| Some(name.as_str()) != skip)
            .map(|(name, ty)| Column::new(name, ColumnType::from_declared(&ty)))
            .collect();

        if columns.is_empty() {
            return Err(StoreError::MissingTable(self.table.name.clone()));
        }
        debug!(table = %self.table.name, count = columns.len(), "introspected columns");
        Ok(ColumnSet::new(columns))
    }

    fn fetch_all(&self, columns: &ColumnSet) -> StoreResult<Vec<StockRow>> {
        if columns.is_empty() {
            return Err(StoreError::MissingTable(self.table.name.clone()));
        }
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {}, {} FROM {}",
            self.row_id_ident()?,
            column_list(columns)?,
            self.table_ident()?,
        );
        let width = columns.len();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let fields = (0..width)
                    .map(|i| row.get::<_, Value>(i + 1))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(StockRow { row_id: RowId(id), fields })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn fetch_row(&self, columns: &ColumnSet, row_id: RowId) -> StoreResult<Option<Vec<Value>>> {
        let sql = self.select_by_id_sql(columns)?;
        let conn = self.connect()?;
        select_row(&conn, &sql, row_id, columns.len())
    }

    fn insert(&self, columns: &ColumnSet, values: &[Value]) -> StoreResult<RowId> {
        columns.check_arity(values)?;
        if columns.is_empty() {
            return Err(StoreError::MissingTable(self.table.name.clone()));
        }
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table_ident()?,
            column_list(columns)?,
            placeholders.join(", "),
        );

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute(&sql, params_from_iter(values.iter()))?;
        let row_id = RowId(tx.last_insert_rowid());
        log_in(
            &tx,
            AuditLevel::Info,
            &format!("Inserted row {row_id} with values: {}", format_values(values)),
        )?;
        tx.commit()?;
        Ok(row_id)
    }

    fn update(&self, columns: &ColumnSet, row_id: RowId, column: &str, value: &Value) -> StoreResult<Vec<Value>> {
        if columns.index_of(column).is_none() {
            return Err(StoreError::UnknownColumn(column.to_string()));
        }
        let select = self.select_by_id_sql(columns)?;
        let sql = format!(
            "UPDATE {} SET {} = ?1 WHERE {} = ?2",
            self.table_ident()?,
            quote_ident(column)?,
            self.row_id_ident()?,
        );

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let prior = select_row(&tx, &select, row_id, columns.len())?.ok_or(StoreError::RowNotFound(row_id))?;
        tx.execute(&sql, params![value, row_id.0])?;
        log_in(
            &tx,
            AuditLevel::Info,
            &format!(
                "Updated row {row_id} column {column} to {value} (old values: {})",
                format_values(&prior)
            ),
        )?;
        tx.commit()?;
        Ok(prior)
    }

    fn delete(&self, columns: &ColumnSet, row_id: RowId) -> StoreResult<Option<Vec<Value>>> {
        let select = self.select_by_id_sql(columns)?;
        let sql = format!("DELETE FROM {} WHERE {} = ?1", self.table_ident()?, self.row_id_ident()?);

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let Some(prior) = select_row(&tx, &select, row_id, columns.len())? else {
            debug!(%row_id, "delete skipped, row not found");
            return Ok(None);
        };
        tx.execute(&sql, [row_id.0])?;
        log_in(
            &tx,
            AuditLevel::Info,
            &format!("Deleted row {row_id} (old values: {})", format_values(&prior)),
        )?;
        tx.commit()?;
        Ok(Some(prior))
    }

    fn revert_insert(&self, columns: &ColumnSet, row_id: RowId, expected: &[Value]) -> StoreResult<()> {
        let select = self.select_by_id_sql(columns)?;
        let sql = format!("DELETE FROM {} WHERE {} = ?1", self.table_ident()?, self.row_id_ident()?);

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let current = select_row(&tx, &select, row_id, columns.len())?.ok_or(StoreError::RowNotFound(row_id))?;
        if current.as_slice() != expected {
            debug!(%row_id, "row differs from the one added, not deleting");
            return Err(StoreError::RowChanged(row_id));
        }
        tx.execute(&sql, [row_id.0])?;
        log_in(
            &tx,
            AuditLevel::Info,
            &format!("Undo add: deleted row {row_id} (values: {})", format_values(&current)),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn restore(&self, columns: &ColumnSet, row_id: RowId, values: &[Value]) -> StoreResult<()> {
        columns.check_arity(values)?;
        if columns.is_empty() {
            return Err(StoreError::MissingTable(self.table.name.clone()));
        }
        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, c)| Ok(format!("{} = ?{}", quote_ident(&c.name)?, i + 1)))
            .collect::<StoreResult<Vec<_>>>()?;
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            self.table_ident()?,
            assignments.join(", "),
            self.row_id_ident()?,
            values.len() + 1,
        );
        let bound = values
            .iter()
            .map(|v| v as &dyn ToSql)
            .chain(std::iter::once(&row_id.0 as &dyn ToSql));

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(&sql, params_from_iter(bound))?;
        if changed == 0 {
            return Err(StoreError::RowNotFound(row_id));
        }
        log_in(
            &tx,
            AuditLevel::Info,
            &format!("Undo update: restored row {row_id} to values: {}", format_values(values)),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn distinct_identifiers(&self) -> StoreResult<Vec<String>> {
        let kod = quote_ident(&self.table.identifier_column)?;
        let sql = format!(
            "SELECT DISTINCT {kod} FROM {} WHERE {kod} IS NOT NULL ORDER BY {kod}",
            self.table_ident()?,
        );
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let values = stmt
            .query_map([], |row| row.get::<_, Value>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(values.iter().map(Value::to_string).collect())
    }

    fn distinct_identifier_packages(&self) -> StoreResult<Vec<(String, Option<String>)>> {
        let kod = quote_ident(&self.table.identifier_column)?;
        let paket = quote_ident(&self.table.package_column)?;
        let sql = format!(
            "SELECT DISTINCT {kod}, {paket} FROM {} WHERE {kod} IS NOT NULL ORDER BY {kod}, {paket}",
            self.table_ident()?,
        );
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get::<_, Value>(0)?, row.get::<_, Value>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pairs
            .into_iter()
            .map(|(kod, paket)| (kod.to_string(), (!paket.is_null()).then(|| paket.to_string())))
            .collect())
    }
}

impl MappingStore for SqliteStore {
    fn create_mapping(&self, original: &str, alternative: &str) -> StoreResult<bool> {
        let (original, alternative) = normalize_pair(original, alternative)?;
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT INTO kod_mappings (original_kod, alternative_value) VALUES (?1, ?2)",
            params![original, alternative],
        );
        let created = match inserted {
            Ok(_) => {
                log_in(&tx, AuditLevel::Info, &format!("Created KOD mapping: {alternative} -> {original}"))?;
                true
            }
            Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
                log_in(
                    &tx,
                    AuditLevel::Warning,
                    &format!("KOD mapping already exists: {alternative} -> {original}"),
                )?;
                false
            }
            Err(e) => return Err(e.into()),
        };
        tx.commit()?;
        Ok(created)
    }

    fn resolve(&self, alternative: &str) -> StoreResult<Option<String>> {
        let alternative = alternative.trim();
        if alternative.is_empty() {
            return Ok(None);
        }
        let conn = self.connect()?;
        let sql = format!(
            "SELECT original_kod FROM kod_mappings WHERE alternative_value = ?1 {RESOLVE_ORDER} LIMIT 1"
        );
        let original = conn
            .query_row(&sql, [alternative], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(original)
    }

    fn list_mappings(&self) -> StoreResult<Vec<IdentifierMapping>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT id, original_kod, alternative_value, created_date FROM kod_mappings {RESOLVE_ORDER}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.into_iter()
            .map(|(id, original, alternative, created)| {
                Ok(IdentifierMapping {
                    id,
                    original,
                    alternative,
                    created_at: parse_timestamp(&created)?,
                })
            })
            .collect()
    }

    fn delete_mapping(&self, id: i64) -> StoreResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM kod_mappings WHERE id = ?1", [id])?;
        log_in(&tx, AuditLevel::Info, &format!("Deleted KOD mapping with ID: {id}"))?;
        tx.commit()?;
        Ok(())
    }
}

impl AuditLog for SqliteStore {
    fn log_action(&self, level: AuditLevel, message: &str) -> StoreResult<()> {
        let conn = self.connect()?;
        log_in(&conn, level, message)
    }

    fn recent_actions(&self, limit: usize) -> StoreResult<Vec<AuditEntry>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, level, message FROM actions_log ORDER BY id DESC LIMIT ?1",
        )?;
        let raw = stmt
            .query_map([limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.into_iter()
            .map(|(id, ts, level, message)| {
                Ok(AuditEntry {
                    id,
                    timestamp: parse_timestamp(&ts)?,
                    level: AuditLevel::from_stored(level.as_deref().unwrap_or("INFO")),
                    message: message.unwrap_or_default(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STOCK_TABLE: &str = r#"
        CREATE TABLE "ERP_DB" (
            "KOD" TEXT,
            "PAKET" TEXT,
            "MİKTAR" INTEGER,
            "FIYAT" REAL,
            "YER" VARCHAR(20)
        );
    "#;

    fn store() -> (TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stock.db");
        Connection::open(&path).unwrap().execute_batch(STOCK_TABLE).unwrap();
        let store = SqliteStore::open(&path, TableSpec::new("ERP_DB")).unwrap();
        (dir, store)
    }

    fn row(kod: &str, paket: Option<&str>, qty: Option<i64>, yer: &str) -> Vec<Value> {
        vec![
            Value::from(kod),
            Value::from(paket),
            Value::from(qty),
            Value::Null,
            Value::from(yer),
        ]
    }

    fn audit_messages(store: &SqliteStore) -> Vec<(AuditLevel, String)> {
        let mut entries = store.recent_actions(100).unwrap();
        entries.reverse();
        entries.into_iter().map(|e| (e.level, e.message)).collect()
    }

    #[test]
    fn columns_are_introspected_in_order() {
        let (_dir, store) = store();
        let cols = store.columns().unwrap();
        assert_eq!(cols.names(), vec!["KOD", "PAKET", "MİKTAR", "FIYAT", "YER"]);
        assert_eq!(cols.type_of("MİKTAR"), Some(ColumnType::Integer));
        assert_eq!(cols.type_of("FIYAT"), Some(ColumnType::Real));
        assert_eq!(cols.type_of("YER"), Some(ColumnType::Text));
    }

    #[test]
    fn missing_table_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("empty.db"), TableSpec::new("ERP_DB")).unwrap();
        assert!(matches!(store.columns(), Err(StoreError::MissingTable(t)) if t == "ERP_DB"));
    }

    #[test]
    fn init_schema_is_idempotent() {
        let (_dir, store) = store();
        store.init_schema().unwrap();
        store.init_schema().unwrap();
        assert!(store.list_mappings().unwrap().is_empty());
    }

    #[test]
    fn insert_then_fetch_round_trip() {
        let (_dir, store) = store();
        let cols = store.columns().unwrap();
        let values = row("A100", Some("0805"), Some(20), "B3");
        let id = store.insert(&cols, &values).unwrap();

        let rows = store.fetch_all(&cols).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_id, id);
        assert_eq!(rows[0].fields, values);

        let log = audit_messages(&store);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, AuditLevel::Info);
        assert!(log[0].1.starts_with(&format!("Inserted row {id}")));
        assert!(log[0].1.contains("[A100, 0805, 20, NULL, B3]"));
    }

    #[test]
    fn insert_arity_mismatch_writes_nothing() {
        let (_dir, store) = store();
        let cols = store.columns().unwrap();
        let err = store.insert(&cols, &[Value::from("A100")]).unwrap_err();
        assert!(matches!(err, StoreError::Arity { expected: 5, actual: 1 }));
        assert!(store.fetch_all(&cols).unwrap().is_empty());
        assert!(audit_messages(&store).is_empty());
    }

    #[test]
    fn update_returns_full_prior_row() {
        let (_dir, store) = store();
        let cols = store.columns().unwrap();
        let id = store.insert(&cols, &row("A100", None, Some(5), "B3")).unwrap();

        let prior = store.update(&cols, id, "MİKTAR", &Value::Integer(7)).unwrap();
        assert_eq!(prior, row("A100", None, Some(5), "B3"));

        let now = store.fetch_row(&cols, id).unwrap().unwrap();
        assert_eq!(now[2], Value::Integer(7));

        let log = audit_messages(&store);
        assert!(log[1].1.contains("Updated row"));
        assert!(log[1].1.contains("column MİKTAR to 7"));
    }

    #[test]
    fn update_missing_row_fails_without_write() {
        let (_dir, store) = store();
        let cols = store.columns().unwrap();
        let err = store.update(&cols, RowId(99), "MİKTAR", &Value::Integer(1)).unwrap_err();
        assert!(matches!(err, StoreError::RowNotFound(RowId(99))));
        assert!(audit_messages(&store).is_empty());
    }

    #[test]
    fn delete_returns_prior_and_is_quiet_on_missing() {
        let (_dir, store) = store();
        let cols = store.columns().unwrap();
        let id = store.insert(&cols, &row("A100", None, Some(5), "B3")).unwrap();

        let prior = store.delete(&cols, id).unwrap();
        assert_eq!(prior, Some(row("A100", None, Some(5), "B3")));
        assert!(store.fetch_all(&cols).unwrap().is_empty());

        assert_eq!(store.delete(&cols, id).unwrap(), None);
        assert_eq!(audit_messages(&store).len(), 2);
    }

    #[test]
    fn row_ids_survive_deletes() {
        let (_dir, store) = store();
        let cols = store.columns().unwrap();
        let a = store.insert(&cols, &row("A", None, None, "")).unwrap();
        let b = store.insert(&cols, &row("B", None, None, "")).unwrap();
        store.delete(&cols, a).unwrap();
        let rows = store.fetch_all(&cols).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_id, b);
    }

    #[test]
    fn restore_overwrites_every_column() {
        let (_dir, store) = store();
        let cols = store.columns().unwrap();
        let original = row("A100", Some("0805"), Some(5), "B3");
        let id = store.insert(&cols, &original).unwrap();
        store.update(&cols, id, "YER", &Value::from("C9")).unwrap();
        store.update(&cols, id, "PAKET", &Value::Null).unwrap();

        store.restore(&cols, id, &original).unwrap();
        assert_eq!(store.fetch_row(&cols, id).unwrap(), Some(original));
        assert!(audit_messages(&store).last().unwrap().1.starts_with("Undo update: restored row"));

        assert!(matches!(
            store.restore(&cols, RowId(404), &row("X", None, None, "")),
            Err(StoreError::RowNotFound(RowId(404)))
        ));
    }

    #[test]
    fn distinct_identifiers_sorted_without_nulls() {
        let (_dir, store) = store();
        let cols = store.columns().unwrap();
        for (kod, paket) in [("B200", Some("SOT23")), ("A100", Some("0805")), ("A100", Some("0805")), ("C300", None)] {
            store.insert(&cols, &row(kod, paket, None, "")).unwrap();
        }
        let mut nameless = row("", None, None, "");
        nameless[0] = Value::Null;
        store.insert(&cols, &nameless).unwrap();

        assert_eq!(store.distinct_identifiers().unwrap(), vec!["A100", "B200", "C300"]);
        assert_eq!(
            store.distinct_identifier_packages().unwrap(),
            vec![
                ("A100".to_string(), Some("0805".to_string())),
                ("B200".to_string(), Some("SOT23".to_string())),
                ("C300".to_string(), None),
            ]
        );
    }

    #[test]
    fn mapping_create_resolve_and_duplicate() {
        let (_dir, store) = store();
        assert!(store.create_mapping(" A100 ", " ALT-1 ").unwrap());
        assert_eq!(store.resolve("ALT-1").unwrap().as_deref(), Some("A100"));
        assert_eq!(store.resolve("  ALT-1\t").unwrap().as_deref(), Some("A100"));

        assert!(!store.create_mapping("A100", "ALT-1").unwrap());
        assert_eq!(store.list_mappings().unwrap().len(), 1);

        let log = audit_messages(&store);
        assert_eq!(log[0], (AuditLevel::Info, "Created KOD mapping: ALT-1 -> A100".to_string()));
        assert_eq!(log[1], (AuditLevel::Warning, "KOD mapping already exists: ALT-1 -> A100".to_string()));
    }

    #[test]
    fn resolve_is_exact() {
        let (_dir, store) = store();
        store.create_mapping("A100", "ALT-1").unwrap();
        assert_eq!(store.resolve("alt-1").unwrap(), None);
        assert_eq!(store.resolve("ALT-").unwrap(), None);
        assert_eq!(store.resolve("").unwrap(), None);
    }

    #[test]
    fn conflicting_mappings_resolve_to_most_recent() {
        let (_dir, store) = store();
        let conn = Connection::open(store.path()).unwrap();
        conn.execute_batch(
            "INSERT INTO kod_mappings (id, original_kod, alternative_value, created_date)
                 VALUES (1, 'NEWER', 'ALT', '2026-03-01 10:00:00');
             INSERT INTO kod_mappings (id, original_kod, alternative_value, created_date)
                 VALUES (2, 'OLDER', 'ALT', '2026-01-01 10:00:00');",
        )
        .unwrap();
        assert_eq!(store.resolve("ALT").unwrap().as_deref(), Some("NEWER"));
    }

    #[test]
    fn conflicting_mappings_same_timestamp_prefer_highest_id() {
        let (_dir, store) = store();
        let conn = Connection::open(store.path()).unwrap();
        conn.execute_batch(
            "INSERT INTO kod_mappings (id, original_kod, alternative_value, created_date)
                 VALUES (5, 'SECOND', 'ALT', '2026-03-01 10:00:00');
             INSERT INTO kod_mappings (id, original_kod, alternative_value, created_date)
                 VALUES (4, 'FIRST', 'ALT', '2026-03-01 10:00:00');",
        )
        .unwrap();
        assert_eq!(store.resolve("ALT").unwrap().as_deref(), Some("SECOND"));
    }

    #[test]
    fn list_is_newest_first_and_delete_is_idempotent() {
        let (_dir, store) = store();
        store.create_mapping("A100", "ALT-1").unwrap();
        store.create_mapping("B200", "ALT-2").unwrap();
        let list = store.list_mappings().unwrap();
        assert_eq!(list[0].alternative, "ALT-2");
        assert_eq!(list[1].alternative, "ALT-1");

        store.delete_mapping(list[0].id).unwrap();
        store.delete_mapping(list[0].id).unwrap();
        store.delete_mapping(9999).unwrap();
        assert_eq!(store.list_mappings().unwrap().len(), 1);
        assert_eq!(store.resolve("ALT-2").unwrap(), None);

        let deletes = audit_messages(&store)
            .into_iter()
            .filter(|(_, m)| m.starts_with("Deleted KOD mapping"))
            .count();
        assert_eq!(deletes, 3);
    }

    #[test]
    fn blank_mapping_is_rejected() {
        let (_dir, store) = store();
        assert!(matches!(store.create_mapping("A100", "  "), Err(StoreError::BlankMapping)));
        assert!(store.list_mappings().unwrap().is_empty());
    }

    #[test]
    fn explicit_row_id_column_is_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stock.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch(r#"CREATE TABLE stock (id INTEGER PRIMARY KEY AUTOINCREMENT, "KOD" TEXT, "PAKET" TEXT);"#)
            .unwrap();
        let mut spec = TableSpec::new("stock");
        spec.row_id_column = Some("id".to_string());
        let store = SqliteStore::open(&path, spec).unwrap();

        let cols = store.columns().unwrap();
        assert_eq!(cols.names(), vec!["KOD", "PAKET"]);
        let id = store.insert(&cols, &[Value::from("A100"), Value::Null]).unwrap();
        assert_eq!(store.fetch_all(&cols).unwrap()[0].row_id, id);

        store.delete(&cols, id).unwrap();
        let next = store.insert(&cols, &[Value::from("B200"), Value::Null]).unwrap();
        assert_ne!(next, id);
    }

    #[test]
    fn revert_insert_checks_row_before_deleting() {
        let (_dir, store) = store();
        let cols = store.columns().unwrap();
        let values = row("A100", None, Some(5), "B3");
        let id = store.insert(&cols, &values).unwrap();

        let edited = row("A100", None, Some(6), "B3");
        assert!(matches!(store.revert_insert(&cols, id, &edited), Err(StoreError::RowChanged(_))));
        assert_eq!(audit_messages(&store).len(), 1);

        store.revert_insert(&cols, id, &values).unwrap();
        assert!(store.fetch_row(&cols, id).unwrap().is_none());
        let log = audit_messages(&store);
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].1, format!("Undo add: deleted row {id} (values: [A100, NULL, 5, NULL, B3])"));

        assert!(matches!(store.revert_insert(&cols, id, &values), Err(StoreError::RowNotFound(_))));
        assert_eq!(audit_messages(&store).len(), 2);
    }
}
