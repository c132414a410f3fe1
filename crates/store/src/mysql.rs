// MySQL backend (cargo feature `mysql`)
//
// Same contract as the SQLite store. Calls are blocking: each one opens a
// fresh connection and drives it to completion on a private current-thread
// runtime. Values are read back as text and coerced through the column model.

use sqlx::mysql::{MySql, MySqlArguments, MySqlConnection};
use sqlx::query::Query;
use sqlx::{Connection, Row};
use tokio::runtime::Runtime;
use tracing::debug;

use crate::audit::{parse_timestamp, trace_audit, AuditEntry, AuditLevel, AuditLog};
use crate::error::{StoreError, StoreResult};
use crate::mapping::{normalize_pair, IdentifierMapping, MappingStore, RESOLVE_ORDER};
use crate::repository::{StockRepository, TableSpec};
use crate::row::{RowId, StockRow};
use crate::schema::{Column, ColumnSet, ColumnType};
use crate::value::{format_values, Value};

// Binary collation keeps lookups case-exact, matching SQLite.
const CREATE_MAPPINGS: &str = "CREATE TABLE IF NOT EXISTS kod_mappings (
    id INT AUTO_INCREMENT PRIMARY KEY,
    original_kod VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL,
    alternative_value VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL,
    created_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    UNIQUE KEY unique_mapping (original_kod, alternative_value)
)";

const CREATE_ACTIONS_LOG: &str = "CREATE TABLE IF NOT EXISTS actions_log (
    id INT AUTO_INCREMENT PRIMARY KEY,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    level VARCHAR(20),
    message TEXT
)";

const DEFAULT_ROW_ID: &str = "id";

type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

fn bind_value<'q>(query: MySqlQuery<'q>, value: &'q Value) -> MySqlQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Integer(n) => query.bind(*n),
        Value::Real(x) => query.bind(*x),
        Value::Text(s) => query.bind(s.as_str()),
    }
}

fn quote_ident(name: &str) -> StoreResult<String> {
    if name.is_empty() || name.contains('\0') {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("`{}`", name.replace('`', "``")))
}

fn cast_list(columns: &ColumnSet) -> StoreResult<String> {
    let casts = columns
        .iter()
        .map(|c| Ok(format!("CAST({} AS CHAR)", quote_ident(&c.name)?)))
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(casts.join(", "))
}

fn read_fields(columns: &ColumnSet, row: &sqlx::mysql::MySqlRow, offset: usize) -> StoreResult<Vec<Value>> {
    let texts = (0..columns.len())
        .map(|i| row.try_get::<Option<String>, _>(i + offset))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(coerce_fields(columns, texts))
}

/// Column values as returned by `CAST(... AS CHAR)`, in column order.
fn coerce_fields(columns: &ColumnSet, texts: Vec<Option<String>>) -> Vec<Value> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| columns.coerce_stored(i, text))
        .collect()
}

async fn log_in(conn: &mut MySqlConnection, level: AuditLevel, message: &str) -> StoreResult<()> {
    sqlx::query("INSERT INTO actions_log (level, message) VALUES (?, ?)")
        .bind(level.as_str())
        .bind(message)
        .execute(&mut *conn)
        .await?;
    trace_audit(level, message);
    Ok(())
}

#[derive(Debug)]
pub struct MySqlStore {
    url: String,
    table: TableSpec,
    runtime: Runtime,
}

impl MySqlStore {
    /// Connect once to create the auxiliary tables; later calls reconnect.
    pub fn open(url: impl Into<String>, table: TableSpec) -> StoreResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let store = Self { url: url.into(), table, runtime };
        store.init_schema()?;
        Ok(store)
    }

    pub fn init_schema(&self) -> StoreResult<()> {
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            sqlx::query(CREATE_MAPPINGS).execute(&mut conn).await?;
            sqlx::query(CREATE_ACTIONS_LOG).execute(&mut conn).await?;
            Ok(())
        })
    }

    pub fn table(&self) -> &TableSpec {
        &self.table
    }

    async fn connect(&self) -> StoreResult<MySqlConnection> {
        debug!("opening mysql connection");
        Ok(MySqlConnection::connect(&self.url).await?)
    }

    fn table_ident(&self) -> StoreResult<String> {
        quote_ident(&self.table.name)
    }

    fn row_id_name(&self) -> &str {
        self.table.row_id_column.as_deref().unwrap_or(DEFAULT_ROW_ID)
    }

    fn select_by_id_sql(&self, columns: &ColumnSet) -> StoreResult<String> {
        if columns.is_empty() {
            return Err(StoreError::MissingTable(self.table.name.clone()));
        }
        Ok(format!(
            "SELECT {} FROM {} WHERE {} = ?",
            cast_list(columns)?,
            self.table_ident()?,
            quote_ident(self.row_id_name())?,
        ))
    }

    async fn select_row(
        conn: &mut MySqlConnection,
        sql: &str,
        columns: &ColumnSet,
        row_id: RowId,
    ) -> StoreResult<Option<Vec<Value>>> {
        let row = sqlx::query(sql).bind(row_id.0).fetch_optional(&mut *conn).await?;
        row.map(|r| read_fields(columns, &r, 0)).transpose()
    }
}

impl StockRepository for MySqlStore {
    fn columns(&self) -> StoreResult<ColumnSet> {
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            let rows = sqlx::query(
                "SELECT CAST(COLUMN_NAME AS CHAR), CAST(COLUMN_TYPE AS CHAR)
                 FROM information_schema.COLUMNS
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
                 ORDER BY ORDINAL_POSITION",
            )
            .bind(&self.table.name)
            .fetch_all(&mut conn)
            .await?;

            let mut columns = Vec::with_capacity(rows.len());
            for row in &rows {
                let name: String = row.try_get(0)?;
                let declared: Option<String> = row.try_get(1)?;
                if name == self.row_id_name() {
                    continue;
                }
                columns.push(Column::new(name, ColumnType::from_declared(declared.as_deref().unwrap_or(""))));
            }
            if columns.is_empty() {
                return Err(StoreError::MissingTable(self.table.name.clone()));
            }
            Ok(ColumnSet::new(columns))
        })
    }

    fn fetch_all(&self, columns: &ColumnSet) -> StoreResult<Vec<StockRow>> {
        if columns.is_empty() {
            return Err(StoreError::MissingTable(self.table.name.clone()));
        }
        let sql = format!(
            "SELECT CAST({} AS SIGNED), {} FROM {}",
            quote_ident(self.row_id_name())?,
            cast_list(columns)?,
            self.table_ident()?,
        );
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            let rows = sqlx::query(&sql).fetch_all(&mut conn).await?;
            rows.iter()
                .map(|r| {
                    Ok(StockRow {
                        row_id: RowId(r.try_get(0)?),
                        fields: read_fields(columns, r, 1)?,
                    })
                })
                .collect()
        })
    }

    fn fetch_row(&self, columns: &ColumnSet, row_id: RowId) -> StoreResult<Option<Vec<Value>>> {
        let sql = self.select_by_id_sql(columns)?;
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            Self::select_row(&mut conn, &sql, columns, row_id).await
        })
    }

    fn insert(&self, columns: &ColumnSet, values: &[Value]) -> StoreResult<RowId> {
        columns.check_arity(values)?;
        if columns.is_empty() {
            return Err(StoreError::MissingTable(self.table.name.clone()));
        }
        let names = columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<StoreResult<Vec<_>>>()?;
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table_ident()?,
            names.join(", "),
            vec!["?"; values.len()].join(", "),
        );
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            let mut tx = conn.begin().await?;
            let query = values.iter().fold(sqlx::query(&sql), bind_value);
            let done = query.execute(&mut *tx).await?;
            let row_id = RowId(done.last_insert_id() as i64);
            log_in(
                &mut tx,
                AuditLevel::Info,
                &format!("Inserted row {row_id} with values: {}", format_values(values)),
            )
            .await?;
            tx.commit().await?;
            Ok(row_id)
        })
    }

    fn update(&self, columns: &ColumnSet, row_id: RowId, column: &str, value: &Value) -> StoreResult<Vec<Value>> {
        if columns.index_of(column).is_none() {
            return Err(StoreError::UnknownColumn(column.to_string()));
        }
        let select = self.select_by_id_sql(columns)?;
        let sql = format!(
            "UPDATE {} SET {} = ? WHERE {} = ?",
            self.table_ident()?,
            quote_ident(column)?,
            quote_ident(self.row_id_name())?,
        );
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            let mut tx = conn.begin().await?;
            let prior = Self::select_row(&mut tx, &select, columns, row_id)
                .await?
                .ok_or(StoreError::RowNotFound(row_id))?;
            bind_value(sqlx::query(&sql), value)
                .bind(row_id.0)
                .execute(&mut *tx)
                .await?;
            log_in(
                &mut tx,
                AuditLevel::Info,
                &format!(
                    "Updated row {row_id} column {column} to {value} (old values: {})",
                    format_values(&prior)
                ),
            )
            .await?;
            tx.commit().await?;
            Ok(prior)
        })
    }

    fn delete(&self, columns: &ColumnSet, row_id: RowId) -> StoreResult<Option<Vec<Value>>> {
        let select = self.select_by_id_sql(columns)?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            self.table_ident()?,
            quote_ident(self.row_id_name())?,
        );
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            let mut tx = conn.begin().await?;
            let Some(prior) = Self::select_row(&mut tx, &select, columns, row_id).await? else {
                debug!(%row_id, "delete skipped, row not found");
                return Ok(None);
            };
            sqlx::query(&sql).bind(row_id.0).execute(&mut *tx).await?;
            log_in(
                &mut tx,
                AuditLevel::Info,
                &format!("Deleted row {row_id} (old values: {})", format_values(&prior)),
            )
            .await?;
            tx.commit().await?;
            Ok(Some(prior))
        })
    }

    fn revert_insert(&self, columns: &ColumnSet, row_id: RowId, expected: &[Value]) -> StoreResult<()> {
        let select = self.select_by_id_sql(columns)?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            self.table_ident()?,
            quote_ident(self.row_id_name())?,
        );
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            let mut tx = conn.begin().await?;
            let current = Self::select_row(&mut tx, &select, columns, row_id)
                .await?
                .ok_or(StoreError::RowNotFound(row_id))?;
            if current.as_slice() != expected {
                debug!(%row_id, "row differs from the one added, not deleting");
                return Err(StoreError::RowChanged(row_id));
            }
            sqlx::query(&sql).bind(row_id.0).execute(&mut *tx).await?;
            log_in(
                &mut tx,
                AuditLevel::Info,
                &format!("Undo add: deleted row {row_id} (values: {})", format_values(&current)),
            )
            .await?;
            tx.commit().await?;
            Ok(())
        })
    }

    fn restore(&self, columns: &ColumnSet, row_id: RowId, values: &[Value]) -> StoreResult<()> {
        columns.check_arity(values)?;
        let select = self.select_by_id_sql(columns)?;
        let assignments = columns
            .iter()
            .map(|c| Ok(format!("{} = ?", quote_ident(&c.name)?)))
            .collect::<StoreResult<Vec<_>>>()?;
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            self.table_ident()?,
            assignments.join(", "),
            quote_ident(self.row_id_name())?,
        );
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            let mut tx = conn.begin().await?;
            // rows_affected is 0 for an unchanged row on MySQL, so check existence first
            if Self::select_row(&mut tx, &select, columns, row_id).await?.is_none() {
                return Err(StoreError::RowNotFound(row_id));
            }
            values
                .iter()
                .fold(sqlx::query(&sql), bind_value)
                .bind(row_id.0)
                .execute(&mut *tx)
                .await?;
            log_in(
                &mut tx,
                AuditLevel::Info,
                &format!("Undo update: restored row {row_id} to values: {}", format_values(values)),
            )
            .await?;
            tx.commit().await?;
            Ok(())
        })
    }

    fn distinct_identifiers(&self) -> StoreResult<Vec<String>> {
        let kod = quote_ident(&self.table.identifier_column)?;
        let sql = format!(
            "SELECT DISTINCT CAST({kod} AS CHAR) AS kod FROM {} WHERE {kod} IS NOT NULL ORDER BY kod",
            self.table_ident()?,
        );
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            let rows = sqlx::query(&sql).fetch_all(&mut conn).await?;
            rows.iter().map(|r| Ok(r.try_get::<String, _>(0)?)).collect()
        })
    }

    fn distinct_identifier_packages(&self) -> StoreResult<Vec<(String, Option<String>)>> {
        let kod = quote_ident(&self.table.identifier_column)?;
        let paket = quote_ident(&self.table.package_column)?;
        let sql = format!(
            "SELECT DISTINCT CAST({kod} AS CHAR) AS kod, CAST({paket} AS CHAR) AS paket
             FROM {} WHERE {kod} IS NOT NULL ORDER BY kod, paket",
            self.table_ident()?,
        );
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            let rows = sqlx::query(&sql).fetch_all(&mut conn).await?;
            rows.iter()
                .map(|r| Ok((r.try_get::<String, _>(0)?, r.try_get::<Option<String>, _>(1)?)))
                .collect()
        })
    }
}

impl MappingStore for MySqlStore {
    fn create_mapping(&self, original: &str, alternative: &str) -> StoreResult<bool> {
        let (original, alternative) = normalize_pair(original, alternative)?;
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            let mut tx = conn.begin().await?;
            let inserted = sqlx::query("INSERT INTO kod_mappings (original_kod, alternative_value) VALUES (?, ?)")
                .bind(&original)
                .bind(&alternative)
                .execute(&mut *tx)
                .await;
            let created = match inserted {
                Ok(_) => {
                    log_in(&mut tx, AuditLevel::Info, &format!("Created KOD mapping: {alternative} -> {original}"))
                        .await?;
                    true
                }
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    log_in(
                        &mut tx,
                        AuditLevel::Warning,
                        &format!("KOD mapping already exists: {alternative} -> {original}"),
                    )
                    .await?;
                    false
                }
                Err(e) => return Err(e.into()),
            };
            tx.commit().await?;
            Ok(created)
        })
    }

    fn resolve(&self, alternative: &str) -> StoreResult<Option<String>> {
        let alternative = alternative.trim();
        if alternative.is_empty() {
            return Ok(None);
        }
        let sql = format!("SELECT original_kod FROM kod_mappings WHERE alternative_value = ? {RESOLVE_ORDER} LIMIT 1");
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            let row = sqlx::query(&sql).bind(alternative).fetch_optional(&mut conn).await?;
            Ok(row.map(|r| r.try_get::<String, _>(0)).transpose()?)
        })
    }

    fn list_mappings(&self) -> StoreResult<Vec<IdentifierMapping>> {
        let sql = format!(
            "SELECT CAST(id AS SIGNED), original_kod, alternative_value, CAST(created_date AS CHAR)
             FROM kod_mappings {RESOLVE_ORDER}"
        );
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            let rows = sqlx::query(&sql).fetch_all(&mut conn).await?;
            rows.iter()
                .map(|r| {
                    let created: String = r.try_get(3)?;
                    Ok(IdentifierMapping {
                        id: r.try_get(0)?,
                        original: r.try_get(1)?,
                        alternative: r.try_get(2)?,
                        created_at: parse_timestamp(&created)?,
                    })
                })
                .collect()
        })
    }

    fn delete_mapping(&self, id: i64) -> StoreResult<()> {
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            let mut tx = conn.begin().await?;
            sqlx::query("DELETE FROM kod_mappings WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            log_in(&mut tx, AuditLevel::Info, &format!("Deleted KOD mapping with ID: {id}")).await?;
            tx.commit().await?;
            Ok(())
        })
    }
}

impl AuditLog for MySqlStore {
    fn log_action(&self, level: AuditLevel, message: &str) -> StoreResult<()> {
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            log_in(&mut conn, level, message).await
        })
    }

    fn recent_actions(&self, limit: usize) -> StoreResult<Vec<AuditEntry>> {
        self.runtime.block_on(async {
            let mut conn = self.connect().await?;
            let rows = sqlx::query(
                "SELECT CAST(id AS SIGNED), CAST(timestamp AS CHAR), level, message
                 FROM actions_log ORDER BY id DESC LIMIT ?",
            )
            .bind(limit as i64)
            .fetch_all(&mut conn)
            .await?;
            rows.iter()
                .map(|r| {
                    let ts: String = r.try_get(1)?;
                    let level: Option<String> = r.try_get(2)?;
                    let message: Option<String> = r.try_get(3)?;
                    Ok(AuditEntry {
                        id: r.try_get(0)?,
                        timestamp: parse_timestamp(&ts)?,
                        level: AuditLevel::from_stored(level.as_deref().unwrap_or("INFO")),
                        message: message.unwrap_or_default(),
                    })
                })
                .collect()
        })
    }
}
