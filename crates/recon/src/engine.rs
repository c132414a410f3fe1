use std::collections::HashMap;

use stockmatch_store::{ColumnSet, MappingStore, StockRow, Value};
use tracing::debug;

use crate::config::{ReconConfig, UploadColumns};
use crate::error::ReconError;
use crate::model::{LineResult, MatchKind, ReconMeta, ReconResult, ReconSummary, UploadLine};

/// Classify every upload line against a fresh stock snapshot.
///
/// Matching order per line: exact trimmed identifier, then the mapping
/// table. When several stock rows share an identifier the first one in
/// snapshot order is used. Mapping lookups are memoized for the run only.
pub fn reconcile<M: MappingStore + ?Sized>(
    config: &ReconConfig,
    columns: &ColumnSet,
    rows: &[StockRow],
    mappings: &M,
    lines: &[UploadLine],
) -> Result<ReconResult, ReconError> {
    config.validate_against(columns)?;
    let stock = &config.stock;
    let id_idx = columns
        .index_of(&stock.identifier_column)
        .ok_or_else(|| ReconError::MissingColumn {
            source_name: "stock table".into(),
            column: stock.identifier_column.clone(),
        })?;
    let qty_idx = columns.index_of(&stock.quantity_column);
    let loc_idx = columns.index_of(&stock.location_column);

    let mut index: HashMap<String, &StockRow> = HashMap::new();
    for row in rows {
        if let Some(key) = row.fields.get(id_idx).and_then(Value::as_key) {
            index.entry(key).or_insert(row);
        }
    }

    let mut resolved: HashMap<String, Option<String>> = HashMap::new();
    let mut results = Vec::with_capacity(lines.len());

    for line in lines {
        let value = line.value.trim().to_string();

        let (kind, row) = if value.is_empty() {
            (MatchKind::Unmatched, None)
        } else if let Some(row) = index.get(&value) {
            (MatchKind::Direct, Some(*row))
        } else {
            let original = match resolved.get(&value) {
                Some(hit) => hit.clone(),
                None => {
                    let hit = mappings.resolve(&value)?;
                    resolved.insert(value.clone(), hit.clone());
                    hit
                }
            };
            match original.and_then(|o| index.get(o.trim()).copied()) {
                Some(row) => (MatchKind::Mapped, Some(row)),
                None => (MatchKind::Unmatched, None),
            }
        };

        let on_hand = row.and_then(|r| qty_idx.and_then(|i| r.fields.get(i)).cloned());
        let location = row
            .and_then(|r| loc_idx.and_then(|i| r.fields.get(i)))
            .map(Value::to_string)
            .unwrap_or_default();
        let stock_check = match row {
            Some(_) => stock_check(line.quantity.as_deref(), on_hand.as_ref()),
            None => None,
        };

        results.push(LineResult {
            line_no: line.line_no,
            value,
            kind,
            matched_identifier: row.and_then(|r| r.fields.get(id_idx)).and_then(Value::as_key),
            matched_row: row.map(|r| r.row_id),
            on_hand,
            quantity: line.quantity.clone(),
            original_quantity: line.quantity.clone(),
            location,
            stock_check,
        });
    }

    let summary = ReconSummary::from_lines(&results);
    debug!(
        lines = summary.total_lines,
        direct = summary.direct,
        mapped = summary.mapped,
        unmatched = summary.unmatched,
        "reconciliation finished"
    );

    Ok(ReconResult {
        meta: ReconMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            multiplier: 1,
        },
        summary,
        lines: results,
    })
}

/// Stock sufficiency signal for a requested quantity.
///
/// Requesting more than is on hand yields the (negative) difference
/// `on_hand - requested`; otherwise the requested quantity itself. Blank or
/// non-integer input on either side yields `None`.
pub fn stock_check(requested: Option<&str>, on_hand: Option<&Value>) -> Option<i64> {
    let requested: i64 = requested.map(str::trim).filter(|s| !s.is_empty())?.parse().ok()?;
    let on_hand = on_hand?.as_integer()?;
    if requested > on_hand {
        on_hand.checked_sub(requested)
    } else {
        Some(requested)
    }
}

/// Turn a header row plus data rows into upload lines.
///
/// The value column is required; the quantity column is optional. Rows with
/// every cell blank are skipped.
pub fn load_upload_lines(
    headers: &[String],
    rows: &[Vec<String>],
    upload: &UploadColumns,
) -> Result<Vec<UploadLine>, ReconError> {
    let value_idx = headers
        .iter()
        .position(|h| h.trim() == upload.value_column)
        .ok_or_else(|| ReconError::MissingColumn {
            source_name: "upload".into(),
            column: upload.value_column.clone(),
        })?;
    let qty_idx = headers.iter().position(|h| h.trim() == upload.quantity_column);
    if qty_idx.is_none() {
        debug!(column = %upload.quantity_column, "upload has no quantity column");
    }

    let mut lines = Vec::with_capacity(rows.len());
    for (i, record) in rows.iter().enumerate() {
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let cell = |idx: usize| record.get(idx).cloned().unwrap_or_default();

        let fields = headers
            .iter()
            .enumerate()
            .map(|(j, h)| (h.clone(), cell(j)))
            .collect();

        lines.push(UploadLine {
            line_no: i + 1,
            value: cell(value_idx),
            quantity: qty_idx.map(cell),
            fields,
        });
    }
    Ok(lines)
}
