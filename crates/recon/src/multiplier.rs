//! Quantity multiplier.
//!
//! Re-derives every line's quantity from the quantity originally read from
//! the file, then recomputes the stock check. Classification, matched row and
//! box come from the first pass and are not recomputed.

use tracing::warn;

use crate::engine::stock_check;
use crate::model::{ReconResult, ReconSummary};

/// Parse multiplier text. Anything that is not an integer falls back to 1.
pub fn parse_multiplier(input: &str) -> i64 {
    input.trim().parse().unwrap_or(1)
}

/// Apply `multiplier` to every line's original quantity.
///
/// Returns the updated result and the line numbers left unchanged because
/// their original quantity was blank, not an integer, or overflowed.
pub fn apply_multiplier(result: &ReconResult, multiplier: i64) -> (ReconResult, Vec<usize>) {
    let mut out = result.clone();
    let mut skipped = Vec::new();

    for line in &mut out.lines {
        let original = line.original_quantity.as_deref().map(str::trim).unwrap_or("");
        let scaled = original
            .parse::<i64>()
            .ok()
            .and_then(|q| q.checked_mul(multiplier));

        match scaled {
            Some(q) => line.quantity = Some(q.to_string()),
            None => {
                line.quantity = line.original_quantity.clone();
                skipped.push(line.line_no);
            }
        }

        if line.matched_row.is_some() {
            line.stock_check = stock_check(line.quantity.as_deref(), line.on_hand.as_ref());
        }
    }

    if !skipped.is_empty() {
        warn!(count = skipped.len(), "quantity multiplier skipped lines with invalid or missing quantity");
    }

    out.meta.multiplier = multiplier;
    out.summary = ReconSummary::from_lines(&out.lines);
    (out, skipped)
}
