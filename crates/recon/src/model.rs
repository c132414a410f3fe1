use std::collections::HashMap;

use serde::Serialize;
use stockmatch_store::{RowId, Value};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One line of an uploaded order file.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadLine {
    /// 1-based position among data rows (header excluded).
    pub line_no: usize,
    pub value: String,
    /// Raw quantity text; `None` when the file has no quantity column.
    pub quantity: Option<String>,
    pub fields: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Trimmed value equals a stock identifier.
    Direct,
    /// Value resolved through the mapping table to a stock identifier.
    Mapped,
    Unmatched,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Mapped => write!(f, "mapped"),
            Self::Unmatched => write!(f, "unmatched"),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineResult {
    pub line_no: usize,
    /// Uploaded value, trimmed.
    pub value: String,
    pub kind: MatchKind,
    /// Stock identifier of the matched row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_row: Option<RowId>,
    /// Quantity field of the matched row as stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_hand: Option<Value>,
    /// Quantity used for the stock check (after any multiplier).
    pub quantity: Option<String>,
    /// Quantity as read from the file.
    pub original_quantity: Option<String>,
    /// Location of the matched row; empty when unmatched.
    #[serde(rename = "box")]
    pub location: String,
    pub stock_check: Option<i64>,
}

impl LineResult {
    pub fn is_insufficient(&self) -> bool {
        self.stock_check.map(|c| c < 0).unwrap_or(false)
    }

    /// Stock check rendered for tables: blank when absent.
    pub fn stock_check_display(&self) -> String {
        self.stock_check.map(|c| c.to_string()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub total_lines: usize,
    pub direct: usize,
    pub mapped: usize,
    pub unmatched: usize,
    /// Lines with a negative stock check.
    pub insufficient: usize,
}

impl ReconSummary {
    pub fn from_lines(lines: &[LineResult]) -> Self {
        let mut summary = Self { total_lines: lines.len(), ..Self::default() };
        for line in lines {
            match line.kind {
                MatchKind::Direct => summary.direct += 1,
                MatchKind::Mapped => summary.mapped += 1,
                MatchKind::Unmatched => summary.unmatched += 1,
            }
            if line.is_insufficient() {
                summary.insufficient += 1;
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub run_at: String,
    pub multiplier: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub lines: Vec<LineResult>,
}

impl ReconResult {
    /// Distinct unmatched values in first-seen order, blanks excluded.
    /// These are the candidates for new mappings.
    pub fn unmatched_values(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.lines
            .iter()
            .filter(|l| l.kind == MatchKind::Unmatched && !l.value.is_empty())
            .map(|l| l.value.as_str())
            .filter(|v| seen.insert(*v))
            .collect()
    }
}
