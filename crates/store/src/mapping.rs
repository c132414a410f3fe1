//! Identifier mapping store (`kod_mappings` table).
//!
//! Maps alternative identifiers found in uploaded files onto canonical stock
//! identifiers. Rows are created after a failed direct match and deleted
//! explicitly; they are never updated in place.
//!
//! Uniqueness is enforced over the `(original, alternative)` pair only, so one
//! alternative can end up mapped to several originals. `resolve` then returns
//! the most recently created mapping; equal timestamps fall back to the
//! highest id.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentifierMapping {
    pub id: i64,
    /// Canonical identifier; expected to exist in the inventory table but not
    /// checked at write time.
    pub original: String,
    pub alternative: String,
    pub created_at: NaiveDateTime,
}

pub trait MappingStore {
    /// Returns `false` without writing when the exact trimmed pair exists.
    fn create_mapping(&self, original: &str, alternative: &str) -> StoreResult<bool>;

    fn resolve(&self, alternative: &str) -> StoreResult<Option<String>>;

    /// Most recently created first.
    fn list_mappings(&self) -> StoreResult<Vec<IdentifierMapping>>;

    /// No error when `id` does not exist.
    fn delete_mapping(&self, id: i64) -> StoreResult<()>;
}

pub(crate) const RESOLVE_ORDER: &str = "ORDER BY created_date DESC, id DESC";

pub(crate) fn normalize_pair(original: &str, alternative: &str) -> StoreResult<(String, String)> {
    let (original, alternative) = (original.trim(), alternative.trim());
    if original.is_empty() || alternative.is_empty() {
        return Err(StoreError::BlankMapping);
    }
    Ok((original.to_string(), alternative.to_string()))
}

/// Filter `(identifier, package)` candidates by a case-insensitive substring
/// of either field.
pub fn filter_candidates<'a>(
    pairs: &'a [(String, Option<String>)],
    query: &str,
) -> Vec<&'a (String, Option<String>)> {
    let needle = query.to_lowercase();
    pairs
        .iter()
        .filter(|(kod, paket)| {
            kod.to_lowercase().contains(&needle)
                || paket
                    .as_deref()
                    .map(|p| p.to_lowercase().contains(&needle))
                    .unwrap_or(false)
        })
        .collect()
}
