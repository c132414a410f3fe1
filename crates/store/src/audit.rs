// Append-only audit trail (`actions_log` table)

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditLevel {
    /// Successful mutation.
    Info,
    /// Rejected duplicate mapping.
    Warning,
}

impl AuditLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }

    /// Levels written by other tools are read back as `Info`.
    pub fn from_stored(s: &str) -> Self {
        if s.eq_ignore_ascii_case("WARNING") {
            Self::Warning
        } else {
            Self::Info
        }
    }
}

impl std::fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub level: AuditLevel,
    pub message: String,
}

pub trait AuditLog {
    fn log_action(&self, level: AuditLevel, message: &str) -> StoreResult<()>;

    /// Newest first.
    fn recent_actions(&self, limit: usize) -> StoreResult<Vec<AuditEntry>>;
}

/// Mirror an audit entry into the process log.
pub(crate) fn trace_audit(level: AuditLevel, message: &str) {
    match level {
        AuditLevel::Info => tracing::info!(target: "stockmatch::audit", "{message}"),
        AuditLevel::Warning => tracing::warn!(target: "stockmatch::audit", "{message}"),
    }
}

/// Parse `CURRENT_TIMESTAMP` text as written by SQLite and MySQL.
pub(crate) fn parse_timestamp(s: &str) -> StoreResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|_| StoreError::Timestamp(s.to_string()))
}
