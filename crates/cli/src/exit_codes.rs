//! CLI Exit Code Registry
//!
//! Single source of truth for `stockmatch` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | Success                                          |
//! | 1    | General error (unspecified)                      |
//! | 2    | Usage error (bad args, unknown column)           |
//! | 3    | Validation: input does not fit the column type   |
//! | 4    | Storage: database unreachable or query failed    |
//! | 5    | Duplicate mapping (pair already exists)          |
//! | 6    | Upload/import: unreadable file, missing column   |
//! | 7    | Config: unreadable or invalid settings           |
//! | 8    | Unmatched lines present (`reconcile --strict`)   |

use stockmatch_config::ConfigError;
use stockmatch_io::IoError;
use stockmatch_recon::ReconError;
use stockmatch_store::StoreError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unknown column or row.
pub const EXIT_USAGE: u8 = 2;

/// A value did not parse to its column's declared type. Nothing was written.
pub const EXIT_VALIDATION: u8 = 3;

/// Database connection or statement failure.
pub const EXIT_STORAGE: u8 = 4;

/// `mapping add` found the exact pair already present.
pub const EXIT_DUPLICATE_MAPPING: u8 = 5;

/// Upload file unreadable, unsupported or missing the value column.
pub const EXIT_UPLOAD: u8 = 6;

/// Settings file unreadable or invalid.
pub const EXIT_CONFIG: u8 = 7;

/// `reconcile --strict` and at least one line is unmatched.
pub const EXIT_UNMATCHED: u8 = 8;

pub fn store_exit_code(err: &StoreError) -> u8 {
    match err {
        e if e.is_validation() => EXIT_VALIDATION,
        StoreError::RowNotFound(_) | StoreError::InvalidIdentifier(_) => EXIT_USAGE,
        StoreError::RowChanged(_) => EXIT_ERROR,
        _ => EXIT_STORAGE,
    }
}

pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::Store(e) => store_exit_code(e),
        ReconError::MissingColumn { .. } => EXIT_UPLOAD,
    }
}

pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::UnsupportedFormat(_) => EXIT_USAGE,
        _ => EXIT_UPLOAD,
    }
}

pub fn config_exit_code(_err: &ConfigError) -> u8 {
    EXIT_CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockmatch_store::{ColumnType, RowId};

    #[test]
    fn validation_errors_map_to_validation_code() {
        let err = StoreError::Validation {
            column: "MİKTAR".into(),
            expected: ColumnType::Integer,
            value: "abc".into(),
        };
        assert_eq!(store_exit_code(&err), EXIT_VALIDATION);
        assert_eq!(store_exit_code(&StoreError::BlankMapping), EXIT_VALIDATION);
        assert_eq!(store_exit_code(&StoreError::RowNotFound(RowId(9))), EXIT_USAGE);
        assert_eq!(store_exit_code(&StoreError::RowChanged(RowId(9))), EXIT_ERROR);
        assert_eq!(store_exit_code(&StoreError::MissingTable("ERP_DB".into())), EXIT_STORAGE);
    }

    #[test]
    fn recon_errors_unwrap_store_errors() {
        let err = ReconError::Store(StoreError::MissingTable("ERP_DB".into()));
        assert_eq!(recon_exit_code(&err), EXIT_STORAGE);
        let err = ReconError::MissingColumn { source_name: "upload".into(), column: "Value".into() };
        assert_eq!(recon_exit_code(&err), EXIT_UPLOAD);
    }

    #[test]
    fn codes_are_distinct() {
        let mut codes = vec![
            EXIT_SUCCESS, EXIT_ERROR, EXIT_USAGE, EXIT_VALIDATION, EXIT_STORAGE,
            EXIT_DUPLICATE_MAPPING, EXIT_UPLOAD, EXIT_CONFIG, EXIT_UNMATCHED,
        ];
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 9);
    }
}
