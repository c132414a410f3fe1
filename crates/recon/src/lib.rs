//! `stockmatch-recon`: reconciles uploaded order lines against the stock table.
//!
//! Pure engine crate: receives a stock snapshot, a mapping lookup and the
//! uploaded lines, returns classified lines with stock checks. File formats
//! and storage live elsewhere.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod multiplier;

pub use config::ReconConfig;
pub use engine::{load_upload_lines, reconcile, stock_check};
pub use error::ReconError;
pub use model::{LineResult, MatchKind, ReconResult, ReconSummary, UploadLine};
pub use multiplier::{apply_multiplier, parse_multiplier};
