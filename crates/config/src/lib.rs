//! Settings for stockmatch: storage backend, inventory table layout,
//! upload column names and the default log filter.

pub mod error;
pub mod settings;

pub use error::ConfigError;
pub use settings::{BackendKind, LogSettings, Settings, StorageSettings, TableSettings, UploadSettings};
