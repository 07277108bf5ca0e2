//! Error types for calexport.

use thiserror::Error;

/// Errors that can occur while exporting.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No directory record of type '{record_type}' with short name '{short_name}'")]
    RecordNotFound {
        record_type: String,
        short_name: String,
    },

    #[error(
        "Unknown record type '{0}' \
         (expected users, groups, locations, resources or addresses)"
    )]
    UnknownRecordType(String),

    #[error("No home with UID '{0}'")]
    HomeNotFound(String),

    #[error("Collection '{name}' not found in home '{home}'")]
    CollectionNotFound { home: String, name: String },

    #[error("Contacts can only be exported to a directory")]
    ContactsRequireDirectory,

    #[error("Nothing to export: no UID, record, user or --all given")]
    NothingToExport,

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for export operations.
pub type ExportResult<T> = Result<T, ExportError>;
