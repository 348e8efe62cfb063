//! Common error types for the fault tracker

use thiserror::Error;

/// Common result type for fault tracker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the fault tracker crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uploaded batch lacks a column the ingest schema requires.
    ///
    /// Raised before any row is looked at, so nothing has been written.
    #[error("Required column missing from upload: {column}")]
    SchemaMismatch { column: String },

    /// Bulletin number already belongs to a different record
    #[error("Bulletin number already in use: {bulletin_number}")]
    KeyConflict { bulletin_number: String },

    /// Spreadsheet could not be opened or decoded
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
