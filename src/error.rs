// src/error.rs

//! Error types for the RPM importer

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a conversion
///
/// Per-record and per-scriptlet problems are not errors; they are reported
/// as advisories in the `ConversionReport` and the pass continues.
#[derive(Error, Debug)]
pub enum Error {
    /// The package header could not be read. Nothing is written.
    #[error("failed to read RPM header: {0}")]
    HeaderRead(String),

    /// Header was readable but carried data that cannot be represented
    #[error("invalid package metadata: {0}")]
    InvalidMetadata(String),

    /// IO error while persisting artifacts
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
