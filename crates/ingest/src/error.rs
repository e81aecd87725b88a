//! Ingestion Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// An ingestion error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The scan directory could not be listed. Fatal for the pass.
    #[display("cannot read directory {_0}")]
    Scan(#[error(not(source))] String),
    /// A file could not be read, moved or stat'd.
    #[display("file operation failed on {_0}")]
    File(#[error(not(source))] String),
    /// The document's metadata header could not be decoded.
    #[display("cannot parse {_0}")]
    Parse(#[error(not(source))] String),
    /// The catalog store refused an operation.
    #[display("catalog operation failed")]
    Catalog,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A failed item lands in quarantine; the next pass won't see it
        // again, so there is nothing to retry.
        false
    }
}
