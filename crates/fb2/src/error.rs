//! Parser Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A parser error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The XML token stream is broken; the document cannot be trusted.
    #[display("malformed XML: {_0}")]
    MalformedXml(#[error(not(source))] String),
    /// The prolog declares a charset this parser cannot transcode.
    #[display("unsupported declared encoding: {_0}")]
    UnsupportedEncoding(#[error(not(source))] String),
    /// The document ended without a `title-info` element.
    #[display("document has no title-info header")]
    MissingHeader,
    /// No `binary` element matched the header's cover reference. Not fatal
    /// for ingestion; the record is simply stored without a cover.
    #[display("document has no cover page")]
    NoCover,
    /// The underlying byte stream failed mid-read.
    #[display("read error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A document is either well-formed or it is not.
        false
    }
}
