//! The ingestion pipeline: directory scanning, archive unpacking,
//! deduplication, language admission and file lifecycle routing.
//!
//! One [`Ingest`] value ties the pieces together. A scan pass walks a
//! single directory (never recursing), hands zip containers to a bounded
//! worker pool and loose documents to the scanning routine itself, and
//! guarantees every file ends up in exactly one place: the stock directory,
//! quarantine, or untouched where it already lives.

mod admission;
mod archive;
pub mod error;
mod format;
mod genres;
mod lifecycle;
mod scan;
mod source;
#[cfg(test)]
mod testutil;

pub use crate::format::DocumentFormat;
pub use crate::genres::{GenreMap, GenreNormalizer, PassthroughGenres};
pub use crate::scan::{Ingest, IngestSettings};
pub use crate::source::{Outcome, ScanSummary, SourceItem};
