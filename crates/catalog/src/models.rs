//! The record shape handed from the ingestion pipeline to the store.

use shelf_fb2::models::{Author, BookMeta, Series};

/// One catalog-ready book: normalized metadata plus the provenance of the
/// bytes it came from. Transient: built by the parser, consumed by
/// [`Repository::new_book`](crate::Repository::new_book), never held onto.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    /// Document file name (the zip entry name for archived documents).
    pub file: String,
    /// CRC-32/IEEE over the document bytes; half of the dedup key.
    pub crc32: u32,
    /// Containing archive base name; empty for loose files.
    pub archive: String,
    /// Uncompressed document size in bytes.
    pub size: i64,
    /// Format tag, currently always `"fb2"`.
    pub format: String,
    pub title: String,
    pub sort: String,
    pub year: String,
    pub language: String,
    pub plot: String,
    pub cover: String,
    pub authors: Vec<Author>,
    pub genres: Vec<String>,
    pub series: Series,
    /// Ingestion time as a unix timestamp.
    pub updated: i64,
}

impl BookRecord {
    /// Assemble a record from a normalized header and the source file's
    /// provenance.
    pub fn from_meta(
        meta: BookMeta,
        file: impl Into<String>,
        crc32: u32,
        archive: impl Into<String>,
        size: i64,
        format: impl Into<String>,
        updated: i64,
    ) -> Self {
        Self {
            file: file.into(),
            crc32,
            archive: archive.into(),
            size,
            format: format.into(),
            title: meta.title,
            sort: meta.sort,
            year: meta.year,
            language: meta.language,
            plot: meta.plot,
            cover: meta.cover,
            authors: meta.authors,
            genres: meta.genres,
            series: meta.series,
            updated,
        }
    }
}
