//! Data carried out of an FB2 header, raw and normalized.

/// An author credit exactly as declared in the document, parts untrimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAuthor {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
}

/// A normalized author: display name plus a locale-cased sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Author {
    /// `"First Middle Last"`, empty parts dropped.
    pub name: String,
    /// `"Last, First Middle"`, empty parts dropped.
    pub sort: String,
}

/// Series membership declared by a `sequence` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Series {
    pub name: String,
    /// Position within the series; `0` when the document omits it.
    pub number: i64,
}

/// The catalog-ready view of one document's header.
///
/// Every field here has already been through the normalization rules in
/// [`normalize`](crate::normalize); consumers must not re-trim or re-case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookMeta {
    pub title: String,
    pub sort: String,
    pub year: String,
    pub plot: String,
    /// Cover reference id with the leading `#` stripped; empty if none.
    pub cover: String,
    /// Base language subtag, best-effort (possibly empty).
    pub language: String,
    pub authors: Vec<Author>,
    pub genres: Vec<String>,
    pub series: Series,
}

/// A matched `binary` attachment from the cover pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverBinary {
    pub id: String,
    pub content_type: String,
    /// Raw element content as it appears in the document (base64 text).
    pub content: Vec<u8>,
}
