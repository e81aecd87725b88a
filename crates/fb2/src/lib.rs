//! FB2 document parsing.
//!
//! FB2 is a single-file XML e-book format: a `title-info` metadata header,
//! body sections, and base64 `binary` attachments (cover images) at the end.
//! Only the header is of interest to the catalog, so parsing is a streaming
//! token loop that stops as soon as the header subtree has been decoded;
//! the (potentially huge) remainder of the document is never tokenized.
//!
//! Cover extraction is a separate second pass over the same document, run
//! on demand by whoever actually needs the image bytes.

mod cover;
mod encoding;
pub mod error;
mod header;
mod normalize;
pub mod models;

pub use crate::cover::find_cover;
pub use crate::encoding::DecodedReader;
pub use crate::header::TitleInfo;
pub use crate::normalize::{base_language, collapse_spaces, sort_title, truncate_to_boundary};

/// Byte ceiling applied to the normalized plot text.
pub const MAX_PLOT_BYTES: usize = 10_000;
