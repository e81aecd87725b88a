//! On-demand cover extraction.
//!
//! The header pass deliberately stops before the document's `binary`
//! attachments, so fetching the actual cover image is a second streaming
//! pass over the same document. It only runs when someone asks for the
//! image, which for bulk ingestion is almost never.

use crate::encoding::DecodedReader;
use crate::error::{ErrorKind, Result};
use crate::header::{read_text, skip_subtree, xml_err};
use crate::models::CoverBinary;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{BufReader, Read};
use tracing::debug;

/// Scan the document for the `binary` element matching the header's cover
/// reference and return its raw content.
///
/// The attribute *name* is matched case-insensitively (documents disagree on
/// `id` vs `ID`), the id *value* case-sensitively, and a leading `#` on
/// `href` is ignored. The first match wins.
///
/// # Errors
/// [`ErrorKind::NoCover`] when no binary matches; callers treat this as
/// "no cover", not as a broken document.
pub fn find_cover(reader: impl Read, href: &str) -> Result<CoverBinary> {
    let wanted = href.strip_prefix('#').unwrap_or(href);
    let decoded = DecodedReader::new(reader)?;
    let mut xml = Reader::from_reader(BufReader::new(decoded));
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) if e.local_name().as_ref() == b"binary" => {
                let mut id = String::new();
                let mut content_type = String::new();
                for attr in e.attributes().flatten() {
                    let key = attr.key.local_name();
                    if key.as_ref().eq_ignore_ascii_case(b"id") {
                        id = String::from_utf8_lossy(&attr.value).into_owned();
                    } else if key.as_ref().eq_ignore_ascii_case(b"content-type") {
                        content_type = String::from_utf8_lossy(&attr.value).into_owned();
                    }
                }
                if id == wanted {
                    let content = read_text(&mut xml, b"binary")?.into_bytes();
                    debug!(id, content_type, bytes = content.len(), "cover binary found");
                    return Ok(CoverBinary { id, content_type, content });
                }
                skip_subtree(&mut xml, &e)?;
            },
            Event::Eof => exn::bail!(ErrorKind::NoCover),
            _ => {},
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<FictionBook>
 <description><title-info><book-title>t</book-title></title-info></description>
 <body><p>text</p></body>
 <binary ID="other.png" content-type="image/png">AAAA</binary>
 <binary id="cover.jpg" content-type="image/jpeg">QkFTRTY0</binary>
</FictionBook>"#;

    #[test]
    fn finds_matching_binary() {
        let cover = find_cover(DOC.as_bytes(), "#cover.jpg").unwrap();
        assert_eq!(cover.id, "cover.jpg");
        assert_eq!(cover.content_type, "image/jpeg");
        assert_eq!(cover.content, b"QkFTRTY0");
    }

    #[test]
    fn attribute_name_match_is_case_insensitive() {
        let cover = find_cover(DOC.as_bytes(), "other.png").unwrap();
        assert_eq!(cover.content_type, "image/png");
    }

    #[test]
    fn id_value_match_is_case_sensitive() {
        let err = find_cover(DOC.as_bytes(), "#COVER.JPG").unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoCover));
    }

    #[test]
    fn missing_binary_is_no_cover() {
        let err = find_cover(DOC.as_bytes(), "#nope.jpg").unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoCover));
    }
}
