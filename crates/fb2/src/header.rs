//! Streaming decode of the `title-info` header.

use crate::encoding::DecodedReader;
use crate::error::{ErrorKind, Result};
use crate::models::{BookMeta, RawAuthor, Series};
use crate::normalize;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use std::io::{BufRead, BufReader, Read};

/// The raw FB2 metadata header, fields exactly as declared in the document.
///
/// Obtain one with [`TitleInfo::parse`], then call
/// [`normalize`](TitleInfo::normalize) to get the catalog-ready form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleInfo {
    pub authors: Vec<RawAuthor>,
    pub title: String,
    pub genres: Vec<String>,
    /// Inner markup of the `annotation` element, tags preserved.
    pub annotation: String,
    pub date: String,
    pub year: String,
    pub lang: String,
    pub series: Series,
    /// The `coverpage` image reference, usually of the form `#cover.jpg`.
    pub cover_href: String,
}

impl TitleInfo {
    /// Decode the token stream until the first `title-info` start element,
    /// consume only that subtree, and stop.
    ///
    /// The rest of the document, which may be megabytes of base64 binaries,
    /// is never read. Charset declarations in the prolog are handled
    /// transparently; see [`DecodedReader`].
    pub fn parse(reader: impl Read) -> Result<Self> {
        let decoded = DecodedReader::new(reader)?;
        let mut xml = Reader::from_reader(BufReader::new(decoded));
        let mut buf = Vec::new();
        loop {
            match xml.read_event_into(&mut buf).map_err(xml_err)? {
                Event::Start(e) if e.local_name().as_ref() == b"title-info" => {
                    return Self::parse_subtree(&mut xml);
                },
                Event::Eof => exn::bail!(ErrorKind::MissingHeader),
                _ => {},
            }
            buf.clear();
        }
    }

    /// Apply the catalog normalization rules to every header field.
    pub fn normalize(&self) -> BookMeta {
        let lang = self.lang.trim();
        BookMeta {
            title: normalize::trim_title(&self.title),
            sort: normalize::sort_title(&self.title),
            year: normalize::year(&self.year, &self.date),
            plot: normalize::plot(&self.annotation),
            cover: normalize::cover_id(&self.cover_href),
            language: normalize::base_language(&self.lang),
            authors: normalize::authors(&self.authors, lang),
            genres: self.genres.clone(),
            series: self.series.clone(),
        }
    }

    fn parse_subtree<R: BufRead>(xml: &mut Reader<R>) -> Result<Self> {
        let mut info = Self::default();
        let mut buf = Vec::new();
        loop {
            match xml.read_event_into(&mut buf).map_err(xml_err)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"author" => info.authors.push(parse_author(xml)?),
                    b"book-title" => info.title = read_text(xml, b"book-title")?,
                    b"genre" => {
                        let genre = read_text(xml, b"genre")?;
                        if !genre.trim().is_empty() {
                            info.genres.push(genre.trim().to_string());
                        }
                    },
                    b"annotation" => info.annotation = read_inner_markup(xml, b"annotation")?,
                    b"date" => info.date = read_text(xml, b"date")?,
                    b"year" => info.year = read_text(xml, b"year")?,
                    b"lang" => info.lang = read_text(xml, b"lang")?,
                    b"sequence" => {
                        read_sequence(&e, &mut info.series);
                        skip_subtree(xml, &e)?;
                    },
                    // Descend so the nested `image` is seen at this level.
                    b"coverpage" => {},
                    b"image" => {
                        info.cover_href = href_attr(&e);
                        skip_subtree(xml, &e)?;
                    },
                    // Anything else (translator, src-title-info...) carries
                    // author-shaped children that must not leak into ours.
                    _ => skip_subtree(xml, &e)?,
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"sequence" => read_sequence(&e, &mut info.series),
                    b"image" => info.cover_href = href_attr(&e),
                    _ => {},
                },
                Event::End(e) if e.local_name().as_ref() == b"title-info" => break,
                Event::Eof => {
                    exn::bail!(ErrorKind::MalformedXml("unexpected EOF inside title-info".into()))
                },
                _ => {},
            }
            buf.clear();
        }
        Ok(info)
    }
}

pub(crate) fn xml_err(e: quick_xml::Error) -> ErrorKind {
    ErrorKind::MalformedXml(e.to_string())
}

/// Consume and discard everything up to the matching end tag of `start`.
pub(crate) fn skip_subtree<R: BufRead>(xml: &mut Reader<R>, start: &BytesStart<'_>) -> Result<()> {
    let name = start.name().as_ref().to_vec();
    let mut buf = Vec::new();
    xml.read_to_end_into(QName(&name), &mut buf).map_err(xml_err)?;
    Ok(())
}

/// Concatenated character data up to the end tag named `end`. Inline markup
/// (`<emphasis>` inside a title) is dropped, its text kept.
pub(crate) fn read_text<R: BufRead>(xml: &mut Reader<R>, end: &[u8]) -> Result<String> {
    let mut out = String::new();
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Text(t) => out.push_str(&t.unescape().map_err(xml_err)?),
            Event::CData(c) => out.push_str(&String::from_utf8_lossy(&c)),
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => exn::bail!(ErrorKind::MalformedXml("unexpected EOF in text content".into())),
            _ => {},
        }
        buf.clear();
    }
    Ok(out)
}

/// Reconstructed inner markup of an element, tags and text interleaved.
/// Attribute detail is not preserved; the plot normalizer strips everything
/// but tag shape anyway.
fn read_inner_markup<R: BufRead>(xml: &mut Reader<R>, end: &[u8]) -> Result<String> {
    let mut out = String::new();
    let mut depth = 0usize;
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) => {
                depth += 1;
                out.push('<');
                out.push_str(&String::from_utf8_lossy(e.local_name().as_ref()));
                out.push('>');
            },
            Event::Empty(e) => {
                out.push('<');
                out.push_str(&String::from_utf8_lossy(e.local_name().as_ref()));
                out.push_str("/>");
            },
            Event::Text(t) => out.push_str(&t.unescape().map_err(xml_err)?),
            Event::CData(c) => out.push_str(&String::from_utf8_lossy(&c)),
            Event::End(e) if depth == 0 && e.local_name().as_ref() == end => break,
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                out.push_str("</");
                out.push_str(&String::from_utf8_lossy(e.local_name().as_ref()));
                out.push('>');
            },
            Event::Eof => exn::bail!(ErrorKind::MalformedXml("unexpected EOF in annotation".into())),
            _ => {},
        }
        buf.clear();
    }
    Ok(out)
}

fn parse_author<R: BufRead>(xml: &mut Reader<R>) -> Result<RawAuthor> {
    let mut author = RawAuthor::default();
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"first-name" => author.first_name = read_text(xml, b"first-name")?,
                b"middle-name" => author.middle_name = read_text(xml, b"middle-name")?,
                b"last-name" => author.last_name = read_text(xml, b"last-name")?,
                _ => skip_subtree(xml, &e)?,
            },
            Event::End(e) if e.local_name().as_ref() == b"author" => break,
            Event::Eof => exn::bail!(ErrorKind::MalformedXml("unexpected EOF in author".into())),
            _ => {},
        }
        buf.clear();
    }
    Ok(author)
}

fn read_sequence(e: &BytesStart<'_>, series: &mut Series) {
    for attr in e.attributes().flatten() {
        match attr.key.local_name().as_ref() {
            b"name" => series.name = String::from_utf8_lossy(&attr.value).into_owned(),
            b"number" => {
                series.number = String::from_utf8_lossy(&attr.value).trim().parse().unwrap_or(0);
            },
            _ => {},
        }
    }
}

fn href_attr(e: &BytesStart<'_>) -> String {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == b"href")
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0" xmlns:l="http://www.w3.org/1999/xlink">
 <description>
  <title-info>
   <genre>sf_space</genre>
   <genre>sf</genre>
   <author><first-name>arthur</first-name><middle-name>charles</middle-name><last-name>clarke</last-name></author>
   <book-title> The City and the Stars </book-title>
   <annotation><p>A &amp; B in the far future.</p><empty-line/></annotation>
   <date>1956-01-01</date>
   <lang>en-GB</lang>
   <sequence name="Diaspar" number="1"/>
   <coverpage><image l:href="#cover.jpg"/></coverpage>
  </title-info>
  <document-info>
   <author><nickname>scanner</nickname></author>
  </document-info>
 </description>
 <body><section><p>Unread body text.</p></section></body>
</FictionBook>"##;

    #[test]
    fn parses_header_fields() {
        let info = TitleInfo::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(info.title, " The City and the Stars ");
        assert_eq!(info.genres, vec!["sf_space", "sf"]);
        assert_eq!(info.authors.len(), 1);
        assert_eq!(info.authors[0].first_name, "arthur");
        assert_eq!(info.authors[0].last_name, "clarke");
        assert_eq!(info.date, "1956-01-01");
        assert_eq!(info.lang, "en-GB");
        assert_eq!(info.series.name, "Diaspar");
        assert_eq!(info.series.number, 1);
        assert_eq!(info.cover_href, "#cover.jpg");
        assert_eq!(info.annotation, "<p>A & B in the far future.</p><empty-line/>");
    }

    #[test]
    fn stops_at_header_end() {
        // Garbage after </title-info> must never be tokenized.
        let cut = SAMPLE.find("</title-info>").unwrap() + "</title-info>".len();
        let mut doc = SAMPLE[..cut].as_bytes().to_vec();
        doc.extend_from_slice(b"\x00\x01 this is not xml at all");
        let info = TitleInfo::parse(&doc[..]).unwrap();
        assert_eq!(info.series.name, "Diaspar");
    }

    #[test]
    fn document_info_author_does_not_leak() {
        let info = TitleInfo::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(info.authors.len(), 1, "document-info author must not be picked up");
    }

    #[test]
    fn missing_header_is_an_error() {
        let doc = b"<?xml version=\"1.0\"?><FictionBook><body/></FictionBook>";
        let err = TitleInfo::parse(&doc[..]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingHeader));
    }

    #[test]
    fn broken_xml_is_an_error() {
        let doc = b"<?xml version=\"1.0\"?><FictionBook><description><title-info><book-title>x</wrong>";
        assert!(TitleInfo::parse(&doc[..]).is_err());
    }

    #[test]
    fn cp1251_header_is_decoded() {
        // <book-title>Мы</book-title> with cp1251 bytes for the Cyrillic.
        let mut doc = b"<?xml version=\"1.0\" encoding=\"windows-1251\"?><FictionBook><description><title-info><book-title>".to_vec();
        doc.extend_from_slice(&[0xCC, 0xFB]);
        doc.extend_from_slice(b"</book-title><lang>ru</lang></title-info></description></FictionBook>");
        let info = TitleInfo::parse(&doc[..]).unwrap();
        assert_eq!(info.title, "Мы");
        assert_eq!(info.lang, "ru");
    }
}
