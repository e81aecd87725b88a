//! Charset fallback for the XML byte stream.
//!
//! Plenty of FB2 files in the wild predate universal UTF-8 and declare a
//! legacy single-byte code page (windows-1251 for Cyrillic, windows-1252 for
//! Western European) in the XML prolog. The tokenizer only speaks UTF-8, so
//! declared encodings are transcoded incrementally while streaming; the
//! document is never pulled into memory just to re-encode it.

use crate::error::{ErrorKind, Result};
use encoding_rs::{CoderResult, Decoder, Encoding, UTF_8};
use exn::ResultExt;
use std::io::{self, Read};

/// How far into the stream the XML declaration is looked for. The prolog is
/// required to be the very first thing in the document, so this is generous.
const PROLOG_PROBE_BYTES: usize = 1024;
const RAW_CHUNK_BYTES: usize = 4096;

/// A reader that yields UTF-8 regardless of the charset the document
/// declares.
///
/// Construction probes the prolog for an `encoding` pseudo-attribute (or a
/// byte-order mark) and sets up an [`encoding_rs`] decoder when the stream is
/// not already UTF-8. An encoding label that `encoding_rs` does not recognize
/// is a hard [`ErrorKind::UnsupportedEncoding`] failure; silently guessing
/// would corrupt catalog text.
pub struct DecodedReader<R: Read> {
    inner: R,
    /// `None` means the stream is UTF-8 (or undeclared) and bytes pass
    /// through untouched.
    decoder: Option<Decoder>,
    /// Raw bytes waiting to be served or transcoded; seeded with the probe.
    raw: Vec<u8>,
    raw_pos: usize,
    raw_eof: bool,
    /// Transcoded output not yet handed to the caller.
    decoded: Vec<u8>,
    decoded_pos: usize,
    finished: bool,
}

impl<R: Read> DecodedReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let mut raw = Vec::with_capacity(PROLOG_PROBE_BYTES);
        let mut chunk = [0u8; 256];
        while raw.len() < PROLOG_PROBE_BYTES {
            let n = inner.read(&mut chunk).or_raise(|| ErrorKind::Io)?;
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);
        }
        let encoding = declared_encoding(&raw)?;
        let decoder = match encoding {
            Some(enc) if enc != UTF_8 => Some(enc.new_decoder()),
            _ => None,
        };
        Ok(Self {
            inner,
            decoder,
            raw,
            raw_pos: 0,
            raw_eof: false,
            decoded: Vec::new(),
            decoded_pos: 0,
            finished: false,
        })
    }

    /// Pull the next raw chunk from the underlying stream into `self.raw`.
    /// No-op while unconsumed probe bytes remain.
    fn refill_raw(&mut self) -> io::Result<()> {
        if self.raw_pos < self.raw.len() || self.raw_eof {
            return Ok(());
        }
        self.raw.resize(RAW_CHUNK_BYTES, 0);
        let n = self.inner.read(&mut self.raw)?;
        self.raw.truncate(n);
        self.raw_pos = 0;
        if n == 0 {
            self.raw_eof = true;
        }
        Ok(())
    }

    /// Transcode raw input until at least one decoded byte is available or
    /// the stream is exhausted.
    fn refill_decoded(&mut self) -> io::Result<()> {
        self.decoded.clear();
        self.decoded_pos = 0;
        let mut dst = [0u8; RAW_CHUNK_BYTES];
        loop {
            self.refill_raw()?;
            let last = self.raw_eof && self.raw_pos >= self.raw.len();
            let Some(decoder) = self.decoder.as_mut() else {
                // Unreachable from `read`; passthrough never lands here.
                self.finished = true;
                return Ok(());
            };
            let (result, read, written, _) = decoder.decode_to_utf8(&self.raw[self.raw_pos..], &mut dst, last);
            self.raw_pos += read;
            self.decoded.extend_from_slice(&dst[..written]);
            match result {
                CoderResult::OutputFull => return Ok(()),
                CoderResult::InputEmpty if last => {
                    self.finished = true;
                    return Ok(());
                },
                CoderResult::InputEmpty => {
                    if !self.decoded.is_empty() {
                        return Ok(());
                    }
                    // Need more raw input before anything can be emitted.
                },
            }
        }
    }
}

impl<R: Read> Read for DecodedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.decoder.is_none() {
            // Passthrough: drain the probe, then read straight through.
            if self.raw_pos < self.raw.len() {
                let n = (self.raw.len() - self.raw_pos).min(buf.len());
                buf[..n].copy_from_slice(&self.raw[self.raw_pos..self.raw_pos + n]);
                self.raw_pos += n;
                return Ok(n);
            }
            return self.inner.read(buf);
        }
        if self.decoded_pos >= self.decoded.len() {
            if self.finished {
                return Ok(0);
            }
            self.refill_decoded()?;
            if self.decoded.is_empty() {
                return Ok(0);
            }
        }
        let n = (self.decoded.len() - self.decoded_pos).min(buf.len());
        buf[..n].copy_from_slice(&self.decoded[self.decoded_pos..self.decoded_pos + n]);
        self.decoded_pos += n;
        Ok(n)
    }
}

/// Determine the encoding the document claims to be in.
///
/// Returns `None` when nothing is declared (UTF-8 per the XML spec).
fn declared_encoding(probe: &[u8]) -> Result<Option<&'static Encoding>> {
    if let Some((encoding, _bom_len)) = Encoding::for_bom(probe) {
        return Ok(Some(encoding));
    }
    let Some(label) = prolog_encoding_label(probe) else {
        return Ok(None);
    };
    match Encoding::for_label(label) {
        Some(encoding) => Ok(Some(encoding)),
        None => exn::bail!(ErrorKind::UnsupportedEncoding(String::from_utf8_lossy(label).into_owned())),
    }
}

/// Extract the value of the `encoding` pseudo-attribute from the XML
/// declaration, if present. Pure ASCII scanning; every label encoding_rs can
/// resolve is ASCII-compatible, so this is safe even before transcoding.
fn prolog_encoding_label(probe: &[u8]) -> Option<&[u8]> {
    let decl_end = probe.windows(2).position(|w| w == b"?>")?;
    let decl = &probe[..decl_end];
    if !decl.starts_with(b"<?xml") {
        return None;
    }
    let key_at = decl.windows(8).position(|w| w == b"encoding")?;
    let mut i = skip_ws(decl, key_at + 8);
    if decl.get(i) != Some(&b'=') {
        return None;
    }
    i = skip_ws(decl, i + 1);
    let quote = *decl.get(i)?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    i += 1;
    let close = decl[i..].iter().position(|&b| b == quote)?;
    Some(&decl[i..i + close])
}

fn skip_ws(s: &[u8], mut i: usize) -> usize {
    while i < s.len() && matches!(s[i], b' ' | b'\t' | b'\r' | b'\n') {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all<R: Read>(mut r: R) -> Vec<u8> {
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn utf8_passthrough() {
        let doc = "<?xml version=\"1.0\" encoding=\"UTF-8\"?><a>текст</a>".as_bytes();
        let reader = DecodedReader::new(Cursor::new(doc)).unwrap();
        assert_eq!(read_all(reader), doc);
    }

    #[test]
    fn undeclared_passthrough() {
        let doc = b"<a>plain</a>";
        let reader = DecodedReader::new(Cursor::new(&doc[..])).unwrap();
        assert_eq!(read_all(reader), doc);
    }

    #[test]
    fn windows_1251_is_transcoded() {
        // "Мир" in cp1251 is CC E8 F0.
        let mut doc = b"<?xml version=\"1.0\" encoding=\"windows-1251\"?><a>".to_vec();
        doc.extend_from_slice(&[0xCC, 0xE8, 0xF0]);
        doc.extend_from_slice(b"</a>");
        let reader = DecodedReader::new(Cursor::new(doc)).unwrap();
        let text = String::from_utf8(read_all(reader)).unwrap();
        assert!(text.contains("<a>Мир</a>"), "got: {text}");
    }

    #[test]
    fn windows_1252_is_transcoded() {
        // 0xE9 is "é" in cp1252.
        let mut doc = b"<?xml version='1.0' encoding='windows-1252'?><a>caf".to_vec();
        doc.push(0xE9);
        doc.extend_from_slice(b"</a>");
        let reader = DecodedReader::new(Cursor::new(doc)).unwrap();
        let text = String::from_utf8(read_all(reader)).unwrap();
        assert!(text.contains("café"), "got: {text}");
    }

    #[test]
    fn unknown_label_is_rejected() {
        let doc = b"<?xml version=\"1.0\" encoding=\"klingon-42\"?><a/>";
        match DecodedReader::new(Cursor::new(&doc[..])) {
            Ok(_) => panic!("unknown declared encoding must be rejected"),
            Err(err) => {
                assert!(matches!(&*err, ErrorKind::UnsupportedEncoding(label) if label == "klingon-42"));
            },
        }
    }

    #[test]
    fn transcodes_input_larger_than_probe() {
        let mut doc = b"<?xml version=\"1.0\" encoding=\"windows-1251\"?><a>".to_vec();
        // 0xFF is "я" in cp1251; make the body far larger than the probe.
        doc.extend(std::iter::repeat_n(0xFFu8, 8 * PROLOG_PROBE_BYTES));
        doc.extend_from_slice(b"</a>");
        let reader = DecodedReader::new(Cursor::new(doc)).unwrap();
        let text = String::from_utf8(read_all(reader)).unwrap();
        assert_eq!(text.matches('я').count(), 8 * PROLOG_PROBE_BYTES);
    }

    #[test]
    fn label_extraction() {
        assert_eq!(prolog_encoding_label(b"<?xml version=\"1.0\" encoding=\"koi8-r\"?>"), Some(&b"koi8-r"[..]));
        assert_eq!(prolog_encoding_label(b"<?xml version=\"1.0\" encoding = 'utf-8' ?>"), Some(&b"utf-8"[..]));
        assert_eq!(prolog_encoding_label(b"<?xml version=\"1.0\"?>"), None);
        assert_eq!(prolog_encoding_label(b"<root/>"), None);
    }
}
