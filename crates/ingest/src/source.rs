//! Units of ingestion and per-pass accounting.

/// One unit to ingest: a loose file or one archive entry.
///
/// Built at scan time, routed once, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    /// Document file name; for archive entries, the entry name.
    pub name: String,
    /// Containing archive base name, empty for loose files.
    pub archive: String,
    /// Uncompressed size in bytes.
    pub size: i64,
    /// CRC-32/IEEE content fingerprint.
    pub crc32: u32,
}

/// What happened to one source item. Exactly one per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Parsed, admitted and inserted into the catalog.
    Accepted,
    /// Already known by `(name, checksum)` or archive name; nothing done.
    SkippedDuplicate,
    /// Parsed fine but the language is not accepted; record discarded.
    SkippedLanguage,
    /// Processing failed; the item (or its file) went to quarantine.
    RejectedError,
}

/// Outcome counts for one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub accepted: u64,
    pub duplicates: u64,
    pub language_skips: u64,
    pub errors: u64,
}

impl ScanSummary {
    pub(crate) fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Accepted => self.accepted += 1,
            Outcome::SkippedDuplicate => self.duplicates += 1,
            Outcome::SkippedLanguage => self.language_skips += 1,
            Outcome::RejectedError => self.errors += 1,
        }
    }

    pub(crate) fn merge(&mut self, other: Self) {
        self.accepted += other.accepted;
        self.duplicates += other.duplicates;
        self.language_skips += other.language_skips;
        self.errors += other.errors;
    }
}

/// CRC-32/IEEE over a full byte buffer. Archive entries never go through
/// this; their checksum comes from the container's own record.
pub(crate) fn crc32_of(bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Ingestion timestamp for catalog records.
pub(crate) fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_matches_known_vector() {
        // IEEE polynomial check value for "123456789".
        assert_eq!(crc32_of(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn summary_merge_adds_counts() {
        let mut a = ScanSummary { accepted: 1, duplicates: 2, language_skips: 0, errors: 1 };
        a.merge(ScanSummary { accepted: 3, duplicates: 0, language_skips: 1, errors: 0 });
        assert_eq!(a, ScanSummary { accepted: 4, duplicates: 2, language_skips: 1, errors: 1 });
    }
}
