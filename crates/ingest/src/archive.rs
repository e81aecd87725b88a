//! Zip archive workers.
//!
//! One worker owns one archive for its whole lifetime and walks the entries
//! sequentially, so the scan-level quota bounds open containers and parser
//! instances at the same time.

use crate::error::{ErrorKind, Result};
use crate::format::DocumentFormat;
use crate::lifecycle;
use crate::scan::Ingest;
use crate::source::{Outcome, ScanSummary, SourceItem};
use exn::ResultExt;
use shelf_fb2::TitleInfo;
use std::fs::File;
use std::path::Path;
use tracing::{debug, error, info, warn};
use zip::ZipArchive;

/// Process one archive end to end. Never fails outward: every fault is
/// absorbed into the summary so sibling workers and the pass keep going.
pub(crate) async fn process(ctx: Ingest, path: &Path) -> ScanSummary {
    let mut summary = ScanSummary::default();
    let archive_name = match lifecycle::base_name(path) {
        Ok(name) => name.to_string(),
        Err(err) => {
            error!(path = %path.display(), %err, "unusable archive path");
            summary.record(Outcome::RejectedError);
            return summary;
        },
    };

    // Archive-level dedup, keyed by base name alone, decided before the
    // container is even opened.
    match ctx.repo.is_archive_in_stock(&archive_name).await {
        Ok(true) => {
            debug!(archive = archive_name, "archive already in stock");
            if ctx.settings.intake.as_deref() == path.parent() {
                if let Err(err) = lifecycle::to_stock(path, &ctx.settings.stock).await {
                    error!(archive = archive_name, %err, "failed to move known archive to stock");
                }
            }
            summary.record(Outcome::SkippedDuplicate);
            return summary;
        },
        Ok(false) => {},
        Err(err) => {
            error!(archive = archive_name, %err, "catalog check failed");
            summary.record(Outcome::RejectedError);
            return summary;
        },
    }

    let mut zip = match open(path) {
        Ok(zip) => zip,
        Err(err) => {
            error!(archive = archive_name, %err, "cannot open archive");
            ctx.quarantine(path).await;
            summary.record(Outcome::RejectedError);
            return summary;
        },
    };

    for index in 0..zip.len() {
        // Metadata first: the checksum is the one the container recorded,
        // so dedup costs nothing in decompression.
        let (name, size, crc32) = match zip.by_index(index) {
            Ok(entry) => (entry.name().to_string(), entry.size(), entry.crc32()),
            Err(err) => {
                warn!(archive = archive_name, index, %err, "unreadable entry");
                summary.record(Outcome::RejectedError);
                continue;
            },
        };
        let Some(format) = DocumentFormat::from_name(&name) else {
            info!(archive = archive_name, entry = name, "skipping non-document entry");
            continue;
        };
        if size == 0 {
            warn!(archive = archive_name, entry = name, "zero-sized entry");
            continue;
        }
        match ctx.repo.is_file_in_stock(&name, crc32).await {
            Ok(true) => {
                debug!(archive = archive_name, entry = name, crc32, "duplicate entry");
                summary.record(Outcome::SkippedDuplicate);
                continue;
            },
            Ok(false) => {},
            Err(err) => {
                error!(archive = archive_name, entry = name, %err, "catalog check failed");
                summary.record(Outcome::RejectedError);
                continue;
            },
        }
        // The entry handle borrows the archive, so parse synchronously off
        // the decompression stream and drop the handle before anything
        // awaits. Only the header is pulled; the tail of the entry is
        // never decompressed.
        let info = match parse_entry(&mut zip, index, format, &name) {
            Ok(info) => info,
            Err(err) => {
                // Item boundary: a bad entry never takes the worker down.
                error!(archive = archive_name, entry = name, %err, "entry rejected");
                summary.record(Outcome::RejectedError);
                continue;
            },
        };
        let item = SourceItem { name, archive: archive_name.clone(), size: size as i64, crc32 };
        match ctx.ingest_parsed(&item, format, info).await {
            Ok(outcome) => summary.record(outcome),
            Err(err) => {
                error!(archive = archive_name, entry = item.name, %err, "entry rejected");
                summary.record(Outcome::RejectedError);
            },
        }
    }

    // The archive itself always lands in stock once its entries have been
    // walked, however many of them failed.
    if let Err(err) = lifecycle::to_stock(path, &ctx.settings.stock).await {
        error!(archive = archive_name, %err, "failed to move archive to stock");
    }
    info!(
        archive = archive_name,
        accepted = summary.accepted,
        duplicates = summary.duplicates,
        language_skips = summary.language_skips,
        errors = summary.errors,
        "archive processed",
    );
    summary
}

fn open(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path).or_raise(|| ErrorKind::File(path.display().to_string()))?;
    ZipArchive::new(file).or_raise(|| ErrorKind::File(path.display().to_string()))
}

/// Parse one entry's header straight off its decompression stream. The
/// reader stops at the end of the header; the container's own checksum
/// identifies the content, so the rest of the entry is never read.
fn parse_entry(
    zip: &mut ZipArchive<File>,
    index: usize,
    format: DocumentFormat,
    name: &str,
) -> Result<TitleInfo> {
    let entry = zip.by_index(index).or_raise(|| ErrorKind::File(name.to_string()))?;
    match format {
        DocumentFormat::Fb2 => TitleInfo::parse(entry).or_raise(|| ErrorKind::Parse(name.to_string())),
    }
}
