//! Directory scanning and the ingestion pipeline itself.

use crate::archive;
use crate::error::{ErrorKind, Result};
use crate::format::{self, DocumentFormat};
use crate::genres::GenreNormalizer;
use crate::lifecycle;
use crate::source::{self, Outcome, ScanSummary, SourceItem};
use exn::ResultExt;
use shelf_catalog::{BookRecord, Repository};
use shelf_fb2::TitleInfo;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Directory layout and tuning for the pipeline.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Canonical home of ingested files.
    pub stock: PathBuf,
    /// Inbox of new acquisitions; when `None`, stock is scanned in place.
    pub intake: Option<PathBuf>,
    /// Terminal location for files that failed processing.
    pub quarantine: PathBuf,
    /// Upper bound on concurrently open archives.
    pub max_archive_workers: usize,
    /// Accepted-language string, matched by containment.
    pub accepted_langs: String,
}

/// The ingestion pipeline: scans a directory, parses what it finds, feeds
/// the catalog and routes every file to its terminal location.
///
/// Cheap to clone; archive workers each carry one.
#[derive(Clone)]
pub struct Ingest {
    pub(crate) repo: Repository,
    pub(crate) genres: Arc<dyn GenreNormalizer>,
    pub(crate) settings: Arc<IngestSettings>,
}

impl Ingest {
    pub fn new(repo: Repository, genres: Arc<dyn GenreNormalizer>, settings: IngestSettings) -> Self {
        Self { repo, genres, settings: Arc::new(settings) }
    }

    /// The directory a routine scan should read: the intake inbox when one
    /// is configured, otherwise the stock itself.
    pub fn inbox(&self) -> &Path {
        self.settings.intake.as_deref().unwrap_or(&self.settings.stock)
    }

    /// One full scan pass over `dir`, non-recursive.
    ///
    /// Archives are handed to a bounded worker pool; loose documents are
    /// processed inline. The pass only returns once every spawned worker
    /// has finished, so a caller scheduling repeated passes always starts
    /// from a fully drained state. An unreadable directory is fatal;
    /// everything below that is contained at the item boundary.
    pub async fn scan_pass(&self, dir: &Path) -> Result<ScanSummary> {
        let started = Instant::now();
        info!(dir = %dir.display(), "scan pass started");
        let dir_err = || ErrorKind::Scan(dir.display().to_string());
        let mut entries = fs::read_dir(dir).await.or_raise(dir_err)?;
        let quota = Arc::new(Semaphore::new(self.settings.max_archive_workers));
        let mut workers = JoinSet::new();
        let mut summary = ScanSummary::default();

        while let Some(entry) = entries.next_entry().await.or_raise(dir_err)? {
            let path = entry.path();
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(err) => {
                    error!(path = %path.display(), %err, "cannot stat entry");
                    self.quarantine(&path).await;
                    summary.record(Outcome::RejectedError);
                    continue;
                },
            };
            if meta.is_dir() {
                info!(path = %path.display(), "skipping subdirectory");
                continue;
            }
            if meta.len() == 0 {
                warn!(path = %path.display(), "zero-sized file");
                self.quarantine(&path).await;
                summary.record(Outcome::RejectedError);
                continue;
            }
            if format::is_archive(&path) {
                // Token acquired on the scanning routine, so at most
                // `max_archive_workers` archives are ever open at once.
                let permit = quota.clone().acquire_owned().await.or_raise(dir_err)?;
                let ctx = self.clone();
                workers.spawn(async move {
                    let summary = archive::process(ctx, &path).await;
                    drop(permit);
                    summary
                });
            } else if let Some(format) = DocumentFormat::from_path(&path) {
                match self.process_file(&path, format).await {
                    Ok(outcome) => summary.record(outcome),
                    Err(err) => {
                        error!(path = %path.display(), %err, "file rejected");
                        self.quarantine(&path).await;
                        summary.record(Outcome::RejectedError);
                    },
                }
            } else {
                warn!(path = %path.display(), "unsupported format");
                self.quarantine(&path).await;
                summary.record(Outcome::RejectedError);
            }
        }

        // Completion barrier: the pass is over only when every archive
        // worker spawned above has finished.
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker_summary) => summary.merge(worker_summary),
                Err(err) => {
                    error!(%err, "archive worker panicked");
                    summary.record(Outcome::RejectedError);
                },
            }
        }

        info!(
            elapsed = ?started.elapsed(),
            accepted = summary.accepted,
            duplicates = summary.duplicates,
            language_skips = summary.language_skips,
            errors = summary.errors,
            "scan pass finished",
        );
        Ok(summary)
    }

    /// Rebuild the whole catalog from the stock directory: drop and
    /// recreate the schema, then scan stock in place.
    pub async fn reindex(&self) -> Result<ScanSummary> {
        let started = Instant::now();
        info!("reindex started");
        self.repo.drop_schema().await.or_raise(|| ErrorKind::Catalog)?;
        self.repo.init_schema().await.or_raise(|| ErrorKind::Catalog)?;
        let stock = self.settings.stock.clone();
        let summary = self.scan_pass(&stock).await?;
        info!(elapsed = ?started.elapsed(), "reindex finished");
        Ok(summary)
    }

    /// One loose document, processed inline on the scanning routine.
    async fn process_file(&self, path: &Path, format: DocumentFormat) -> Result<Outcome> {
        let name = lifecycle::base_name(path)?.to_string();
        let bytes = fs::read(path).await.or_raise(|| ErrorKind::File(path.display().to_string()))?;
        let crc32 = source::crc32_of(&bytes);
        if self.repo.is_file_in_stock(&name, crc32).await.or_raise(|| ErrorKind::Catalog)? {
            debug!(file = name, crc32, "duplicate file");
            lifecycle::to_stock(path, &self.settings.stock).await?;
            return Ok(Outcome::SkippedDuplicate);
        }
        let item = SourceItem { name, archive: String::new(), size: bytes.len() as i64, crc32 };
        let outcome = self.ingest_document(&item, format, &bytes).await?;
        lifecycle::to_stock(path, &self.settings.stock).await?;
        Ok(outcome)
    }

    /// Parse a loose document's header, then hand it to [`Self::ingest_parsed`].
    /// Dedup has already happened by the time this runs.
    pub(crate) async fn ingest_document(
        &self,
        item: &SourceItem,
        format: DocumentFormat,
        bytes: &[u8],
    ) -> Result<Outcome> {
        let info = match format {
            DocumentFormat::Fb2 => {
                TitleInfo::parse(bytes).or_raise(|| ErrorKind::Parse(item.name.clone()))?
            },
        };
        self.ingest_parsed(item, format, info).await
    }

    /// Admission-filter, normalize genres and insert an already-parsed
    /// header. Archive workers call this directly: they parse off the
    /// decompression stream first, so no entry handle is alive here.
    pub(crate) async fn ingest_parsed(
        &self,
        item: &SourceItem,
        format: DocumentFormat,
        info: TitleInfo,
    ) -> Result<Outcome> {
        let mut meta = info.normalize();
        if !crate::admission::accepts(&self.settings.accepted_langs, &meta.language) {
            debug!(file = item.name, language = meta.language, "language not accepted");
            return Ok(Outcome::SkippedLanguage);
        }
        meta.genres = meta.genres.iter().map(|genre| self.genres.transfer(genre)).collect();
        let record = BookRecord::from_meta(
            meta,
            &item.name,
            item.crc32,
            &item.archive,
            item.size,
            format.tag(),
            source::now_unix(),
        );
        let id = self.repo.new_book(&record).await.or_raise(|| ErrorKind::Catalog)?;
        info!(file = item.name, id, "book ingested");
        Ok(Outcome::Accepted)
    }

    /// Best-effort move to quarantine; a failed move is logged, never
    /// propagated, so one stuck file can't stall a pass.
    pub(crate) async fn quarantine(&self, path: &Path) {
        if let Err(err) = lifecycle::to_quarantine(path, &self.settings.quarantine).await {
            error!(path = %path.display(), %err, "failed to quarantine");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fb2_doc, names, Fixture};

    #[tokio::test]
    async fn loose_document_is_accepted_and_stocked() {
        let fx = Fixture::new("en,ru").await;
        fx.put("intake", "city.fb2", fb2_doc("The City and the Stars", "en").as_bytes());

        let summary = fx.ingest.scan_pass(&fx.dir("intake")).await.unwrap();
        assert_eq!(summary.accepted, 1);
        assert_eq!(names(&fx.dir("intake")), Vec::<String>::new());
        assert_eq!(names(&fx.dir("stock")), ["city.fb2"]);
        assert_eq!(fx.books().await, 1);
    }

    #[tokio::test]
    async fn reingesting_the_same_file_is_a_duplicate_skip() {
        let fx = Fixture::new("en").await;
        let doc = fb2_doc("Dune", "en");
        fx.put("intake", "dune.fb2", doc.as_bytes());
        fx.ingest.scan_pass(&fx.dir("intake")).await.unwrap();
        fx.put("intake", "dune.fb2", doc.as_bytes());

        let summary = fx.ingest.scan_pass(&fx.dir("intake")).await.unwrap();
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.accepted, 0);
        assert_eq!(fx.books().await, 1);
    }

    #[tokio::test]
    async fn unsupported_extension_is_quarantined() {
        let fx = Fixture::new("en").await;
        fx.put("intake", "readme.txt", b"not a book");

        let summary = fx.ingest.scan_pass(&fx.dir("intake")).await.unwrap();
        assert_eq!(summary.errors, 1);
        assert_eq!(names(&fx.dir("quarantine")), ["readme.txt"]);
    }

    #[tokio::test]
    async fn zero_sized_file_is_quarantined() {
        let fx = Fixture::new("en").await;
        fx.put("intake", "empty.fb2", b"");

        let summary = fx.ingest.scan_pass(&fx.dir("intake")).await.unwrap();
        assert_eq!(summary.errors, 1);
        assert_eq!(names(&fx.dir("quarantine")), ["empty.fb2"]);
    }

    #[tokio::test]
    async fn subdirectories_are_skipped() {
        let fx = Fixture::new("en").await;
        std::fs::create_dir(fx.dir("intake").join("nested")).unwrap();

        let summary = fx.ingest.scan_pass(&fx.dir("intake")).await.unwrap();
        assert_eq!(summary, ScanSummary::default());
        assert!(fx.dir("intake").join("nested").exists());
    }

    #[tokio::test]
    async fn broken_document_is_quarantined() {
        let fx = Fixture::new("en").await;
        fx.put("intake", "broken.fb2", b"<FictionBook><descr");

        let summary = fx.ingest.scan_pass(&fx.dir("intake")).await.unwrap();
        assert_eq!(summary.errors, 1);
        assert_eq!(names(&fx.dir("quarantine")), ["broken.fb2"]);
        assert_eq!(fx.books().await, 0);
    }

    #[tokio::test]
    async fn rejected_language_is_discarded_but_file_still_stocked() {
        let fx = Fixture::new("en,ru").await;
        fx.put("intake", "buch.fb2", fb2_doc("Die Verwandlung", "de").as_bytes());

        let summary = fx.ingest.scan_pass(&fx.dir("intake")).await.unwrap();
        assert_eq!(summary.language_skips, 1);
        assert_eq!(fx.books().await, 0);
        assert_eq!(names(&fx.dir("stock")), ["buch.fb2"]);
        assert_eq!(names(&fx.dir("quarantine")), Vec::<String>::new());
    }

    #[tokio::test]
    async fn unreadable_directory_is_fatal() {
        let fx = Fixture::new("en").await;
        let missing = fx.dir("nonexistent");
        let err = fx.ingest.scan_pass(&missing).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Scan(_)));
    }

    #[tokio::test]
    async fn reindex_rebuilds_from_stock_in_place() {
        let fx = Fixture::new("en").await;
        fx.put("stock", "city.fb2", fb2_doc("The City and the Stars", "en").as_bytes());

        let summary = fx.ingest.reindex().await.unwrap();
        assert_eq!(summary.accepted, 1);
        // Stock files are scanned in place, not moved.
        assert_eq!(names(&fx.dir("stock")), ["city.fb2"]);
        assert_eq!(fx.books().await, 1);

        // A second reindex starts from a fresh schema and finds the same book.
        let summary = fx.ingest.reindex().await.unwrap();
        assert_eq!(summary.accepted, 1);
        assert_eq!(fx.books().await, 1);
    }
}
