//! Repository for book records and their linked authors, genres and series.

use crate::error::{ErrorKind, Result};
use crate::models::BookRecord;
use crate::schema;
use crate::Database;
use exn::ResultExt;
use sqlx::SqlitePool;
use tracing::debug;

/// The store-facing half of the ingestion pipeline.
///
/// All operations are safe to call concurrently from several workers; the
/// pool and SQLite's locking provide the only synchronization needed.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}

impl Repository {
    /// Create a new repository over the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Whether a document with this `(name, checksum)` pair has already been
    /// ingested. The key is the pair: a checksum collision between two
    /// differently-named files is *not* a duplicate.
    pub async fn is_file_in_stock(&self, file: &str, crc32: u32) -> Result<bool> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM books WHERE file = ? AND crc32 = ? LIMIT 1")
            .bind(file)
            .bind(i64::from(crc32))
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(id.is_some())
    }

    /// Whether any record references this archive base name. Keyed by name
    /// alone; an archive seen once is never re-walked.
    pub async fn is_archive_in_stock(&self, archive: &str) -> Result<bool> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM books WHERE archive = ? LIMIT 1")
            .bind(archive)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(id.is_some())
    }

    /// Insert a record, linking authors, genres and series.
    ///
    /// Idempotent on `(sort, crc32)`: if a matching row already exists (a
    /// race between workers, or an upstream dedup miss) its id is returned
    /// and nothing is inserted.
    pub async fn new_book(&self, book: &BookRecord) -> Result<i64> {
        if let Some(id) = self.find_book(&book.sort, book.crc32).await? {
            debug!(file = book.file, id, "duplicate (sort, crc32); reusing existing row");
            return Ok(id);
        }
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let book_id = sqlx::query(
            "INSERT INTO books (file, crc32, archive, size, format, title, sort, year, language, plot, cover, updated)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&book.file)
        .bind(i64::from(book.crc32))
        .bind(&book.archive)
        .bind(book.size)
        .bind(&book.format)
        .bind(&book.title)
        .bind(&book.sort)
        .bind(&book.year)
        .bind(&book.language)
        .bind(&book.plot)
        .bind(&book.cover)
        .bind(book.updated)
        .execute(&mut *tx)
        .await
        .or_raise(|| ErrorKind::Database)?
        .last_insert_rowid();

        for author in &book.authors {
            let author_id: Option<i64> = sqlx::query_scalar("SELECT id FROM authors WHERE sort = ? LIMIT 1")
                .bind(&author.sort)
                .fetch_optional(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            let author_id = match author_id {
                Some(id) => id,
                None => sqlx::query("INSERT INTO authors (name, sort) VALUES (?, ?)")
                    .bind(&author.name)
                    .bind(&author.sort)
                    .execute(&mut *tx)
                    .await
                    .or_raise(|| ErrorKind::Database)?
                    .last_insert_rowid(),
            };
            sqlx::query("INSERT INTO books_authors (book_id, author_id) VALUES (?, ?)")
                .bind(book_id)
                .bind(author_id)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }

        for genre in &book.genres {
            sqlx::query("INSERT INTO books_genres (book_id, genre_code) VALUES (?, ?)")
                .bind(book_id)
                .bind(genre)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }

        if !book.series.name.is_empty() {
            let serie_id: Option<i64> = sqlx::query_scalar("SELECT id FROM series WHERE name = ? LIMIT 1")
                .bind(&book.series.name)
                .fetch_optional(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            let serie_id = match serie_id {
                Some(id) => id,
                None => sqlx::query("INSERT INTO series (name) VALUES (?)")
                    .bind(&book.series.name)
                    .execute(&mut *tx)
                    .await
                    .or_raise(|| ErrorKind::Database)?
                    .last_insert_rowid(),
            };
            sqlx::query("INSERT INTO books_series (serie_num, book_id, serie_id) VALUES (?, ?, ?)")
                .bind(book.series.number)
                .bind(book_id)
                .bind(serie_id)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }

        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(book_id)
    }

    async fn find_book(&self, sort: &str, crc32: u32) -> Result<Option<i64>> {
        sqlx::query_scalar("SELECT id FROM books WHERE sort = ? AND crc32 = ? LIMIT 1")
            .bind(sort)
            .bind(i64::from(crc32))
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Create all catalog tables if they don't exist.
    pub async fn init_schema(&self) -> Result<()> {
        for statement in schema::INIT {
            sqlx::query(statement).execute(&self.pool).await.or_raise(|| ErrorKind::Schema)?;
        }
        Ok(())
    }

    /// Drop all catalog tables. Pairs with [`init_schema`](Self::init_schema)
    /// for a full reindex.
    pub async fn drop_schema(&self) -> Result<()> {
        for statement in schema::DROP {
            sqlx::query(statement).execute(&self.pool).await.or_raise(|| ErrorKind::Schema)?;
        }
        Ok(())
    }

    /// Whether the schema has been initialized.
    pub async fn is_ready(&self) -> Result<bool> {
        let name: Option<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'books'")
                .fetch_optional(&self.pool)
                .await
                .or_raise(|| ErrorKind::Database)?;
        Ok(name.is_some())
    }
}
