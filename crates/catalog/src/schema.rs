//! Catalog schema, managed at runtime.
//!
//! A full reindex drops and recreates everything, so the schema is applied
//! by explicit statements rather than a migration history.

pub(crate) const INIT: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS books (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file TEXT NOT NULL,
        crc32 INTEGER NOT NULL,
        archive TEXT NOT NULL DEFAULT '',
        size INTEGER NOT NULL DEFAULT 0,
        format TEXT NOT NULL,
        title TEXT NOT NULL,
        sort TEXT NOT NULL,
        year TEXT NOT NULL DEFAULT '',
        language TEXT NOT NULL DEFAULT '',
        plot TEXT NOT NULL DEFAULT '',
        cover TEXT NOT NULL DEFAULT '',
        updated INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_books_file_crc32 ON books (file, crc32)",
    "CREATE INDEX IF NOT EXISTS idx_books_archive ON books (archive)",
    "CREATE INDEX IF NOT EXISTS idx_books_sort_crc32 ON books (sort, crc32)",
    "CREATE TABLE IF NOT EXISTS authors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        sort TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_authors_sort ON authors (sort)",
    "CREATE TABLE IF NOT EXISTS books_authors (
        book_id INTEGER NOT NULL REFERENCES books (id) ON DELETE CASCADE,
        author_id INTEGER NOT NULL REFERENCES authors (id)
    )",
    "CREATE TABLE IF NOT EXISTS books_genres (
        book_id INTEGER NOT NULL REFERENCES books (id) ON DELETE CASCADE,
        genre_code TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS series (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS books_series (
        serie_num INTEGER NOT NULL DEFAULT 0,
        book_id INTEGER NOT NULL REFERENCES books (id) ON DELETE CASCADE,
        serie_id INTEGER NOT NULL REFERENCES series (id)
    )",
];

pub(crate) const DROP: &[&str] = &[
    "DROP TABLE IF EXISTS books_series",
    "DROP TABLE IF EXISTS series",
    "DROP TABLE IF EXISTS books_genres",
    "DROP TABLE IF EXISTS books_authors",
    "DROP TABLE IF EXISTS authors",
    "DROP TABLE IF EXISTS books",
];
