//! Shared fixtures for pipeline tests.

use crate::genres::{GenreNormalizer, PassthroughGenres};
use crate::scan::{Ingest, IngestSettings};
use shelf_catalog::{Database, Repository};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A minimal but complete document with one author, one genre and a date.
pub(crate) fn fb2_doc(title: &str, lang: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<FictionBook>
  <description>
    <title-info>
      <genre>sf</genre>
      <author><first-name>arthur</first-name><last-name>clarke</last-name></author>
      <book-title>{title}</book-title>
      <lang>{lang}</lang>
      <date>1956</date>
    </title-info>
  </description>
  <body><p>text</p></body>
</FictionBook>"#
    )
}

/// Stock/intake/quarantine directories plus a pipeline over an in-memory
/// catalog with the schema applied.
pub(crate) struct Fixture {
    pub root: TempDir,
    pub ingest: Ingest,
}

impl Fixture {
    pub async fn new(accepted: &str) -> Self {
        Self::with(accepted, 2).await
    }

    pub async fn with(accepted: &str, max_archive_workers: usize) -> Self {
        Self::with_genres(accepted, max_archive_workers, Arc::new(PassthroughGenres)).await
    }

    pub async fn with_genres(
        accepted: &str,
        max_archive_workers: usize,
        genres: Arc<dyn GenreNormalizer>,
    ) -> Self {
        let root = tempfile::tempdir().unwrap();
        for dir in ["stock", "intake", "quarantine"] {
            std::fs::create_dir(root.path().join(dir)).unwrap();
        }
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        repo.init_schema().await.unwrap();
        let settings = IngestSettings {
            stock: root.path().join("stock"),
            intake: Some(root.path().join("intake")),
            quarantine: root.path().join("quarantine"),
            max_archive_workers,
            accepted_langs: accepted.to_string(),
        };
        let ingest = Ingest::new(repo, genres, settings);
        Self { root, ingest }
    }

    pub fn dir(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    pub fn put(&self, dir: &str, name: &str, content: &[u8]) -> PathBuf {
        let path = self.dir(dir).join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    pub async fn books(&self) -> i64 {
        sqlx::query_scalar("SELECT count(*) FROM books")
            .fetch_one(self.ingest.repo.pool())
            .await
            .unwrap()
    }
}

/// Sorted base names of a directory's entries.
pub(crate) fn names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Write a zip container with the given entries.
pub(crate) fn zip_file(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for (name, content) in entries {
        writer.start_file(*name, zip::write::SimpleFileOptions::default()).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}
