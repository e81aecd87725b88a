//! Settings for the shelf pipeline.
//!
//! Layered loading: a TOML file (`shelf.toml` by default, or an explicit
//! path), then `SHELF_`-prefixed environment variables on top. Nested keys
//! use a double underscore, e.g. `SHELF_SCAN__MAX_ARCHIVE_WORKERS`.

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_FILE: &str = "shelf.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub library: Library,
    #[serde(default)]
    pub scan: Scan,
    pub catalog: Catalog,
}

/// The three directories every file is routed between.
#[derive(Debug, Clone, Deserialize)]
pub struct Library {
    /// Canonical home of ingested files.
    pub stock: PathBuf,
    /// Inbox of new acquisitions; when absent, stock is scanned in place.
    #[serde(default)]
    pub intake: Option<PathBuf>,
    /// Terminal location for files that failed processing.
    pub quarantine: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Scan {
    /// Upper bound on concurrently open archives.
    pub max_archive_workers: usize,
    /// Accepted-language string, matched by containment.
    pub accepted_langs: String,
    /// Seconds between poll passes.
    pub poll_period_secs: u64,
}

impl Default for Scan {
    fn default() -> Self {
        Self { max_archive_workers: 4, accepted_langs: "en,ru".to_string(), poll_period_secs: 30 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    /// SQLite database file path.
    pub database: PathBuf,
}

impl Settings {
    /// Load and validate settings. An explicit `path` must exist; the
    /// default file is optional as long as the environment fills the gaps.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Toml::file_exact(path),
            None => Toml::file(DEFAULT_FILE),
        };
        let settings: Self = Figment::new()
            .merge(file)
            .merge(Env::prefixed("SHELF_").split("__"))
            .extract()
            .or_raise(|| ErrorKind::Load)?;
        settings.validate()?;
        debug!(?settings, "configuration loaded");
        Ok(settings)
    }

    /// Reject settings that can only fail later and more confusingly.
    pub fn validate(&self) -> Result<()> {
        for (name, dir) in [("library.stock", Some(&self.library.stock)), ("library.quarantine", Some(&self.library.quarantine)), ("library.intake", self.library.intake.as_ref())] {
            let Some(dir) = dir else { continue };
            if !dir.is_dir() {
                exn::bail!(ErrorKind::Invalid(format!("{name}: {} is not a directory", dir.display())));
            }
        }
        if self.scan.max_archive_workers == 0 {
            exn::bail!(ErrorKind::Invalid("scan.max_archive_workers must be at least 1".to_string()));
        }
        if self.scan.poll_period_secs == 0 {
            exn::bail!(ErrorKind::Invalid("scan.poll_period_secs must be at least 1".to_string()));
        }
        Ok(())
    }
}
