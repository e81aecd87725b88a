//! shelf: ingest FB2 e-books into a deduplicated catalog.
//!
//! Three modes share one pipeline: `scan` runs a single pass over the
//! intake directory, `reindex` rebuilds the catalog from the stock
//! directory in place, and `poll` repeats scan passes until interrupted.

use clap::{Parser, Subcommand};
use miette::{miette, Result};
use shelf_catalog::{Database, Repository};
use shelf_config::Settings;
use shelf_ingest::{Ingest, IngestSettings, PassthroughGenres};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "shelf", version, about = "FB2 e-book ingestion pipeline")]
struct Cli {
    /// Configuration file (defaults to shelf.toml in the working directory).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one ingestion pass over the intake directory.
    Scan,
    /// Drop the catalog and rebuild it from the stock directory.
    Reindex,
    /// Run ingestion passes repeatedly until interrupted.
    Poll,
}

/// Bridge pipeline errors into miette. `exn::Exn` is not a
/// `std::error::Error`, so `IntoDiagnostic` does not apply to it directly.
trait Render<T> {
    fn render(self) -> Result<T>;
}

impl<T, K: std::fmt::Display + std::error::Error + Send + Sync + 'static> Render<T>
    for std::result::Result<T, exn::Exn<K>>
{
    fn render(self) -> Result<T> {
        self.map_err(|err| miette!("{err}"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).render()?;
    let db = Database::connect(&settings.catalog.database).await.render()?;
    let repo = Repository::from(&db);
    let ingest = Ingest::new(
        repo.clone(),
        Arc::new(PassthroughGenres),
        IngestSettings {
            stock: settings.library.stock.clone(),
            intake: settings.library.intake.clone(),
            quarantine: settings.library.quarantine.clone(),
            max_archive_workers: settings.scan.max_archive_workers,
            accepted_langs: settings.scan.accepted_langs.clone(),
        },
    );

    match cli.command {
        Command::Scan => {
            ensure_schema(&repo).await?;
            let dir = ingest.inbox().to_path_buf();
            ingest.scan_pass(&dir).await.render()?;
        },
        Command::Reindex => {
            ingest.reindex().await.render()?;
        },
        Command::Poll => {
            ensure_schema(&repo).await?;
            poll(&ingest, Duration::from_secs(settings.scan.poll_period_secs)).await;
        },
    }

    db.close().await;
    Ok(())
}

/// Scan on a fixed period until ctrl-c. A pass that has started always
/// runs to completion; the interrupt takes effect between passes.
async fn poll(ingest: &Ingest, period: Duration) {
    let interrupt = Arc::new(tokio::sync::Notify::new());
    {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.notify_one();
            }
        });
    }

    let dir = ingest.inbox().to_path_buf();
    info!(dir = %dir.display(), period = ?period, "polling for new acquisitions");
    loop {
        if let Err(err) = ingest.scan_pass(&dir).await {
            // A transiently unreadable inbox shouldn't kill the poller.
            warn!(%err, "scan pass failed");
        }
        tokio::select! {
            _ = tokio::time::sleep(period) => {},
            _ = interrupt.notified() => {
                info!("interrupted, shutting down");
                break;
            },
        }
    }
}

async fn ensure_schema(repo: &Repository) -> Result<()> {
    if !repo.is_ready().await.render()? {
        info!("initializing catalog schema");
        repo.init_schema().await.render()?;
    }
    Ok(())
}
