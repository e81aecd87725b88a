//! Terminal placement of source files.
//!
//! Every scanned file ends up in exactly one place: the stock directory on
//! success, the quarantine directory on failure, or untouched when it is
//! already where it belongs. Moves are plain renames and assume all three
//! directories share a filesystem.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Move a successfully processed file into the stock directory.
///
/// A file already inside stock stays put; reindexing scans stock in place
/// and must not churn it. Name collisions overwrite.
pub async fn to_stock(path: &Path, stock: &Path) -> Result<()> {
    if path.parent() == Some(stock) {
        debug!(path = %path.display(), "already in stock");
        return Ok(());
    }
    let dest = stock.join(base_name(path)?);
    fs::rename(path, &dest).await.or_raise(|| ErrorKind::File(path.display().to_string()))?;
    debug!(from = %path.display(), to = %dest.display(), "moved to stock");
    Ok(())
}

/// Move a failed file into the quarantine directory, preserving its base
/// name and overwriting any previous occupant of that name.
pub async fn to_quarantine(path: &Path, quarantine: &Path) -> Result<()> {
    let dest = quarantine.join(base_name(path)?);
    fs::rename(path, &dest).await.or_raise(|| ErrorKind::File(path.display().to_string()))?;
    debug!(from = %path.display(), to = %dest.display(), "moved to quarantine");
    Ok(())
}

pub(crate) fn base_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_raise(|| ErrorKind::File(path.display().to_string()))
}
