use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use super::PageRole;
use crate::error::Result;

/// Delete every file under `dir` that is not a classified page image.
///
/// A file survives only if its stem parses with [`PageRole::from_stem`].
/// Returns the removed paths. Running it again removes nothing.
pub fn prune_unclassified(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let keep = entry
            .path()
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(PageRole::from_stem)
            .is_some();

        if !keep {
            fs::remove_file(entry.path())?;
            debug!("pruned {}", entry.path().display());
            removed.push(entry.into_path());
        }
    }

    if !removed.is_empty() {
        info!(count = removed.len(), "removed non-page files from {}", dir.display());
    }
    Ok(removed)
}
