use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// The per-run working directory that holds every extraction.
///
/// Acquiring it wipes whatever a previous run left behind. It is only
/// deleted by an explicit [`CacheDir::release`]: an interrupted run leaves it
/// on disk for inspection.
#[derive(Debug)]
pub struct CacheDir {
    path: PathBuf,
}

impl CacheDir {
    pub fn acquire(path: &Path) -> Result<CacheDir> {
        if path.exists() {
            debug!("clearing stale cache {}", path.display());
            fs::remove_dir_all(path)?;
        }
        fs::create_dir_all(path)?;
        Ok(CacheDir {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the cache directory and everything in it.
    pub fn release(self) -> Result<()> {
        if self.path.exists() {
            fs::remove_dir_all(&self.path)?;
        }
        Ok(())
    }
}
