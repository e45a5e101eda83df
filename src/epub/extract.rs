use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::error::{Error, Result};

/// Unpack a source archive into its own subdirectory of `cache_dir`.
///
/// The subdirectory is named after the archive's file stem. If that name is
/// already taken (two volumes with the same stem in different folders), a
/// `_dup` suffix is appended, then `_dup2`, `_dup3`, ...
pub fn extract_archive(archive: &Path, cache_dir: &Path) -> Result<PathBuf> {
    let failed = |reason: String| Error::ExtractionFailed {
        archive: archive.to_path_buf(),
        reason,
    };

    let file = File::open(archive).map_err(|e| failed(e.to_string()))?;
    let mut zip = ZipArchive::new(file).map_err(|e| failed(e.to_string()))?;

    let dest = extraction_dir(archive, cache_dir);
    std::fs::create_dir_all(&dest)?;
    zip.extract(&dest).map_err(|e| failed(e.to_string()))?;

    debug!(entries = zip.len(), "extracted {} to {}", archive.display(), dest.display());
    Ok(dest)
}

/// First free extraction directory for `archive` under `cache_dir`.
pub fn extraction_dir(archive: &Path, cache_dir: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());

    let mut candidate = cache_dir.join(&stem);
    let mut attempt = 1;
    while candidate.exists() {
        let suffix = if attempt == 1 {
            "_dup".to_string()
        } else {
            format!("_dup{attempt}")
        };
        candidate = cache_dir.join(format!("{stem}{suffix}"));
        attempt += 1;
    }
    candidate
}
