use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::page::PageRole;

pub const CBZ_EXTENSION: &str = "cbz";

/// Package the images in `src_dir` into `<dest_dir>/<src_dir name>.cbz`.
///
/// Only regular files directly inside `src_dir` are packaged, with no
/// directory prefix. The archive is first written as `.zip` and then renamed;
/// an existing `.cbz` of the same name is replaced.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use mangapack::cbz::write_cbz;
///
/// let cbz = write_cbz(Path::new("cache/vol01/Title Vol01"), Path::new("output"))?;
/// assert_eq!(cbz, Path::new("output/Title Vol01.cbz"));
/// # Ok::<(), mangapack::Error>(())
/// ```
pub fn write_cbz(src_dir: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let name = src_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::PackagingFailed(format!("{} has no directory name", src_dir.display()))
        })?;

    let pages = collect_pages(src_dir)?;
    if pages.is_empty() {
        return Err(Error::PackagingFailed(format!(
            "no images in {}",
            src_dir.display()
        )));
    }

    let unwritable = |e: io::Error| {
        Error::PackagingFailed(format!("cannot write to {}: {e}", dest_dir.display()))
    };

    fs::create_dir_all(dest_dir).map_err(unwritable)?;
    let zip_path = dest_dir.join(format!("{name}.zip"));
    let cbz_path = dest_dir.join(format!("{name}.{CBZ_EXTENSION}"));

    let file = File::create(&zip_path).map_err(unwritable)?;
    write_cbz_to_writer(&pages, file)?;

    if cbz_path.exists() {
        fs::remove_file(&cbz_path).map_err(unwritable)?;
    }
    fs::rename(&zip_path, &cbz_path).map_err(unwritable)?;

    info!(pages = pages.len(), "packed {}", cbz_path.display());
    Ok(cbz_path)
}

/// Write the given image files into a zip container, in the given order.
///
/// Entry names are the files' own names.
pub fn write_cbz_to_writer<W: Write + Seek>(pages: &[PathBuf], writer: W) -> Result<()> {
    let mut zip = ZipWriter::new(writer);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for path in pages {
        let entry_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::PackagingFailed(format!("bad page path {}", path.display())))?;

        zip.start_file(entry_name, options)?;
        let mut image = File::open(path)?;
        io::copy(&mut image, &mut zip)?;
    }

    zip.finish()?;
    Ok(())
}

/// Entry names of a CBZ (or any zip), in archive order.
pub fn entry_names<R: Read + Seek>(reader: R) -> Result<Vec<String>> {
    let mut archive = ZipArchive::new(reader)?;
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        names.push(archive.by_index(i)?.name().to_string());
    }
    Ok(names)
}

/// Files directly inside `dir`, in reading order.
///
/// Classified pages come first (cover, pages, end mark); anything else
/// follows by name. Plain name order would put `END-MARK` before `PAGE 001`.
fn collect_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        Error::PackagingFailed(format!("cannot read {}: {e}", dir.display()))
    })?;

    let mut pages = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            pages.push(entry.path());
        }
    }

    pages.sort_by_cached_key(|path| {
        let role = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(PageRole::from_stem);
        (role.is_none(), role, path.file_name().map(|n| n.to_os_string()))
    });
    Ok(pages)
}
