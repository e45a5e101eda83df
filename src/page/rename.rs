use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use tracing::debug;

use super::{TaggedImage, classify};
use crate::epub::{IMAGE_DIR, read_page};
use crate::error::{Error, Result};

/// An image directory after classification, renamed to the work's name.
#[derive(Debug, Clone)]
pub struct ClassifiedVolume {
    pub dir: PathBuf,
    /// Classified images in reading order.
    pub pages: Vec<TaggedImage>,
}

/// Rename every page image of an extracted package to its role name.
///
/// `content` must be in reading order (see
/// [`resolve_page_order`](crate::epub::resolve_page_order)). After all
/// renames the `image/` directory itself is renamed to `display_name`.
/// Any failure aborts the whole volume.
pub fn rename_pages(
    extract_dir: &Path,
    content: &[PathBuf],
    display_name: &str,
) -> Result<ClassifiedVolume> {
    let image_dir = extract_dir.join(IMAGE_DIR);

    let mut claimed: HashSet<String> = HashSet::new();
    let mut pages = Vec::with_capacity(content.len());

    for content_path in content {
        let page = read_page(content_path)?;
        let src_name = image_file_name(&page.image_src);
        let src = image_dir.join(&src_name);

        let role = classify(&src_name, &page.title).ok_or_else(|| Error::PageNumberMissing {
            content: content_path.clone(),
            title: page.title.clone(),
        })?;

        let extension = Path::new(&src_name).extension().map(|e| e.to_string_lossy());
        let target_name = role.file_name(extension.as_deref());
        let target = image_dir.join(&target_name);

        if claimed.contains(&target_name) {
            return Err(Error::DuplicatePage {
                content: content_path.clone(),
                stem: role.file_stem(),
            });
        }

        if !src.is_file() {
            return Err(Error::PageImageMissing {
                content: content_path.clone(),
                image: src,
            });
        }

        if src != target {
            // On case-insensitive filesystems `cover.jpg` and `COVER.jpg`
            // are the same file; renaming it onto itself is not a clash.
            if target.exists() && !same_file(&src, &target) {
                return Err(Error::DuplicatePage {
                    content: content_path.clone(),
                    stem: role.file_stem(),
                });
            }
            fs::rename(&src, &target)?;
            debug!("{src_name} -> {target_name}");
        }

        claimed.insert(target_name);
        pages.push(TaggedImage {
            role,
            path: target,
            content: content_path.clone(),
        });
    }

    let dir = extract_dir.join(display_name);
    if dir != image_dir {
        // `html`, `vol.opf`, `.` and `..` are already taken
        if dir.exists() || matches!(display_name, "" | "." | "..") {
            return Err(Error::PackagingFailed(format!(
                "volume name {display_name:?} clashes with the extracted package layout"
            )));
        }
        fs::rename(&image_dir, &dir)?;
        for page in &mut pages {
            if let Some(name) = page.path.file_name() {
                page.path = dir.join(name);
            }
        }
    }

    Ok(ClassifiedVolume { dir, pages })
}

/// Whether two existing paths name the same file.
fn same_file(a: &Path, b: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        match (fs::metadata(a), fs::metadata(b)) {
            (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
            _ => false,
        }
    }
    #[cfg(not(unix))]
    {
        match (fs::canonicalize(a), fs::canonicalize(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// Basename of an `<img src>`, percent-decoded. Any directory part of the
/// reference is ignored: all images live in `image/`.
fn image_file_name(src: &str) -> String {
    let path = src.split(['#', '?']).next().unwrap_or(src);
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    percent_decode_str(name).decode_utf8_lossy().into_owned()
}
