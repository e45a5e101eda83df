//! Finding source archives and mirroring the input tree into the output root.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::config::Settings;
use crate::error::Result;

const SOURCE_EXTENSION: &str = "epub";
/// macOS AppleDouble companions (`._foo.epub`) are not archives.
const APPLEDOUBLE_PREFIX: &str = "._";

/// All `.epub` files under the input root, sorted by path.
///
/// Excluded directory names, the output root and the cache are skipped.
pub fn discover_archives(settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();

    let walker = WalkDir::new(&settings.input_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry, settings));

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_source_archive(entry.path()) {
            archives.push(entry.into_path());
        }
    }

    debug!(count = archives.len(), "discovered archives under {}", settings.input_dir.display());
    Ok(archives)
}

/// Recreate the input's directory structure under the output root.
pub fn mirror_tree(settings: &Settings) -> Result<()> {
    let walker = WalkDir::new(&settings.input_dir)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry, settings));

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() {
            fs::create_dir_all(output_dir_for_dir(entry.path(), settings))?;
        }
    }
    Ok(())
}

/// Where the `.cbz` for `archive` goes: the archive's folder relative to the
/// input root, re-rooted under the output root.
pub fn output_dir_for(archive: &Path, settings: &Settings) -> PathBuf {
    match archive.parent() {
        Some(parent) => output_dir_for_dir(parent, settings),
        None => settings.output_dir.clone(),
    }
}

fn output_dir_for_dir(dir: &Path, settings: &Settings) -> PathBuf {
    match dir.strip_prefix(&settings.input_dir) {
        Ok(relative) => settings.output_dir.join(relative),
        Err(_) => settings.output_dir.clone(),
    }
}

fn is_skipped_dir(entry: &DirEntry, settings: &Settings) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let path = entry.path();
    if path == settings.output_dir || path == settings.cache_dir {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    settings.exclude.iter().any(|excluded| *excluded == name)
}

fn is_source_archive(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.starts_with(APPLEDOUBLE_PREFIX)
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(root: &Path) -> Settings {
        Settings {
            input_dir: root.to_path_buf(),
            output_dir: root.join("output"),
            cache_dir: root.join("cache"),
            exclude: vec!["skip".to_string()],
            keep_cache: false,
        }
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_discover_archives() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        for rel in [
            "b.epub",
            "Series A/[Mox.moe][A]Vol02.kepub.epub",
            "Series A/[Mox.moe][A]Vol01.kepub.EPUB",
            "Series A/._[Mox.moe][A]Vol01.kepub.epub",
            "Series A/notes.txt",
            "skip/hidden.epub",
            "output/old.epub",
            "cache/vol/x.epub",
        ] {
            touch(root, rel);
        }

        let found = discover_archives(&settings(root)).unwrap();
        let rel: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(
            rel,
            vec![
                "Series A/[Mox.moe][A]Vol01.kepub.EPUB",
                "Series A/[Mox.moe][A]Vol02.kepub.epub",
                "b.epub",
            ]
        );
    }

    #[test]
    fn test_mirror_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(root, "Series A/Part 1/v1.epub");
        touch(root, "Series B/v1.epub");
        touch(root, "skip/v1.epub");

        mirror_tree(&settings(root)).unwrap();

        let out = root.join("output");
        assert!(out.join("Series A/Part 1").is_dir());
        assert!(out.join("Series B").is_dir());
        assert!(!out.join("skip").exists());
        assert!(!out.join("output").exists());
    }

    #[test]
    fn test_output_dir_for() {
        let root = Path::new("/manga");
        let s = settings(root);
        assert_eq!(
            output_dir_for(&root.join("Series A/v1.epub"), &s),
            root.join("output/Series A")
        );
        assert_eq!(output_dir_for(&root.join("v1.epub"), &s), root.join("output"));
        assert_eq!(output_dir_for(Path::new("/elsewhere/v1.epub"), &s), root.join("output"));
    }
}
