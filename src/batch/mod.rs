//! Batch conversion: drives every source archive through extract, resolve,
//! classify, filter and package, one archive at a time.

mod cache;
mod discover;
mod progress;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};

use regex::Regex;
use serde::Serialize;
use tracing::{error, info, warn};

pub use cache::CacheDir;
pub use discover::{discover_archives, mirror_tree, output_dir_for};
pub use progress::{LogReporter, ProgressReporter};

use crate::cbz::write_cbz;
use crate::config::Settings;
use crate::epub::{extract_archive, resolve_page_order};
use crate::error::{Error, Result};
use crate::page::{prune_unclassified, rename_pages};

/// `[Mox.moe]Title` -> `Title`.
static TAG_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[[^\]]*\]\s*(.+)$").expect("valid tag prefix regex"));

/// One input archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArchive {
    pub path: PathBuf,
    /// The work's name: file name without extensions and site tag.
    pub display_name: String,
}

impl SourceArchive {
    pub fn new(path: impl Into<PathBuf>) -> SourceArchive {
        let path = path.into();
        let display_name = display_name(&path);
        SourceArchive { path, display_name }
    }
}

/// Derive the work name from an archive file name.
///
/// `[Mox.moe][Title]Vol01.kepub.epub` becomes `[Title]Vol01`: the extensions
/// and the leading site tag are removed. Path separators are replaced so the
/// name is usable as a single directory name.
pub fn display_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let stem = strip_suffix_ignore_case(&file_name, ".epub");
    let stem = strip_suffix_ignore_case(stem, ".kepub");

    let name = TAG_PREFIX
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .map_or(stem, |m| m.as_str())
        .trim();

    let name = if name.is_empty() { stem.trim() } else { name };
    let name = name.replace(['/', '\\'], "_");
    if matches!(name.as_str(), "" | "." | "..") {
        "untitled".to_string()
    } else {
        name
    }
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> &'a str {
    let len = s.len();
    if len > suffix.len()
        && s.is_char_boundary(len - suffix.len())
        && s[len - suffix.len()..].eq_ignore_ascii_case(suffix)
    {
        &s[..len - suffix.len()]
    } else {
        s
    }
}

/// One successfully converted archive.
#[derive(Debug, Clone, Serialize)]
pub struct Converted {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// One archive that failed, with the error rendered for display.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub source: PathBuf,
    pub error: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub converted: Vec<Converted>,
    pub failed: Vec<Failure>,
    /// The run was stopped by an interrupt before finishing.
    pub interrupted: bool,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        !self.interrupted && self.failed.is_empty()
    }
}

/// Runs the conversion pipeline over a batch of archives.
#[derive(Debug, Clone)]
pub struct Converter {
    settings: Settings,
}

impl Converter {
    pub fn new(settings: Settings) -> Converter {
        Converter { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Find the source archives and pre-create the output tree.
    pub fn discover(&self) -> Result<Vec<SourceArchive>> {
        let archives = discover_archives(&self.settings)?;
        mirror_tree(&self.settings)?;
        Ok(archives.into_iter().map(SourceArchive::new).collect())
    }

    /// Convert every archive in order.
    ///
    /// A failing archive is recorded in the report and the batch moves on.
    /// When `cancel` is set the run stops after the current step, leaving the
    /// cache and any partial output on disk.
    pub fn run(
        &self,
        archives: &[SourceArchive],
        reporter: &dyn ProgressReporter,
        cancel: &AtomicBool,
    ) -> Result<BatchReport> {
        let cache = CacheDir::acquire(&self.settings.cache_dir)?;
        let mut report = BatchReport {
            total: archives.len(),
            ..BatchReport::default()
        };
        reporter.batch_started(archives.len());

        for (index, archive) in archives.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                report.interrupted = true;
                break;
            }
            reporter.archive_started(index, archive);

            let dest = output_dir_for(&archive.path, &self.settings);
            let outcome = convert_one(archive, cache.path(), &dest, cancel);
            if let Err(Error::Interrupted) = outcome {
                report.interrupted = true;
                break;
            }

            let completed = index + 1;
            match outcome {
                Ok(output) => {
                    reporter.archive_finished(completed, archive, Ok(&output));
                    report.converted.push(Converted {
                        source: archive.path.clone(),
                        output,
                    });
                }
                Err(e) => {
                    reporter.archive_finished(completed, archive, Err(&e));
                    report.failed.push(Failure {
                        source: archive.path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if report.interrupted {
            warn!("stopping; cache left at {}", cache.path().display());
        } else if self.settings.keep_cache {
            info!("keeping cache at {}", cache.path().display());
        } else if let Err(e) = cache.release() {
            error!("could not remove cache: {e}");
        }

        reporter.batch_finished(&report);
        Ok(report)
    }
}

/// Run the whole pipeline for one archive and return the written `.cbz`.
///
/// The archive is extracted into its own subdirectory of `cache_dir`; the
/// result is written to `dest_dir`.
pub fn convert_one(
    archive: &SourceArchive,
    cache_dir: &Path,
    dest_dir: &Path,
    cancel: &AtomicBool,
) -> Result<PathBuf> {
    let checkpoint = || {
        if cancel.load(Ordering::SeqCst) {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    };
    let name = &archive.display_name;

    info!("{name} => extracting");
    let extract_dir = extract_archive(&archive.path, cache_dir)?;
    checkpoint()?;

    let content = resolve_page_order(&extract_dir)?;
    checkpoint()?;

    let volume = rename_pages(&extract_dir, &content, name)?;
    checkpoint()?;

    prune_unclassified(&volume.dir)?;
    checkpoint()?;

    info!("{name} => packing {} page(s)", volume.pages.len());
    write_cbz(&volume.dir, dest_dir)
}
