//! Error types for mangapack operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while converting an archive.
///
/// Everything except [`Error::Interrupted`] and [`Error::Config`] is scoped to
/// a single source archive: the batch logs it and moves on.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("manifest not found: {}", .0.display())]
    ManifestMissing(PathBuf),

    #[error("malformed manifest: {0}")]
    ManifestMalformed(String),

    #[error("no page number in title {title:?} of {}", content.display())]
    PageNumberMissing { content: PathBuf, title: String },

    #[error("image {} referenced by {} does not exist", image.display(), content.display())]
    PageImageMissing { content: PathBuf, image: PathBuf },

    #[error("page {stem:?} claimed twice (second claim from {})", content.display())]
    DuplicatePage { content: PathBuf, stem: String },

    #[error("packaging failed: {0}")]
    PackagingFailed(String),

    #[error("failed to extract {}: {reason}", archive.display())]
    ExtractionFailed { archive: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("interrupted")]
    Interrupted,
}

pub type Result<T> = std::result::Result<T, Error>;
