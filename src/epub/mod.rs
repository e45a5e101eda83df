//! Reading extracted Mox.moe EPUB packages.
//!
//! A package unpacks to a fixed layout:
//!
//! ```text
//! vol.opf        manifest with the reading order
//! html/          one content document per page
//! image/         the page images
//! ```

mod content;
mod extract;
mod manifest;

pub use content::{PageContent, parse_page, read_page};
pub use extract::{extract_archive, extraction_dir};
pub use manifest::{EntryKind, ManifestEntry, order_entries, parse_manifest, resolve_page_order};

/// Manifest location relative to the extraction root.
pub const MANIFEST_FILE: &str = "vol.opf";
/// Directory holding the page content documents.
pub const CONTENT_DIR: &str = "html";
/// Directory holding the page images.
pub const IMAGE_DIR: &str = "image";
