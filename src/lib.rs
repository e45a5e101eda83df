//! # mangapack
//!
//! Repack manga downloaded as EPUB from Vol.moe / Mox.moe / Kox.moe into CBZ
//! archives whose pages are in reading order.
//!
//! These packages list their pages in `vol.opf`, but the physical order of
//! the page documents is scrambled. mangapack:
//!
//! 1. resolves the reading order from the manifest ([`epub`]),
//! 2. renames every page image after its role: `COVER`, `PAGE 001`, ...,
//!    `END-MARK` ([`page`]),
//! 3. drops images that are not pages,
//! 4. zips what is left into `<name>.cbz` ([`cbz`]).
//!
//! [`batch::Converter`] runs this for a whole directory tree.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::atomic::AtomicBool;
//!
//! use mangapack::batch::{Converter, LogReporter};
//! use mangapack::config::Config;
//!
//! let settings = Config::default().resolve(Path::new("/manga/downloads"))?;
//! let converter = Converter::new(settings);
//! let archives = converter.discover()?;
//! let report = converter.run(&archives, &LogReporter, &AtomicBool::new(false))?;
//! println!("{} converted", report.converted.len());
//! # Ok::<(), mangapack::Error>(())
//! ```

pub mod batch;
pub mod cbz;
pub mod config;
pub mod epub;
mod error;
pub mod page;
pub(crate) mod util;

pub use batch::{BatchReport, Converter, SourceArchive, convert_one};
pub use cbz::write_cbz;
pub use config::{Config, Settings};
pub use epub::resolve_page_order;
pub use error::{Error, Result};
pub use page::{PageRole, classify, prune_unclassified, rename_pages};
