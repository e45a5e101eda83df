//! Page classification.
//!
//! Each page's role and position is encoded in its image file name, so that a
//! directory of renamed images is self-describing:
//!
//! | role        | stem        |
//! |-------------|-------------|
//! | cover       | `COVER`     |
//! | end of book | `END-MARK`  |
//! | page *n*    | `PAGE 007`  |
//!
//! [`PageRole::file_stem`] and [`PageRole::from_stem`] are the only places
//! that know this naming.

mod filter;
mod rename;

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

pub use filter::prune_unclassified;
pub use rename::{ClassifiedVolume, rename_pages};

/// Token in an image file name marking the cover (matched case-insensitively).
pub const COVER_MARKER: &str = "cover";
/// Token in a page title marking the end-of-volume page.
pub const END_MARKER: &str = "END";

const COVER_STEM: &str = "COVER";
const END_STEM: &str = "END-MARK";
const PAGE_STEM_PREFIX: &str = "PAGE ";

static PAGE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9\x{FF10}-\x{FF19}]+").expect("valid page number regex"));

/// The role of one page image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageRole {
    Cover,
    Page(u32),
    End,
}

impl PageRole {
    /// File stem encoding this role, e.g. `PAGE 012`.
    pub fn file_stem(&self) -> String {
        match self {
            PageRole::Cover => COVER_STEM.to_string(),
            PageRole::End => END_STEM.to_string(),
            PageRole::Page(n) => format!("{PAGE_STEM_PREFIX}{n:03}"),
        }
    }

    /// File name for this role, keeping the image's original extension.
    pub fn file_name(&self, extension: Option<&str>) -> String {
        match extension {
            Some(ext) if !ext.is_empty() => format!("{}.{ext}", self.file_stem()),
            _ => self.file_stem(),
        }
    }

    /// Inverse of [`PageRole::file_stem`]. `None` for any other name.
    pub fn from_stem(stem: &str) -> Option<PageRole> {
        match stem {
            COVER_STEM => Some(PageRole::Cover),
            END_STEM => Some(PageRole::End),
            _ => {
                let digits = stem.strip_prefix(PAGE_STEM_PREFIX)?;
                if digits.len() < 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.parse().ok().map(PageRole::Page)
            }
        }
    }

    /// Position in reading order: cover, pages ascending, end mark.
    fn rank(&self) -> (u8, u32) {
        match self {
            PageRole::Cover => (0, 0),
            PageRole::Page(n) => (1, *n),
            PageRole::End => (2, 0),
        }
    }
}

impl Ord for PageRole {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for PageRole {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_stem())
    }
}

/// A page image after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedImage {
    pub role: PageRole,
    /// Where the renamed image lives now.
    pub path: PathBuf,
    /// The content document that referenced it.
    pub content: PathBuf,
}

/// Classify a page from its image file name and its title.
///
/// The cover marker in the image name wins over everything, then the end
/// marker in the title, then the first number in the title. Returns `None`
/// when a page is neither cover nor end and its title has no digits.
pub fn classify(image_name: &str, title: &str) -> Option<PageRole> {
    if image_name.to_ascii_lowercase().contains(COVER_MARKER) {
        return Some(PageRole::Cover);
    }
    if title.contains(END_MARKER) {
        return Some(PageRole::End);
    }
    page_number(title).map(PageRole::Page)
}

/// First run of decimal digits in `title`. Full-width digits count too.
fn page_number(title: &str) -> Option<u32> {
    let digits: String = PAGE_NUMBER
        .find(title)?
        .as_str()
        .chars()
        .map(|c| match c {
            '\u{FF10}'..='\u{FF19}' => {
                char::from(b'0' + (c as u32 - 0xFF10) as u8)
            }
            _ => c,
        })
        .collect();
    digits.parse().ok()
}
