//! Page order resolution from the `vol.opf` package manifest.
//!
//! The physical order of the content files inside a Mox.moe package is not
//! the reading order. The manifest ids are: `cover` for the cover page,
//! `Page_<n>` for numbered pages and a single non-numeric trailer (usually
//! `createby`) for the credits page.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use super::{CONTENT_DIR, MANIFEST_FILE};
use crate::error::{Error, Result};
use crate::util::read_text_file;

const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";
const PAGE_ID_PREFIX: &str = "Page_";
const COVER_ID: &str = "cover";

/// One XHTML item of the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// The item id with the `Page_` prefix removed.
    pub id: String,
    /// File name of the content document (last href segment, percent-decoded).
    pub file_name: String,
}

/// What an entry's id says about its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Cover,
    Numbered(usize),
    Trailer,
}

impl ManifestEntry {
    pub fn kind(&self) -> Result<EntryKind> {
        if self.id == COVER_ID {
            return Ok(EntryKind::Cover);
        }
        if !self.id.is_empty() && self.id.bytes().all(|b| b.is_ascii_digit()) {
            let n = self.id.parse().map_err(|_| {
                Error::ManifestMalformed(format!("page id {:?} out of range", self.id))
            })?;
            return Ok(EntryKind::Numbered(n));
        }
        Ok(EntryKind::Trailer)
    }
}

/// Resolve the reading order of the content documents of an extracted package.
///
/// Returns `<extract_dir>/html/<file>` for each XHTML manifest item, cover
/// first, numbered pages ascending, trailer last.
pub fn resolve_page_order(extract_dir: &Path) -> Result<Vec<PathBuf>> {
    let opf_path = extract_dir.join(MANIFEST_FILE);
    if !opf_path.is_file() {
        return Err(Error::ManifestMissing(opf_path));
    }

    let content = read_text_file(&opf_path)?;
    let entries = order_entries(parse_manifest(&content)?)?;
    debug!(pages = entries.len(), "resolved page order from {}", opf_path.display());

    let html_dir = extract_dir.join(CONTENT_DIR);
    Ok(entries
        .into_iter()
        .map(|entry| html_dir.join(entry.file_name))
        .collect())
}

/// Parse the XHTML items of an OPF manifest, in document order.
pub fn parse_manifest(content: &str) -> Result<Vec<ManifestEntry>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if local_name(e.name().as_ref()) == b"item" => {
                if let Some(entry) = parse_item(&e)? {
                    entries.push(entry);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::ManifestMalformed(e.to_string())),
            _ => {}
        }
    }

    if entries.is_empty() {
        return Err(Error::ManifestMalformed(
            "no application/xhtml+xml items in manifest".into(),
        ));
    }

    Ok(entries)
}

/// Sort entries into reading order.
///
/// Keys: cover is `0`, numbered pages use their number, the trailer uses the
/// entry count. The sort is stable, so equal numbers keep manifest order.
/// With a trailer present, no page may reach the trailer key: the trailer
/// always comes last.
pub fn order_entries(entries: Vec<ManifestEntry>) -> Result<Vec<ManifestEntry>> {
    let trailer_key = entries.len();

    let mut keyed = Vec::with_capacity(entries.len());
    let mut cover: Option<&str> = None;
    let mut trailer: Option<&str> = None;

    for entry in &entries {
        let key = match entry.kind()? {
            EntryKind::Cover => {
                if cover.replace(&entry.id).is_some() {
                    return Err(Error::ManifestMalformed("more than one cover entry".into()));
                }
                0
            }
            EntryKind::Numbered(n) => n,
            EntryKind::Trailer => {
                if let Some(previous) = trailer.replace(&entry.id) {
                    return Err(Error::ManifestMalformed(format!(
                        "more than one trailer entry ({previous:?} and {:?})",
                        entry.id
                    )));
                }
                trailer_key
            }
        };
        keyed.push(key);
    }

    for (entry, key) in entries.iter().zip(&keyed) {
        if let EntryKind::Numbered(n) = entry.kind()? {
            if n == 0 && cover.is_some() {
                return Err(Error::ManifestMalformed(format!(
                    "page {:?} collides with the cover",
                    entry.id
                )));
            }
            if *key >= trailer_key && trailer.is_some() {
                return Err(Error::ManifestMalformed(format!(
                    "page {:?} would sort after the trailer entry",
                    entry.id
                )));
            }
        }
    }

    let mut ordered: Vec<(usize, ManifestEntry)> = keyed.into_iter().zip(entries).collect();
    ordered.sort_by_key(|(key, _)| *key);
    Ok(ordered.into_iter().map(|(_, entry)| entry).collect())
}

/// Turn one `<item>` into an entry; `None` for items that are not XHTML.
fn parse_item(e: &BytesStart<'_>) -> Result<Option<ManifestEntry>> {
    let mut id: Option<String> = None;
    let mut href: Option<String> = None;
    let mut media_type: Option<String> = None;

    for attr in e.attributes().flatten() {
        let slot = match attr.key.as_ref() {
            b"id" => &mut id,
            b"href" => &mut href,
            b"media-type" => &mut media_type,
            _ => continue,
        };
        let raw = String::from_utf8(attr.value.to_vec())
            .map_err(|e| Error::ManifestMalformed(e.to_string()))?;
        *slot = Some(unescape(&raw));
    }

    if media_type.as_deref() != Some(XHTML_MEDIA_TYPE) {
        return Ok(None);
    }

    let id = id.ok_or_else(|| Error::ManifestMalformed("xhtml item without id".into()))?;
    let href = href
        .ok_or_else(|| Error::ManifestMalformed(format!("item {id:?} has no href")))?;
    let file_name = content_file_name(&href).ok_or_else(|| {
        Error::ManifestMalformed(format!("item {id:?} href {href:?} is not an HTML file"))
    })?;

    let id = id.strip_prefix(PAGE_ID_PREFIX).unwrap_or(&id).to_string();

    Ok(Some(ManifestEntry { id, file_name }))
}

/// Final path segment of an href, if it names an HTML document.
fn content_file_name(href: &str) -> Option<String> {
    let path = href.split(['#', '?']).next().unwrap_or(href);
    let segment = path.rsplit('/').next()?;
    let decoded = percent_decode_str(segment).decode_utf8_lossy();

    let ext = decoded.rsplit_once('.')?.1.to_ascii_lowercase();
    matches!(ext.as_str(), "html" | "xhtml" | "htm").then(|| decoded.into_owned())
}

fn unescape(raw: &str) -> String {
    quick_xml::escape::unescape(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Extract local name from namespaced XML name (e.g., "opf:item" -> "item").
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opf(items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Vol</dc:title></metadata>
  <manifest>
{items}
    <item id="css" href="css/style.css" media-type="text/css"/>
  </manifest>
  <spine><itemref idref="cover"/></spine>
</package>"#
        )
    }

    fn ids(entries: &[ManifestEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_scrambled_manifest_is_reordered() {
        let content = opf(r#"
    <item id="cover" href="html/cover.html" media-type="application/xhtml+xml"/>
    <item id="Page_2" href="html/2.html" media-type="application/xhtml+xml"/>
    <item id="Page_1" href="html/1.html" media-type="application/xhtml+xml"/>
    <item id="createby" href="html/createby.html" media-type="application/xhtml+xml"/>"#);

        let entries = order_entries(parse_manifest(&content).unwrap()).unwrap();
        assert_eq!(ids(&entries), vec!["cover", "1", "2", "createby"]);
    }

    #[test]
    fn test_trailer_listed_first_still_sorts_last() {
        let content = opf(r#"
    <item id="createby" href="html/createby.html" media-type="application/xhtml+xml"/>
    <item id="Page_3" href="html/3.html" media-type="application/xhtml+xml"/>
    <item id="Page_1" href="html/1.html" media-type="application/xhtml+xml"/>
    <item id="cover" href="html/cover.html" media-type="application/xhtml+xml"/>
    <item id="Page_2" href="html/2.html" media-type="application/xhtml+xml"/>"#);

        let entries = order_entries(parse_manifest(&content).unwrap()).unwrap();
        assert_eq!(ids(&entries), vec!["cover", "1", "2", "3", "createby"]);
        assert_eq!(entries[4].file_name, "createby.html");
    }

    #[test]
    fn test_non_xhtml_items_are_ignored() {
        let content = opf(r#"
    <item id="img1" href="image/1.jpg" media-type="image/jpeg"/>
    <item id="Page_1" href="html/1.html" media-type="application/xhtml+xml"/>"#);

        let entries = parse_manifest(&content).unwrap();
        assert_eq!(ids(&entries), vec!["1"]);
    }

    #[test]
    fn test_prefixed_item_elements() {
        let content = r#"<opf:package xmlns:opf="http://www.idpf.org/2007/opf">
  <opf:manifest>
    <opf:item id="Page_1" href="html/1.html" media-type="application/xhtml+xml"></opf:item>
  </opf:manifest>
</opf:package>"#;

        let entries = parse_manifest(content).unwrap();
        assert_eq!(ids(&entries), vec!["1"]);
    }

    #[test]
    fn test_href_segment_is_percent_decoded() {
        assert_eq!(
            content_file_name("html/%E5%B0%81.html"),
            Some("封.html".to_string())
        );
        assert_eq!(content_file_name("../html/p-1.xhtml#top"), Some("p-1.xhtml".to_string()));
        assert_eq!(content_file_name("image/1.jpg"), None);
        assert_eq!(content_file_name("html/"), None);
    }

    #[test]
    fn test_empty_manifest_is_malformed() {
        let content = opf("");
        assert!(matches!(
            parse_manifest(&content),
            Err(Error::ManifestMalformed(_))
        ));
    }

    #[test]
    fn test_missing_href_is_malformed() {
        let content = opf(r#"<item id="Page_1" media-type="application/xhtml+xml"/>"#);
        assert!(matches!(
            parse_manifest(&content),
            Err(Error::ManifestMalformed(_))
        ));
    }

    #[test]
    fn test_missing_id_is_malformed() {
        let content = opf(r#"<item href="html/1.html" media-type="application/xhtml+xml"/>"#);
        assert!(matches!(
            parse_manifest(&content),
            Err(Error::ManifestMalformed(_))
        ));
    }

    #[test]
    fn test_two_trailers_are_malformed() {
        let content = opf(r#"
    <item id="Page_1" href="html/1.html" media-type="application/xhtml+xml"/>
    <item id="createby" href="html/createby.html" media-type="application/xhtml+xml"/>
    <item id="colophon" href="html/colophon.html" media-type="application/xhtml+xml"/>"#);

        let result = order_entries(parse_manifest(&content).unwrap());
        assert!(matches!(result, Err(Error::ManifestMalformed(_))));
    }

    #[test]
    fn test_page_number_colliding_with_trailer_is_malformed() {
        // three entries, so the trailer key is 3
        let content = opf(r#"
    <item id="Page_1" href="html/1.html" media-type="application/xhtml+xml"/>
    <item id="Page_3" href="html/3.html" media-type="application/xhtml+xml"/>
    <item id="createby" href="html/createby.html" media-type="application/xhtml+xml"/>"#);

        let result = order_entries(parse_manifest(&content).unwrap());
        assert!(matches!(result, Err(Error::ManifestMalformed(_))));
    }

    #[test]
    fn test_page_number_beyond_trailer_is_malformed() {
        // four entries: page 5 would land after the trailer
        let content = opf(r#"
    <item id="cover" href="html/cover.html" media-type="application/xhtml+xml"/>
    <item id="Page_1" href="html/1.html" media-type="application/xhtml+xml"/>
    <item id="Page_5" href="html/5.html" media-type="application/xhtml+xml"/>
    <item id="createby" href="html/createby.html" media-type="application/xhtml+xml"/>"#);

        let result = order_entries(parse_manifest(&content).unwrap());
        assert!(matches!(result, Err(Error::ManifestMalformed(msg)) if msg.contains("\"5\"")));
    }

    #[test]
    fn test_page_gaps_without_trailer_are_fine() {
        let content = opf(r#"
    <item id="Page_9" href="html/9.html" media-type="application/xhtml+xml"/>
    <item id="cover" href="html/cover.html" media-type="application/xhtml+xml"/>
    <item id="Page_1" href="html/1.html" media-type="application/xhtml+xml"/>"#);

        let entries = order_entries(parse_manifest(&content).unwrap()).unwrap();
        assert_eq!(ids(&entries), vec!["cover", "1", "9"]);
    }

    #[test]
    fn test_equal_page_numbers_keep_manifest_order() {
        let entries = vec![
            ManifestEntry { id: "2".into(), file_name: "b.html".into() },
            ManifestEntry { id: "1".into(), file_name: "a.html".into() },
            ManifestEntry { id: "2".into(), file_name: "c.html".into() },
        ];

        let ordered = order_entries(entries).unwrap();
        let files: Vec<_> = ordered.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(files, vec!["a.html", "b.html", "c.html"]);
    }

    #[test]
    fn test_resolve_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve_page_order(dir.path());
        assert!(matches!(result, Err(Error::ManifestMissing(_))));
    }

    #[test]
    fn test_resolve_builds_html_paths() {
        let dir = tempfile::tempdir().unwrap();
        let content = opf(r#"
    <item id="Page_2" href="html/2.html" media-type="application/xhtml+xml"/>
    <item id="cover" href="html/cover.html" media-type="application/xhtml+xml"/>
    <item id="Page_1" href="html/1.html" media-type="application/xhtml+xml"/>"#);
        std::fs::write(dir.path().join("vol.opf"), content).unwrap();

        let order = resolve_page_order(dir.path()).unwrap();
        let html = dir.path().join("html");
        assert_eq!(
            order,
            vec![html.join("cover.html"), html.join("1.html"), html.join("2.html")]
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn resolved_order_ignores_manifest_order(
                pages in 1usize..40,
                with_trailer in any::<bool>(),
                seed in any::<u64>(),
            ) {
                let mut entries: Vec<ManifestEntry> = (1..=pages)
                    .map(|n| ManifestEntry { id: n.to_string(), file_name: format!("{n}.html") })
                    .collect();
                entries.push(ManifestEntry { id: "cover".into(), file_name: "cover.html".into() });
                if with_trailer {
                    entries.push(ManifestEntry { id: "createby".into(), file_name: "createby.html".into() });
                }

                // deterministic shuffle
                let mut state = seed;
                for i in (1..entries.len()).rev() {
                    state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                    let j = (state >> 33) as usize % (i + 1);
                    entries.swap(i, j);
                }

                let ordered = order_entries(entries).unwrap();
                let mut expected = vec!["cover".to_string()];
                expected.extend((1..=pages).map(|n| n.to_string()));
                if with_trailer {
                    expected.push("createby".into());
                }
                let got: Vec<String> = ordered.into_iter().map(|e| e.id).collect();
                prop_assert_eq!(got, expected);
            }
        }
    }
}
