//! Text decoding helpers shared by the manifest and page readers.

use std::borrow::Cow;
use std::path::Path;

use crate::error::Result;

/// Decode bytes to a string, handling the encodings seen in manga packages.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Falls back to Windows-1252
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Read a text file from disk and decode it with [`decode_text`].
pub fn read_text_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let hint = xml_declared_encoding(&bytes);
    Ok(decode_text(&bytes, hint.as_deref()).into_owned())
}

/// Pull the `encoding="..."` value out of a leading XML declaration, if any.
fn xml_declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(200)];
    let head = String::from_utf8_lossy(head);
    let decl = head.strip_prefix('\u{feff}').unwrap_or(&head);
    let decl = decl.strip_prefix("<?xml")?;
    let end = decl.find("?>")?;
    let decl = &decl[..end];

    let start = decl.find("encoding=")? + "encoding=".len();
    let rest = &decl[start..];
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &rest[1..];
    let close = rest.find(quote)?;
    Some(rest[..close].to_string())
}
