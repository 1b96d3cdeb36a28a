//! Turning response bytes into text.
//!
//! Order of preference: the `Content-Type` charset, a `<meta charset>` near
//! the top of the document, UTF-8 with replacement, and finally Latin-1 when
//! the UTF-8 attempt is mostly garbage.

use encoding_rs::{Encoding, WINDOWS_1252};
use once_cell::sync::Lazy;
use regex::Regex;

/// How far into the document a `<meta charset>` is looked for.
const META_SNIFF_BYTES: usize = 2048;

static CONTENT_TYPE_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([a-z0-9_\-:.]+)"#).expect("valid regex"));

static META_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_\-:.]+)"#).expect("valid regex")
});

/// Charset parameter of a `Content-Type` header value.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    CONTENT_TYPE_CHARSET
        .captures(content_type)
        .map(|c| c[1].to_ascii_lowercase())
}

/// Charset declared by a `<meta>` tag in the first bytes of a document.
pub fn sniff_meta_charset(body: &[u8]) -> Option<String> {
    let head = &body[..body.len().min(META_SNIFF_BYTES)];
    let text = String::from_utf8_lossy(head);
    META_CHARSET
        .captures(&text)
        .map(|c| c[1].to_ascii_lowercase())
}

/// Decode a response body to text.
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let declared = content_type
        .and_then(charset_from_content_type)
        .or_else(|| sniff_meta_charset(body));

    if let Some(encoding) = declared.and_then(|label| Encoding::for_label(label.as_bytes())) {
        let (text, _, _) = encoding.decode(body);
        return text.into_owned();
    }

    let lossy = String::from_utf8_lossy(body);
    let replaced = lossy.chars().filter(|c| *c == char::REPLACEMENT_CHARACTER).count();
    if replaced > 0 && replaced * 100 > lossy.chars().count() {
        let (text, _) = WINDOWS_1252.decode_without_bom_handling(body);
        return text.into_owned();
    }
    lossy.into_owned()
}
