//! Small helpers shared by the library and the binary.
//!
//! - Target normalization and host slugs for output file names
//! - Log-safe string truncation
//! - URL list files and output directory checks

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;

use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Truncate a string for logging purposes.
///
/// Cuts on a character boundary and appends how many bytes were dropped.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of characters to keep
///
/// # Returns
///
/// `s` unchanged if it fits, otherwise its first `max` characters with
/// `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Trim a target URL and give it a scheme.
///
/// Anything that does not already start with `http` gets `http://`
/// prepended; the escalation chain upgrades to HTTPS when the site redirects.
///
/// # Arguments
///
/// * `raw` - A target as typed on the command line or read from a list
///
/// # Returns
///
/// `None` for a blank target, otherwise the URL to audit.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_target("  paper.com "), Some("http://paper.com".to_string()));
/// assert_eq!(normalize_target("https://paper.com"), Some("https://paper.com".to_string()));
/// assert_eq!(normalize_target("   "), None);
/// ```
pub fn normalize_target(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.to_ascii_lowercase().starts_with("http") {
        Some(trimmed.to_string())
    } else {
        Some(format!("http://{trimmed}"))
    }
}

/// File-name friendly form of the host of `url`, `www.` dropped.
///
/// Characters other than ASCII letters, digits and `-` become `_`. Falls
/// back to the raw input when `url` does not parse, and to `"unknown"` when
/// nothing usable is left.
///
/// ```ignore
/// assert_eq!(host_slug("https://www.Example-News.com/a"), "example-news_com");
/// ```
pub fn host_slug(url: &str) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_else(|| url.to_ascii_lowercase());
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let slug: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug.to_string()
    }
}

/// Parse a URL list: one target per line, blank lines and `#` comments ignored.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read and parse a URL list file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_url_list(path: &Path) -> std::io::Result<Vec<String>> {
    let text = fs::read_to_string(path).await?;
    let urls = parse_url_list(&text);
    info!(count = urls.len(), "Loaded URL list");
    Ok(urls)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a scratch file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let scratch_path = format!("{}/..__write_check__", path.trim_end_matches('/'));
    match stdfs::File::create(&scratch_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&scratch_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
