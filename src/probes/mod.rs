//! Auxiliary endpoint probes: sitemaps and RSS/Atom feeds.
//!
//! Both run against the origin of the homepage's final URL and never fail:
//! unreachable or malformed sources are logged and skipped.

pub mod feed;
pub mod sitemap;

use std::time::Duration;

use quick_xml::events::BytesStart;
use thiserror::Error;
use url::Url;

use crate::classifiers::keywords::{PDF_URL_CONTEXT, contains_any};
use crate::config::AuditConfig;
use crate::fetch::FetchOptions;

pub use feed::probe_feed;
pub use sitemap::probe_sitemaps;

/// Why an XML document was rejected.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Malformed(#[from] quick_xml::Error),

    #[error("document ended inside <{0}>")]
    Truncated(String),

    #[error("unexpected root element <{0}>")]
    UnexpectedRoot(String),
}

/// A URL is PDF-like when its path ends in `.pdf` or it carries an
/// e-edition marker.
pub fn is_pdf_like(url: &str) -> bool {
    let lower = url.trim().to_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or_default();
    path.ends_with(".pdf") || contains_any(&lower, PDF_URL_CONTEXT)
}

/// `scheme://host[:port]` of `url`.
pub fn origin_of(url: &str) -> Option<Url> {
    let mut parsed = Url::parse(url).ok()?;
    parsed.host_str()?;
    parsed.set_path("/");
    parsed.set_query(None);
    parsed.set_fragment(None);
    Some(parsed)
}

pub(crate) fn sitemap_options(config: &AuditConfig) -> FetchOptions {
    probe_options(config, config.probe.sitemap_timeout_secs)
}

pub(crate) fn feed_options(config: &AuditConfig) -> FetchOptions {
    probe_options(config, config.probe.feed_timeout_secs)
}

fn probe_options(config: &AuditConfig, timeout_secs: u64) -> FetchOptions {
    FetchOptions::from_config(&config.fetch)
        .with_timeout(Duration::from_secs(timeout_secs))
        .with_retries(config.probe.retries)
        .with_backoff(Duration::from_millis(config.probe.backoff_ms))
}

/// Lower-cased local name of an element, namespace prefix dropped.
pub(crate) fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase()
}
