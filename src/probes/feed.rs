//! RSS/Atom feed probe.
//!
//! Candidates are tried in order and the first one that answers 200 with a
//! parseable RSS or Atom document wins. BLOX sites expose section feeds
//! through their search endpoint, so a target URL ending in a section slug
//! adds a search-as-feed candidate at the end.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{XmlError, is_pdf_like, local_name, origin_of};
use crate::classifiers::keywords::{NOTICE_KEYWORDS, PAYWALL_KEYWORDS, contains_any};
use crate::fetch::transport::Transport;
use crate::fetch::{FetchOptions, Fetcher};
use crate::models::FeedData;

pub const FEED_PATHS: [&str; 4] = ["/feed", "/rss", "/rss.xml", "/index.rss"];

/// Candidate feed URLs for `base_url`, in probe order.
pub fn feed_candidates(base_url: &str) -> Vec<String> {
    let Some(origin) = origin_of(base_url) else {
        return Vec::new();
    };
    let mut candidates: Vec<String> = FEED_PATHS
        .iter()
        .filter_map(|p| origin.join(p).ok())
        .map(String::from)
        .collect();
    if let Some(search) = search_feed_url(base_url) {
        candidates.push(search);
    }
    candidates
}

/// BLOX search-as-feed URL for the trailing path slug of `url`.
pub fn search_feed_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let slug = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()?
        .to_ascii_lowercase();
    let is_slug = slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !is_slug {
        return None;
    }
    let origin = origin_of(url)?;
    Some(format!(
        "{}search/?f=rss&t=article&c={}&l=50&s=start_time&sd=desc",
        origin,
        urlencoding::encode(&slug)
    ))
}

/// Probe the feed candidates of `base_url`, stopping at the first real feed.
#[instrument(level = "info", skip(fetcher, options))]
pub async fn probe_feed<T: Transport>(
    fetcher: &Fetcher<T>,
    base_url: &str,
    options: &FetchOptions,
) -> FeedData {
    for candidate in feed_candidates(base_url) {
        let result = match fetcher.fetch(&candidate, options).await {
            Ok(result) => result,
            Err(e) => {
                warn!(url = %candidate, error = %e, "Feed fetch raised; skipping");
                continue;
            }
        };
        let Some(body) = result.html.as_deref().filter(|b| !b.trim().is_empty()) else {
            debug!(url = %candidate, status = ?result.status, "No feed here");
            continue;
        };

        match parse_feed(body) {
            Ok(entries) => {
                let data = summarize(&candidate, body, &entries);
                info!(
                    url = %candidate,
                    entries = data.entry_count,
                    pdf_entries = data.pdf_entry_count,
                    paywall_hint = data.paywall_hint,
                    notices = data.notices_found,
                    "Feed found"
                );
                return data;
            }
            Err(e) => debug!(url = %candidate, error = %e, "Not a usable feed; skipping"),
        }
    }

    info!("No feed found");
    FeedData::default()
}

/// Feed statistics for an accepted document.
pub fn summarize(feed_url: &str, raw: &str, entries: &[String]) -> FeedData {
    let lower = raw.to_lowercase();
    FeedData {
        feed_found: true,
        paywall_hint: contains_any(&lower, PAYWALL_KEYWORDS),
        notices_found: contains_any(&lower, NOTICE_KEYWORDS),
        entry_count: entries.len(),
        pdf_entry_count: entries.iter().filter(|e| is_pdf_like(e)).count(),
        feed_url: Some(feed_url.to_string()),
    }
}

#[derive(Debug, Default)]
struct EntryLinks {
    alternate: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    enclosure: Option<String>,
    id: Option<String>,
}

impl EntryLinks {
    /// RSS: link, guid, enclosure. Atom: alternate link, id.
    fn representative(self) -> Option<String> {
        self.alternate
            .or(self.link)
            .or(self.guid)
            .or(self.enclosure)
            .or(self.id)
    }

    fn absorb_empty(&mut self, e: &BytesStart<'_>) {
        match local_name(e).as_str() {
            "link" => {
                let rel = attr(e, "rel");
                if matches!(rel.as_deref(), None | Some("alternate")) && self.alternate.is_none() {
                    self.alternate = attr(e, "href").filter(|h| !h.trim().is_empty());
                }
            }
            "enclosure" => {
                if self.enclosure.is_none() {
                    self.enclosure = attr(e, "url").filter(|u| !u.trim().is_empty());
                }
            }
            _ => {}
        }
    }

    fn absorb_text(&mut self, element: &str, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let slot = match element {
            "link" => &mut self.link,
            "guid" => &mut self.guid,
            "id" => &mut self.id,
            _ => return,
        };
        if slot.is_none() {
            *slot = Some(text.to_string());
        }
    }
}

fn attr(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name.as_bytes())
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// Representative link of every RSS `item` / Atom `entry`.
///
/// Rejects documents whose root is not `rss`, `rdf:RDF` or `feed`, and any
/// malformed XML.
pub fn parse_feed(xml: &str) -> Result<Vec<String>, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut open: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut current: Option<EntryLinks> = None;
    let mut entries = Vec::new();
    let mut root_checked = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e);
                if !root_checked {
                    if !matches!(name.as_str(), "rss" | "rdf" | "feed") {
                        return Err(XmlError::UnexpectedRoot(name));
                    }
                    root_checked = true;
                }
                if matches!(name.as_str(), "item" | "entry") {
                    current = Some(EntryLinks::default());
                } else if let Some(entry) = current.as_mut() {
                    // Atom links are occasionally written with a body.
                    entry.absorb_empty(&e);
                }
                open.push(name);
                text.clear();
            }
            Event::Empty(e) => {
                if !root_checked {
                    return Err(XmlError::UnexpectedRoot(local_name(&e)));
                }
                if let Some(entry) = current.as_mut() {
                    entry.absorb_empty(&e);
                }
            }
            Event::Text(e) => {
                if current.is_some() {
                    text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if current.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(_) => {
                let closed = open.pop().unwrap_or_default();
                if matches!(closed.as_str(), "item" | "entry") {
                    if let Some(link) = current.take().and_then(EntryLinks::representative) {
                        entries.push(link.trim().to_string());
                    }
                } else if let Some(entry) = current.as_mut() {
                    entry.absorb_text(&closed, &text);
                }
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = open.pop() {
        return Err(XmlError::Truncated(unclosed));
    }
    if !root_checked {
        return Err(XmlError::UnexpectedRoot(String::new()));
    }
    Ok(entries)
}
