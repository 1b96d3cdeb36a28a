//! Social profile links found on a homepage.
//!
//! Links are reduced to one canonical profile URL per account. Share
//! buttons, individual posts and videos, and the platforms' own generic
//! handles are dropped.

use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("valid selector"));

/// Anchor attributes that may carry a profile URL.
static LINK_ATTRS: [&str; 3] = ["href", "data-href", "data-url"];

const SOCIAL_HOST_TOKENS: &[&str] = &[
    "facebook.com",
    "fb.com",
    "instagram.com",
    "linkedin.com",
    "youtube.com",
    "youtu.be",
    "tiktok.com",
    "twitter.com",
    "x.com",
    "bsky.app",
    "bsky.social",
    "bluesky",
    "pinterest.com",
    "pin.it",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Facebook,
    Twitter,
    Instagram,
    LinkedIn,
    YouTube,
    TikTok,
    Bluesky,
    Pinterest,
}

impl Platform {
    pub fn from_host(host: &str) -> Option<Self> {
        let host = host.to_ascii_lowercase();
        let platform = if host.contains("facebook.com") {
            Self::Facebook
        } else if host.contains("twitter.com") || host == "x.com" || host.ends_with(".x.com") {
            Self::Twitter
        } else if host.contains("instagram.com") {
            Self::Instagram
        } else if host.contains("linkedin.com") {
            Self::LinkedIn
        } else if host.contains("youtube.com") || host.contains("youtu.be") {
            Self::YouTube
        } else if host.contains("tiktok.com") {
            Self::TikTok
        } else if host.contains("bsky.app") || host.contains("bsky.social") || host.contains("bluesky") {
            Self::Bluesky
        } else if host.contains("pinterest.com") || host == "pin.it" {
            Self::Pinterest
        } else {
            return None;
        };
        Some(platform)
    }

    /// Handles that name the platform itself rather than an account.
    fn generic_handles(self) -> &'static [&'static str] {
        match self {
            Self::Facebook => &["facebook", "fb", "facebookapp", "facebookads"],
            Self::Twitter => &["twitter", "x", "home", "share"],
            Self::Instagram => &["instagram", "ig", "reel", "reels"],
            Self::YouTube => &["youtube", "channel", "c", "user"],
            Self::TikTok => &["tiktok"],
            Self::Pinterest => &["pinterest"],
            Self::LinkedIn => &["linkedin"],
            Self::Bluesky => &["bluesky"],
        }
    }

    /// Host used in the canonical URL; `None` keeps the link as written.
    fn canonical_host(self) -> Option<&'static str> {
        match self {
            Self::Facebook => Some("www.facebook.com"),
            Self::Twitter => Some("twitter.com"),
            Self::Instagram => Some("www.instagram.com"),
            Self::LinkedIn => Some("www.linkedin.com"),
            Self::TikTok => Some("www.tiktok.com"),
            Self::Pinterest => Some("www.pinterest.com"),
            Self::YouTube | Self::Bluesky => None,
        }
    }

    /// Share dialogs, posts, videos and other non-profile pages.
    fn is_non_profile(self, path: &str) -> bool {
        let starts = |prefixes: &[&str]| prefixes.iter().any(|p| path.starts_with(p));
        let contains = |tokens: &[&str]| tokens.iter().any(|t| path.contains(t));
        match self {
            Self::Facebook => {
                contains(&["/sharer.php", "/share.php"])
                    || starts(&["/share", "/dialog", "/plugins/"])
                    || contains(&[
                        "/posts/",
                        "/photos/",
                        "/videos/",
                        "/reel/",
                        "/reels/",
                        "/watch",
                        "/events/",
                        "/permalink.php",
                        "/story.php",
                    ])
            }
            Self::Twitter => starts(&["/intent/", "/share", "/search", "/home", "/i/", "/hashtag", "/status/"]),
            Self::Instagram => starts(&["/p/", "/reel/", "/tv/", "/stories/"]),
            Self::LinkedIn => false,
            Self::YouTube => starts(&["/watch", "/shorts", "/playlist"]),
            Self::TikTok => path.contains("/video/") || path.starts_with("/t/"),
            Self::Bluesky => path.starts_with("/intent/"),
            Self::Pinterest => path.contains("/pin/create"),
        }
    }

    /// Whether a trimmed, lower-cased path has the shape of a profile root.
    fn is_profile_path(self, path: &str) -> bool {
        let depth = path.matches('/').count();
        match self {
            Self::Facebook => path.starts_with("/pages/") || path.starts_with("/profile.php") || depth == 1,
            Self::Twitter | Self::Instagram | Self::Pinterest => depth <= 1,
            Self::LinkedIn => ["/company/", "/in/", "/school/"]
                .iter()
                .any(|p| path.starts_with(p)),
            Self::YouTube => ["/@", "/channel/", "/c/", "/user/"]
                .iter()
                .any(|p| path.starts_with(p)),
            Self::TikTok => path.starts_with("/@"),
            Self::Bluesky => true,
        }
    }
}

/// Canonical profile URL for `url`, or `None` when it is not a profile link.
pub fn canonicalize_social_link(url: &str) -> Option<String> {
    let cleaned = url.trim();
    if cleaned.is_empty() {
        return None;
    }
    let cleaned = match cleaned.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => cleaned.to_string(),
    };

    let parsed = Url::parse(&cleaned).ok()?;
    let platform = Platform::from_host(parsed.host_str()?)?;
    let path = parsed.path().to_lowercase();
    if path.is_empty() || path == "/" || platform.is_non_profile(&path) {
        return None;
    }

    let trimmed = path.trim_end_matches('/');
    let handle = trimmed.trim_start_matches('/').split('/').next().unwrap_or_default();
    if platform.generic_handles().contains(&handle) || !platform.is_profile_path(trimmed) {
        return None;
    }

    Some(match platform.canonical_host() {
        Some(host) => format!("https://{host}{trimmed}"),
        None => cleaned,
    })
}

/// Canonicalize `values`, dropping non-profile links and duplicates.
pub fn normalize_social_links<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .filter_map(|v| canonicalize_social_link(v.as_ref()))
        .unique()
        .collect()
}

/// Loose host check used before canonicalization.
pub fn is_social_link(url: &str) -> bool {
    let lower = url.to_lowercase();
    SOCIAL_HOST_TOKENS.iter().any(|t| lower.contains(t))
}

fn resolve_href(href: &str, base: Option<&Url>) -> Option<String> {
    let cleaned = href.trim();
    if cleaned.is_empty() {
        return None;
    }
    if let Some(rest) = cleaned.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if cleaned.starts_with('/') {
        if let Some(joined) = base.and_then(|b| b.join(cleaned).ok()) {
            return Some(joined.to_string());
        }
    }
    Some(cleaned.to_string())
}

/// Canonical social profile links in anchor order.
///
/// Reads `href`, `data-href` and `data-url` of every `<a>`; protocol- and
/// root-relative values are resolved against `base_url`.
pub fn extract_social_links(html: &str, base_url: Option<&str>) -> Vec<String> {
    if html.trim().is_empty() {
        return Vec::new();
    }
    let base = base_url.and_then(|b| Url::parse(b).ok());
    let document = Html::parse_document(html);

    let candidates: Vec<String> = document
        .select(&ANCHOR)
        .flat_map(|a| {
            LINK_ATTRS
                .iter()
                .filter_map(move |attr| a.value().attr(attr))
        })
        .filter_map(|raw| resolve_href(raw, base.as_ref()))
        .filter(|link| is_social_link(link))
        .unique()
        .collect();

    let links = normalize_social_links(&candidates);
    debug!(candidates = candidates.len(), profiles = links.len(), "Extracted social links");
    links
}
