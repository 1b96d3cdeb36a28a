//! Request header variants rotated through when a site refuses a request.

use serde::{Deserialize, Serialize};

/// A named set of request headers imitating one kind of client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderVariant {
    /// Minimal headers, lets the HTTP client pick `Accept-Encoding`.
    Default,
    Chrome,
    Firefox,
    Safari,
}

impl HeaderVariant {
    /// Rotation order.
    pub const ALL: [HeaderVariant; 4] = [Self::Default, Self::Chrome, Self::Firefox, Self::Safari];

    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Safari => "safari",
        }
    }

    /// Header pairs sent with every request of this variant.
    pub fn headers(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Default => &[
                ("User-Agent", "Mozilla/5.0 (compatible; paper_audit/0.1)"),
                ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
            ],
            Self::Chrome => &[
                (
                    "User-Agent",
                    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
                ),
                (
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
                ),
                ("Accept-Language", "en-US,en;q=0.9"),
                ("Accept-Encoding", "gzip, deflate, br"),
                ("Upgrade-Insecure-Requests", "1"),
                ("Sec-Fetch-Dest", "document"),
                ("Sec-Fetch-Mode", "navigate"),
                ("Sec-Fetch-Site", "none"),
            ],
            Self::Firefox => &[
                (
                    "User-Agent",
                    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
                ),
                ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
                ("Accept-Language", "en-US,en;q=0.5"),
                ("Accept-Encoding", "gzip, deflate, br"),
                ("DNT", "1"),
                ("Upgrade-Insecure-Requests", "1"),
            ],
            Self::Safari => &[
                (
                    "User-Agent",
                    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
                ),
                ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
                ("Accept-Language", "en-US,en;q=0.9"),
                ("Accept-Encoding", "gzip, deflate, br"),
            ],
        }
    }

    /// Variants to try: the pinned one alone, or the full rotation.
    pub fn rotation(pinned: Option<HeaderVariant>) -> Vec<HeaderVariant> {
        match pinned {
            Some(v) => vec![v],
            None => Self::ALL.to_vec(),
        }
    }
}
