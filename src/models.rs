//! Data models shared by the fetcher, the probers, the classifiers and the
//! aggregator.
//!
//! - [`FetchResult`]: outcome of one (possibly escalated) HTTP retrieval
//! - [`SitemapData`] / [`FeedData`]: what the auxiliary probes observed
//! - [`Verdict`]: a classifier outcome with its ordered [`Evidence`]
//! - [`AuditResult`]: the immutable record produced for one target
//!
//! Tri-state values serialize as `"Yes"`, `"No"` and `"Manual Review"`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tri-state classifier outcome.
///
/// `ManualReview` means the engine could not decide, which is not the same
/// thing as `No`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriState {
    Yes,
    No,
    #[default]
    #[serde(rename = "Manual Review")]
    ManualReview,
}

impl TriState {
    pub fn from_bool(value: bool) -> Self {
        if value { Self::Yes } else { Self::No }
    }

    pub fn is_yes(self) -> bool {
        self == Self::Yes
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::ManualReview => "Manual Review",
        })
    }
}

/// Where a piece of evidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceSource {
    Homepage,
    Sitemap,
    #[serde(rename = "RSS")]
    Rss,
}

impl fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Homepage => "Homepage",
            Self::Sitemap => "Sitemap",
            Self::Rss => "RSS",
        })
    }
}

/// Ordered, de-duplicated sources and notes backing a verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    sources: Vec<EvidenceSource>,
    notes: Vec<String>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a source; repeats keep their first position.
    pub fn source(&mut self, source: EvidenceSource) -> &mut Self {
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
        self
    }

    /// Record a note; repeats keep their first position.
    pub fn note(&mut self, note: impl Into<String>) -> &mut Self {
        let note = note.into();
        if !self.notes.contains(&note) {
            self.notes.push(note);
        }
        self
    }

    /// Append everything from `other`, preserving first-seen order.
    pub fn merge(&mut self, other: &Evidence) {
        for s in &other.sources {
            self.source(*s);
        }
        for n in &other.notes {
            self.note(n.clone());
        }
    }

    pub fn sources(&self) -> &[EvidenceSource] {
        &self.sources
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn has_source(&self, source: EvidenceSource) -> bool {
        self.sources.contains(&source)
    }
}

/// A classifier outcome together with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict<T> {
    pub value: T,
    pub evidence: Evidence,
}

impl<T> Verdict<T> {
    pub fn new(value: T, evidence: Evidence) -> Self {
        Self { value, evidence }
    }
}

/// Which escalation step produced a fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    Direct,
    HttpsUpgrade,
    Amp,
    Brotli,
    Headless,
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Direct => "direct",
            Self::HttpsUpgrade => "https_upgrade",
            Self::Amp => "amp",
            Self::Brotli => "brotli",
            Self::Headless => "headless",
        })
    }
}

/// Coarse classification of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Connect,
    Reset,
    Aborted,
    Tls,
    Decode,
    Other,
}

impl FailureKind {
    /// Failures that usually mean a bot filter dropped the connection.
    pub fn looks_like_bot_block(self) -> bool {
        matches!(self, Self::Reset | Self::Aborted | Self::Tls)
    }
}

/// Outcome of fetching one URL.
///
/// Exactly one of `html` / (`status` and/or `error`) describes the outcome:
/// a body is only present for a usable 200 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub html: Option<String>,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
    /// URL after redirects, or the requested URL when nothing came back.
    pub final_url: String,
    pub strategy: FetchStrategy,
}

impl FetchResult {
    pub fn success(html: String, status: u16, final_url: impl Into<String>) -> Self {
        Self {
            html: Some(html),
            status: Some(status),
            error: None,
            failure: None,
            final_url: final_url.into(),
            strategy: FetchStrategy::Direct,
        }
    }

    pub fn status_only(status: u16, final_url: impl Into<String>) -> Self {
        Self {
            html: None,
            status: Some(status),
            error: None,
            failure: None,
            final_url: final_url.into(),
            strategy: FetchStrategy::Direct,
        }
    }

    pub fn failed(
        status: Option<u16>,
        error: impl Into<String>,
        failure: FailureKind,
        final_url: impl Into<String>,
    ) -> Self {
        Self {
            html: None,
            status,
            error: Some(error.into()),
            failure: Some(failure),
            final_url: final_url.into(),
            strategy: FetchStrategy::Direct,
        }
    }

    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn has_html(&self) -> bool {
        self.html.as_deref().is_some_and(|h| !h.trim().is_empty())
    }

    /// 401/403/429 or a dropped/reset/TLS-broken connection.
    pub fn is_bot_blocked(&self) -> bool {
        matches!(self.status, Some(401 | 403 | 429))
            || self.failure.is_some_and(FailureKind::looks_like_bot_block)
    }

    pub fn is_redirect(&self) -> bool {
        self.status.is_some_and(|s| (300..400).contains(&s))
    }
}

/// What the sitemap probe observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SitemapData {
    /// Share of PDF-like URLs, always within `[0, 1]`.
    pub pdf_ratio: f64,
    pub notices_found: bool,
    /// At least one sitemap path answered 200 with a body.
    pub used: bool,
    /// Lower-cased `<loc>` values in discovery order.
    pub urls: Vec<String>,
}

/// What the feed probe observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedData {
    pub feed_found: bool,
    pub paywall_hint: bool,
    pub notices_found: bool,
    pub entry_count: usize,
    pub pdf_entry_count: usize,
    pub feed_url: Option<String>,
}

impl FeedData {
    /// Entries that are not PDF-like.
    pub fn article_entries(&self) -> usize {
        self.entry_count.saturating_sub(self.pdf_entry_count)
    }

    /// Feed missing, empty, or mostly PDF entries.
    pub fn lacks_real_articles(&self) -> bool {
        !self.feed_found
            || self.entry_count == 0
            || self.article_entries() == 0
            || self.pdf_entry_count * 2 > self.entry_count
    }
}

/// Tracker categories in the fixed order used for scoring and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerCategory {
    Analytics,
    TagManager,
    Pixel,
    SessionReplay,
    Ads,
    Consent,
}

impl TrackerCategory {
    pub const ORDER: [TrackerCategory; 6] = [
        Self::Analytics,
        Self::TagManager,
        Self::Pixel,
        Self::SessionReplay,
        Self::Ads,
        Self::Consent,
    ];

    pub fn weight(self) -> u32 {
        match self {
            Self::Analytics => 10,
            Self::TagManager => 15,
            Self::Pixel => 20,
            Self::SessionReplay => 25,
            Self::Ads => 20,
            Self::Consent => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Analytics => "Analytics",
            Self::TagManager => "Tag Manager",
            Self::Pixel => "Pixels",
            Self::SessionReplay => "Session Replay",
            Self::Ads => "Ad Networks",
            Self::Consent => "Consent",
        }
    }
}

/// How a tracker was spotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// A script/img URL pointed at the vendor.
    High,
    /// Only inline script code mentioned the vendor.
    Medium,
}

/// One detected third-party vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerMatch {
    pub name: String,
    pub category: TrackerCategory,
    pub confidence: Confidence,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyFlags {
    pub tracking: bool,
    pub consent: bool,
    pub session_replay: bool,
    pub pixels: bool,
    pub tag_manager: bool,
    pub analytics: bool,
    pub ad_network: bool,
}

/// Third-party tracking found on the homepage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrivacyReport {
    pub vendors: Vec<TrackerMatch>,
    pub flags: PrivacyFlags,
    /// 0-100, higher is more invasive.
    pub score: u8,
    pub summary: String,
}

/// Immutable record of one audit run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    /// Target after scheme normalization; empty when none was given.
    pub url: String,
    pub final_url: Option<String>,
    pub homepage_status: Option<u16>,
    pub fetch_strategy: Option<FetchStrategy>,

    pub has_pdf: TriState,
    pub pdf_only: TriState,
    pub paywall: TriState,
    pub notices: TriState,
    pub responsive: TriState,
    pub chain_owner: Option<String>,
    pub cms_platform: Option<String>,
    pub cms_vendor: Option<String>,
    pub privacy: PrivacyReport,

    pub sitemap_pdf_ratio: f64,
    pub feed_entry_count: usize,
    pub feed_pdf_entry_count: usize,
    pub social_links: Vec<String>,

    pub sources: Vec<EvidenceSource>,
    pub notes: Vec<String>,
    pub homepage_html: Option<String>,
    pub audited_at: DateTime<Utc>,
}

impl AuditResult {
    /// Result for a run that never got a usable target.
    pub fn unaudited(url: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            final_url: None,
            homepage_status: None,
            fetch_strategy: None,
            has_pdf: TriState::ManualReview,
            pdf_only: TriState::ManualReview,
            paywall: TriState::ManualReview,
            notices: TriState::ManualReview,
            responsive: TriState::ManualReview,
            chain_owner: None,
            cms_platform: None,
            cms_vendor: None,
            privacy: PrivacyReport::default(),
            sitemap_pdf_ratio: 0.0,
            feed_entry_count: 0,
            feed_pdf_entry_count: 0,
            social_links: Vec::new(),
            sources: Vec::new(),
            notes: vec![note.into()],
            homepage_html: None,
            audited_at: Utc::now(),
        }
    }

    /// Sources joined as `Homepage+RSS`, or `None` when empty.
    pub fn sources_label(&self) -> String {
        if self.sources.is_empty() {
            "None".to_string()
        } else {
            self.sources
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("+")
        }
    }

    /// Notes joined with ` | `.
    pub fn notes_label(&self) -> String {
        self.notes.join(" | ")
    }
}
