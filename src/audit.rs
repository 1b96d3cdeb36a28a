//! One complete site audit.
//!
//! [`Auditor::audit`] runs the homepage fetch, the sitemap probe and the feed
//! probe in order with a courtesy pause between them, then hands everything
//! to [`assemble`], which runs the classifiers and builds the
//! [`AuditResult`].

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::classifiers::cms::reconcile;
use crate::classifiers::{
    detect_chain, detect_cms, detect_notices, detect_paywall, detect_pdf, detect_privacy, detect_responsive,
    detected_chain,
};
use crate::config::{AuditConfig, SnapshotConfig};
use crate::error::Result;
use crate::fetch::transport::{HttpTransport, Transport};
use crate::fetch::{FetchOptions, Fetcher};
use crate::models::{AuditResult, Evidence, FeedData, FetchResult, SitemapData};
use crate::probes::{feed_options, probe_feed, probe_sitemaps, sitemap_options};
use crate::social::extract_social_links;
use crate::utils::normalize_target;

/// Note recorded for a blank target.
pub const NO_URL_NOTE: &str = "No website URL provided";

/// Placed between the kept head and tail of a truncated snapshot.
pub const TRUNCATION_MARKER: &str = "\n<!-- snapshot truncated -->\n";

static HEAD_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<head(\s[^>]*)?>").expect("valid regex"));
static BASE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<base[\s>/]").expect("valid regex"));

/// Runs audits with one configuration and one fetcher.
#[derive(Debug)]
pub struct Auditor<T = HttpTransport> {
    config: AuditConfig,
    fetcher: Fetcher<T>,
}

impl Auditor<HttpTransport> {
    /// Auditor with its own reqwest transport.
    pub fn new(config: AuditConfig) -> Result<Self> {
        let transport = HttpTransport::new()?;
        Ok(Self::with_transport(transport, config))
    }

    /// Auditor over a shared transport; the throttle stays per auditor.
    pub fn with_transport(transport: HttpTransport, config: AuditConfig) -> Self {
        let fetcher = Fetcher::from_config(transport, &config);
        Self { config, fetcher }
    }
}

impl<T: Transport> Auditor<T> {
    pub fn from_parts(config: AuditConfig, fetcher: Fetcher<T>) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Audit one target.
    ///
    /// Always returns a complete result, except for a terminal homepage
    /// timeout when `strict_timeouts` is set.
    #[instrument(level = "info", skip(self))]
    pub async fn audit(&self, raw_url: &str) -> Result<AuditResult> {
        let Some(url) = normalize_target(raw_url) else {
            warn!("Blank target; nothing to audit");
            return Ok(AuditResult::unaudited("", NO_URL_NOTE));
        };

        let options = FetchOptions::from_config(&self.config.fetch).raise_on_timeout(self.config.strict_timeouts);
        let homepage = self.fetcher.fetch_homepage(&url, &options).await?;
        self.fetcher.throttle().courtesy_pause().await;

        let base = if homepage.has_html() && !homepage.final_url.is_empty() {
            homepage.final_url.clone()
        } else {
            url.clone()
        };

        let sitemap = probe_sitemaps(&self.fetcher, &base, &sitemap_options(&self.config)).await;
        self.fetcher.throttle().courtesy_pause().await;
        let feed = probe_feed(&self.fetcher, &base, &feed_options(&self.config)).await;

        let result = assemble(url, &homepage, &sitemap, &feed, &self.config.snapshot);
        info!(
            url = %result.url,
            status = ?result.homepage_status,
            strategy = ?result.fetch_strategy,
            has_pdf = %result.has_pdf,
            pdf_only = %result.pdf_only,
            paywall = %result.paywall,
            chain = ?result.chain_owner,
            sources = %result.sources_label(),
            "Audit finished"
        );
        Ok(result)
    }
}

/// Run every classifier over the collected inputs and build the result.
pub fn assemble(
    url: String,
    homepage: &FetchResult,
    sitemap: &SitemapData,
    feed: &FeedData,
    snapshot: &SnapshotConfig,
) -> AuditResult {
    let html = homepage.html.as_deref().filter(|h| !h.trim().is_empty());

    let chain = detect_chain(html);
    let chain_name = detected_chain(&chain.value);
    let cms = detect_cms(html, sitemap);
    let labels = reconcile(cms.value.clone(), chain_name);
    let pdf = detect_pdf(html, sitemap, feed, chain_name, labels.vendor.as_deref());
    let paywall = detect_paywall(html, sitemap, feed, chain_name);
    let notices = detect_notices(html, sitemap, feed);
    let responsive = detect_responsive(html);
    let privacy = detect_privacy(html);

    let mut evidence = Evidence::new();
    for part in [
        &chain.evidence,
        &cms.evidence,
        &pdf.evidence,
        &paywall.evidence,
        &notices.evidence,
        &responsive.evidence,
        &privacy.evidence,
    ] {
        evidence.merge(part);
    }

    let base = if homepage.final_url.is_empty() { url.as_str() } else { homepage.final_url.as_str() };
    let (snapshot_html, truncated) = match html {
        Some(h) => sanitize_snapshot(h, base, snapshot.max_chars),
        None => (None, false),
    };

    if html.is_none() {
        evidence.note(fetch_failure_note(homepage));
    } else if truncated {
        evidence.note(format!(
            "Homepage snapshot truncated to {} characters",
            group_thousands(snapshot.max_chars)
        ));
    }

    let social_links = html
        .map(|h| extract_social_links(h, Some(base)))
        .unwrap_or_default();

    AuditResult {
        final_url: (!homepage.final_url.is_empty()).then(|| homepage.final_url.clone()),
        homepage_status: homepage.status,
        fetch_strategy: Some(homepage.strategy),
        has_pdf: pdf.value.has_pdf,
        pdf_only: pdf.value.pdf_only,
        paywall: paywall.value,
        notices: notices.value,
        responsive: responsive.value,
        chain_owner: Some(chain.value),
        cms_platform: labels.platform,
        cms_vendor: labels.vendor,
        privacy: privacy.value,
        sitemap_pdf_ratio: sitemap.pdf_ratio,
        feed_entry_count: feed.entry_count,
        feed_pdf_entry_count: feed.pdf_entry_count,
        social_links,
        sources: evidence.sources().to_vec(),
        notes: evidence.notes().to_vec(),
        homepage_html: snapshot_html,
        audited_at: chrono::Utc::now(),
        url,
    }
}

fn fetch_failure_note(homepage: &FetchResult) -> String {
    match (&homepage.error, homepage.status) {
        (Some(error), _) => format!("Homepage fetch failed: {error}"),
        (None, Some(status)) => format!("Homepage fetch returned HTTP {status}"),
        (None, None) => "Homepage fetch failed (unknown error)".to_string(),
    }
}

/// Clean a homepage for storage.
///
/// Strips NUL bytes and surrounding whitespace, adds a `<base href>` for
/// `base_url` when the page has none, and cuts the result to at most
/// `max_chars` characters, keeping the head and the tail around a single
/// [`TRUNCATION_MARKER`]. A cut snapshot always carries the marker, even
/// when `max_chars` is smaller than the marker itself. Returns the snapshot
/// and whether it was cut.
pub fn sanitize_snapshot(html: &str, base_url: &str, max_chars: usize) -> (Option<String>, bool) {
    let cleaned = html.replace('\0', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return (None, false);
    }

    let with_base = inject_base(cleaned, base_url);
    let total = with_base.chars().count();
    if total <= max_chars {
        return (Some(with_base), false);
    }

    let budget = max_chars.saturating_sub(TRUNCATION_MARKER.chars().count());
    let head_len = budget * 3 / 4;
    let tail_len = budget - head_len;

    let head_end = byte_offset(&with_base, head_len);
    let tail_start = byte_offset(&with_base, total - tail_len);
    let mut out = String::with_capacity(head_end + TRUNCATION_MARKER.len() + with_base.len() - tail_start);
    out.push_str(&with_base[..head_end]);
    out.push_str(TRUNCATION_MARKER);
    out.push_str(&with_base[tail_start..]);
    (Some(out), true)
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

fn inject_base(html: &str, base_url: &str) -> String {
    if base_url.is_empty() || BASE_TAG.is_match(html) {
        return html.to_string();
    }
    let tag = format!(r#"<base href="{}">"#, base_url.replace('"', "&quot;"));
    match HEAD_OPEN.find(html) {
        Some(m) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..m.end()]);
            out.push_str(&tag);
            out.push_str(&html[m.end()..]);
            out
        }
        None => format!("{tag}{html}"),
    }
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::headers::HeaderVariant;
    use crate::fetch::testing::{ScriptedTransport, fetcher};
    use crate::models::{EvidenceSource, FailureKind, FetchStrategy, TriState};

    fn test_config() -> AuditConfig {
        let mut config = AuditConfig::default();
        config.fetch.backoff_ms = 0;
        config.probe.backoff_ms = 0;
        config.politeness.pause_ms = 0;
        config
    }

    fn auditor(transport: ScriptedTransport, config: AuditConfig) -> Auditor<ScriptedTransport> {
        Auditor::from_parts(config, fetcher(transport))
    }

    fn homepage(html: &str) -> FetchResult {
        FetchResult::success(html.to_string(), 200, "https://paper.com/")
    }

    #[tokio::test]
    async fn test_blank_url_is_unaudited() {
        let a = auditor(ScriptedTransport::new(), test_config());
        let result = a.audit("   ").await.unwrap();
        assert_eq!(result.url, "");
        assert_eq!(result.notes, vec![NO_URL_NOTE.to_string()]);
        assert_eq!(result.has_pdf, TriState::ManualReview);
        assert_eq!(result.responsive, TriState::ManualReview);
        assert_eq!(result.sources_label(), "None");
        assert!(a.fetcher.transport().requests().is_empty());
    }

    #[tokio::test]
    async fn test_blox_homepage() {
        let t = ScriptedTransport::new();
        t.respond(
            "http://paper.com",
            200,
            r#"<html><head><title>Paper</title></head><body><div class="tncms-region">News</div></body></html>"#,
        );
        let a = auditor(t, test_config());
        let result = a.audit("paper.com").await.unwrap();

        assert_eq!(result.url, "http://paper.com");
        assert_eq!(result.fetch_strategy, Some(FetchStrategy::Direct));
        assert_eq!(result.cms_vendor.as_deref(), Some("BLOX"));
        assert_eq!(result.cms_platform.as_deref(), Some("BLOX Digital"));
        assert_eq!(result.chain_owner.as_deref(), Some("Independent"));
        let snapshot = result.homepage_html.unwrap();
        assert!(snapshot.starts_with(r#"<html><head><base href="http://paper.com">"#));

        let urls = a.fetcher.transport().urls();
        assert!(urls.contains(&"http://paper.com/sitemap.xml".to_string()));
        assert!(urls.contains(&"http://paper.com/index.rss".to_string()));
    }

    #[tokio::test]
    async fn test_pdf_dominated_sitemap() {
        let t = ScriptedTransport::new();
        t.respond("https://paper.com", 200, "<html><head></head><body><p>Local news</p></body></html>");
        let mut locs = String::new();
        for i in 0..9 {
            locs.push_str(&format!("<url><loc>https://paper.com/pages/{i}.pdf</loc></url>"));
        }
        locs.push_str("<url><loc>https://paper.com/about</loc></url>");
        t.respond(
            "https://paper.com/sitemap.xml",
            200,
            &format!(r#"<?xml version="1.0"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{locs}</urlset>"#),
        );
        let a = auditor(t, test_config());
        let result = a.audit("https://paper.com").await.unwrap();

        assert!((result.sitemap_pdf_ratio - 0.9).abs() < 1e-9);
        assert_eq!(result.has_pdf, TriState::Yes);
        assert_eq!(result.pdf_only, TriState::Yes);
        assert!(result.sources.contains(&EvidenceSource::Sitemap));
        assert_eq!(result.feed_entry_count, 0);
    }

    #[tokio::test]
    async fn test_strict_timeout_propagates() {
        let t = ScriptedTransport::new();
        t.fail("http://slow.com", FailureKind::Timeout, "operation timed out");
        let mut config = test_config();
        config.strict_timeouts = true;
        config.fetch.retries = 0;
        config.fetch.header_variant = Some(HeaderVariant::Chrome);
        let a = auditor(t, config);

        let err = a.audit("slow.com").await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_unreachable_homepage_still_completes() {
        let t = ScriptedTransport::new();
        t.fail("http://down.com", FailureKind::Connect, "connection refused");
        let mut config = test_config();
        config.fetch.retries = 0;
        config.fetch.header_variant = Some(HeaderVariant::Chrome);
        let a = auditor(t, config);

        let result = a.audit("down.com").await.unwrap();
        assert!(result.homepage_html.is_none());
        assert_eq!(result.responsive, TriState::ManualReview);
        assert!(result.notes.iter().any(|n| n.starts_with("Homepage fetch")));
    }

    #[test]
    fn test_edition_pdf_without_aux_sources() {
        let result = assemble(
            "https://paper.com".into(),
            &homepage(r#"<html><body><a href="/edition.pdf">E-Edition</a></body></html>"#),
            &SitemapData::default(),
            &FeedData::default(),
            &SnapshotConfig::default(),
        );
        assert_eq!(result.has_pdf, TriState::Yes);
        assert_eq!(result.pdf_only, TriState::ManualReview);
        assert!(result.sources.contains(&EvidenceSource::Homepage));
    }

    #[test]
    fn test_chain_is_never_pdf_only() {
        let sitemap = SitemapData {
            used: true,
            pdf_ratio: 1.0,
            urls: vec!["https://paper.com/a.pdf".into()],
            ..Default::default()
        };
        let result = assemble(
            "https://paper.com".into(),
            &homepage("<footer>A Lee Enterprises newspaper</footer>"),
            &sitemap,
            &FeedData::default(),
            &SnapshotConfig::default(),
        );
        assert_eq!(result.chain_owner.as_deref(), Some("Lee"));
        assert_eq!(result.pdf_only, TriState::No);
        assert_eq!(result.paywall, TriState::Yes);
    }

    #[test]
    fn test_fetch_failure_notes() {
        let cases = [
            (
                FetchResult::failed(None, "connection refused", FailureKind::Connect, "http://x.com"),
                "Homepage fetch failed: connection refused",
            ),
            (FetchResult::status_only(404, "http://x.com"), "Homepage fetch returned HTTP 404"),
            (
                FetchResult {
                    html: None,
                    status: None,
                    error: None,
                    failure: None,
                    final_url: "http://x.com".into(),
                    strategy: FetchStrategy::Direct,
                },
                "Homepage fetch failed (unknown error)",
            ),
        ];
        for (fetch, note) in cases {
            let result = assemble(
                "http://x.com".into(),
                &fetch,
                &SitemapData::default(),
                &FeedData::default(),
                &SnapshotConfig::default(),
            );
            assert!(result.notes.contains(&note.to_string()), "missing {note:?} in {:?}", result.notes);
        }
    }

    #[test]
    fn test_evidence_has_no_duplicates() {
        let result = assemble(
            "https://paper.com".into(),
            &homepage(r#"<meta name="viewport"><a href="/x.pdf">E-Edition</a> Subscribe now. Public notices"#),
            &SitemapData::default(),
            &FeedData::default(),
            &SnapshotConfig::default(),
        );
        assert_eq!(result.sources, vec![EvidenceSource::Homepage]);
        let mut notes = result.notes.clone();
        notes.sort();
        notes.dedup();
        assert_eq!(notes.len(), result.notes.len());
    }

    #[test]
    fn test_truncation_note_and_bound() {
        let html = format!("<html><head></head><body>{}</body></html>", "x".repeat(5_000));
        let result = assemble(
            "https://paper.com".into(),
            &homepage(&html),
            &SitemapData::default(),
            &FeedData::default(),
            &SnapshotConfig { max_chars: 1_000 },
        );
        assert!(result.homepage_html.unwrap().chars().count() <= 1_000);
        assert!(result.notes.contains(&"Homepage snapshot truncated to 1,000 characters".to_string()));
    }

    #[test]
    fn test_sanitize_strips_and_injects_base() {
        let (out, truncated) = sanitize_snapshot("  <html><HEAD lang=\"en\">\0<title>t</title></HEAD></html>\n", "https://p.com/", 1_000);
        assert!(!truncated);
        assert_eq!(
            out.as_deref(),
            Some(r#"<html><HEAD lang="en"><base href="https://p.com/"><title>t</title></HEAD></html>"#)
        );

        let (out, _) = sanitize_snapshot("<header>x</header>", "https://p.com/", 1_000);
        assert_eq!(out.as_deref(), Some(r#"<base href="https://p.com/"><header>x</header>"#));

        let (out, _) = sanitize_snapshot(r#"<head><base href="/"></head>"#, "https://p.com/", 1_000);
        assert_eq!(out.as_deref(), Some(r#"<head><base href="/"></head>"#));

        assert_eq!(sanitize_snapshot(" \0 ", "https://p.com/", 10), (None, false));
    }

    #[test]
    fn test_truncation_keeps_head_and_tail() {
        let html = format!("HEAD{}TAIL", "é".repeat(10_000));
        let (out, truncated) = sanitize_snapshot(&html, "", 500);
        let out = out.unwrap();
        assert!(truncated);
        assert!(out.chars().count() <= 500);
        assert!(out.starts_with("HEAD"));
        assert!(out.ends_with("TAIL"));
        assert_eq!(out.matches(TRUNCATION_MARKER).count(), 1);
    }

    #[test]
    fn test_tiny_budget_still_marks_truncation() {
        let html = "x".repeat(100);
        let (out, truncated) = sanitize_snapshot(&html, "", 10);
        assert!(truncated);
        assert_eq!(out.as_deref(), Some(TRUNCATION_MARKER));

        let (out, _) = sanitize_snapshot(&html, "", 40);
        let out = out.unwrap();
        assert_eq!(out.chars().count(), 40);
        assert_eq!(out.matches(TRUNCATION_MARKER).count(), 1);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(500_000), "500,000");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
