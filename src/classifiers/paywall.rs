//! Paywall detection.

use super::keywords::{PAYWALL_KEYWORDS, SUBSCRIPTION_URL_TOKENS, contains_any};
use crate::models::{Evidence, EvidenceSource, FeedData, SitemapData, TriState, Verdict};

/// Chain-owned papers are assumed to be metered.
pub fn detect_paywall(
    homepage: Option<&str>,
    sitemap: &SitemapData,
    feed: &FeedData,
    chain: Option<&str>,
) -> Verdict<TriState> {
    let mut evidence = Evidence::new();

    if let Some(chain) = chain {
        evidence
            .source(EvidenceSource::Homepage)
            .note(format!("Chain heuristic: {chain}, default Paywall=Yes"));
        return Verdict::new(TriState::Yes, evidence);
    }

    let mut found = false;
    if homepage.is_some_and(|html| contains_any(&html.to_lowercase(), PAYWALL_KEYWORDS)) {
        found = true;
        evidence
            .source(EvidenceSource::Homepage)
            .note("Homepage contains paywall keywords");
    }

    if sitemap.used && sitemap.urls.iter().any(|u| contains_any(u, SUBSCRIPTION_URL_TOKENS)) {
        found = true;
        evidence
            .source(EvidenceSource::Sitemap)
            .note("Sitemap contains subscription-related URLs");
    }

    if feed.feed_found && feed.paywall_hint {
        found = true;
        evidence
            .source(EvidenceSource::Rss)
            .note("RSS feed contains paywall hints");
    }

    if !found {
        evidence.note("No paywall signals found");
    }
    Verdict::new(TriState::from_bool(found), evidence)
}
