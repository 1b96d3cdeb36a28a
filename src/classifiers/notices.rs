//! Free public/legal notice detection.

use super::keywords::{NOTICE_KEYWORDS, contains_any};
use crate::models::{Evidence, EvidenceSource, FeedData, SitemapData, TriState, Verdict};

pub fn detect_notices(homepage: Option<&str>, sitemap: &SitemapData, feed: &FeedData) -> Verdict<TriState> {
    let mut evidence = Evidence::new();
    let mut found = false;

    if homepage.is_some_and(|html| contains_any(&html.to_lowercase(), NOTICE_KEYWORDS)) {
        found = true;
        evidence
            .source(EvidenceSource::Homepage)
            .note("Homepage contains public notice keywords");
    }
    if sitemap.used && sitemap.notices_found {
        found = true;
        evidence
            .source(EvidenceSource::Sitemap)
            .note("Sitemap contains notice-related URLs");
    }
    if feed.feed_found && feed.notices_found {
        found = true;
        evidence
            .source(EvidenceSource::Rss)
            .note("RSS feed contains notice keywords");
    }

    if !found {
        evidence.note("No notices found");
    }
    Verdict::new(TriState::from_bool(found), evidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_homepage_notices() {
        let v = detect_notices(
            Some("<nav><a href=\"/legals\">Public Notices</a></nav>"),
            &SitemapData::default(),
            &FeedData::default(),
        );
        assert_eq!(v.value, TriState::Yes);
    }

    #[test]
    fn test_sitemap_flag_requires_used() {
        let unused = SitemapData {
            notices_found: true,
            ..Default::default()
        };
        assert_eq!(detect_notices(None, &unused, &FeedData::default()).value, TriState::No);

        let used = SitemapData {
            used: true,
            notices_found: true,
            ..Default::default()
        };
        let v = detect_notices(None, &used, &FeedData::default());
        assert_eq!(v.value, TriState::Yes);
        assert_eq!(v.evidence.sources(), &[EvidenceSource::Sitemap]);
    }

    #[test]
    fn test_feed_flag() {
        let feed = FeedData {
            feed_found: true,
            notices_found: true,
            ..Default::default()
        };
        let v = detect_notices(Some("<p>sports</p>"), &SitemapData::default(), &feed);
        assert_eq!(v.value, TriState::Yes);
        assert_eq!(v.evidence.sources(), &[EvidenceSource::Rss]);
    }
}
