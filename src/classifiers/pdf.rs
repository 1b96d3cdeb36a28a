//! PDF edition and PDF-only classification.
//!
//! `has_pdf` asks whether the paper publishes a PDF/replica edition at all.
//! `pdf_only` asks whether that edition is *all* it publishes, which needs
//! corroboration from the sitemap, the feed, the CMS vendor or the shape of
//! the homepage itself.
//!
//! Reasons for `pdf_only` come in two strengths. Decisive reasons (a sitemap
//! dominated by PDFs, a Tecnavia replica vendor, a homepage dominated by PDF
//! links) can carry a `Yes` on their own once the feed shows no real
//! articles. Corroborating reasons (no feed, no sitemap) are recorded but
//! never decide alone.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use super::keywords::{
    ARTICLE_CLASS_TOKENS, ARTICLE_HREF_KEYWORDS, FLIPBOOK_HOSTS, PDF_EMBED_KEYWORDS,
    PDF_HREF_KEYWORDS, PDF_TEXT_KEYWORDS, contains_any,
};
use crate::models::{Evidence, EvidenceSource, FeedData, SitemapData, TriState, Verdict};

/// Sitemap PDF share above which the sitemap alone is decisive.
pub const SITEMAP_PDF_DOMINANT: f64 = 0.75;
/// Homepage PDF-link density rule.
pub const PDF_HEAVY_MIN_LINKS: usize = 3;
pub const PDF_HEAVY_MIN_SHARE: f64 = 0.15;
/// Strong article signal thresholds.
pub const STRONG_ARTICLE_SIGNALS: usize = 3;
pub const STRONG_ARTICLE_TAGS: usize = 2;
pub const STRONG_ARTICLE_SHARE: f64 = 0.20;

static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));
static ARTICLE_TAGS: Lazy<Selector> = Lazy::new(|| Selector::parse("article").expect("valid selector"));
static CLASSED: Lazy<Selector> = Lazy::new(|| Selector::parse("[class]").expect("valid selector"));
static EMBEDS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("iframe[src], object[data], embed[src], script[src]").expect("valid selector")
});
static ALL: Lazy<Selector> = Lazy::new(|| Selector::parse("*").expect("valid selector"));

/// The two PDF verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfVerdict {
    pub has_pdf: TriState,
    pub pdf_only: TriState,
}

/// What the homepage markup says about PDFs and articles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomepageSignals {
    pub anchors: usize,
    /// Hrefs ending in `.pdf`.
    pub pdf_links: Vec<String>,
    /// E-edition style links, only collected when there are no `.pdf` links.
    pub hint_links: Vec<String>,
    /// Embedded flip-book or PDF viewer URLs.
    pub embeds: Vec<String>,
    pub article_anchors: usize,
    pub article_tags: usize,
    pub article_classes: usize,
}

impl HomepageSignals {
    pub fn scan(html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut signals = Self::default();

        let anchors: Vec<ElementRef<'_>> = document.select(&ANCHORS).collect();
        signals.anchors = anchors.len();

        for a in &anchors {
            let href = a.value().attr("href").unwrap_or_default().trim();
            let lower = href.to_lowercase();
            let path = lower.split(['?', '#']).next().unwrap_or_default();
            if path.ends_with(".pdf") {
                signals.pdf_links.push(href.to_string());
            }
            if contains_any(&lower, ARTICLE_HREF_KEYWORDS) {
                signals.article_anchors += 1;
            }
        }

        if signals.pdf_links.is_empty() {
            for a in &anchors {
                let href = a.value().attr("href").unwrap_or_default().trim();
                let text = a.text().collect::<String>().trim().to_lowercase();
                if href.is_empty() && text.is_empty() {
                    continue;
                }
                if contains_any(&text, PDF_TEXT_KEYWORDS)
                    || contains_any(&href.to_lowercase(), PDF_HREF_KEYWORDS)
                {
                    signals.hint_links.push(href.to_string());
                }
            }
        }

        signals.embeds = embedded_viewers(&document);
        signals.article_tags = document.select(&ARTICLE_TAGS).count();
        signals.article_classes = document
            .select(&CLASSED)
            .filter(|el| {
                el.value()
                    .classes()
                    .any(|c| contains_any(&c.to_lowercase(), ARTICLE_CLASS_TOKENS))
            })
            .count();

        signals
    }

    pub fn has_pdf_evidence(&self) -> bool {
        !self.pdf_links.is_empty() || !self.hint_links.is_empty() || !self.embeds.is_empty()
    }

    /// At least three `.pdf` links making up 15% or more of all anchors.
    pub fn is_pdf_heavy(&self) -> bool {
        self.pdf_links.len() >= PDF_HEAVY_MIN_LINKS
            && self.pdf_links.len() as f64 >= PDF_HEAVY_MIN_SHARE * self.anchors as f64
    }

    pub fn article_signals(&self) -> usize {
        self.article_anchors + self.article_tags + self.article_classes
    }

    pub fn has_strong_articles(&self) -> bool {
        self.article_signals() >= STRONG_ARTICLE_SIGNALS
            || self.article_tags >= STRONG_ARTICLE_TAGS
            || (self.anchors > 0
                && self.article_anchors as f64 >= STRONG_ARTICLE_SHARE * self.anchors as f64)
    }
}

/// Flip-book embeds, or other PDF-keyword embeds when there are none.
fn embedded_viewers(document: &Html) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    for el in document.select(&EMBEDS) {
        let value = el.value();
        if let Some(url) = value.attr("src").or_else(|| value.attr("data")) {
            candidates.push(url.trim().to_string());
        }
    }
    for el in document.select(&ALL) {
        for (name, value) in el.value().attrs() {
            let value = value.trim();
            if name.starts_with("data-") && (value.starts_with("http") || value.starts_with("//")) {
                candidates.push(value.to_string());
            }
        }
    }

    let mut flipbooks = Vec::new();
    let mut others = Vec::new();
    for url in candidates {
        let lower = url.to_lowercase();
        let bucket = if contains_any(&lower, FLIPBOOK_HOSTS) {
            &mut flipbooks
        } else if contains_any(&lower, PDF_EMBED_KEYWORDS) {
            &mut others
        } else {
            continue;
        };
        if !bucket.contains(&url) {
            bucket.push(url);
        }
    }
    if flipbooks.is_empty() { others } else { flipbooks }
}

/// Classify PDF edition and PDF-only status.
pub fn detect_pdf(
    homepage: Option<&str>,
    sitemap: &SitemapData,
    feed: &FeedData,
    chain: Option<&str>,
    vendor: Option<&str>,
) -> Verdict<PdfVerdict> {
    let signals = homepage.map(HomepageSignals::scan);
    classify(signals.as_ref(), sitemap, feed, chain, vendor)
}

/// Decision rules over already-scanned homepage signals.
pub fn classify(
    signals: Option<&HomepageSignals>,
    sitemap: &SitemapData,
    feed: &FeedData,
    chain: Option<&str>,
    vendor: Option<&str>,
) -> Verdict<PdfVerdict> {
    let mut evidence = Evidence::new();
    let mut has_pdf = false;

    if let Some(s) = signals {
        if !s.pdf_links.is_empty() {
            has_pdf = true;
            evidence
                .source(EvidenceSource::Homepage)
                .note(format!("Found {} PDF links on homepage", s.pdf_links.len()));
        }
        if !s.hint_links.is_empty() {
            has_pdf = true;
            let mut sample = s.hint_links.clone();
            sample.sort();
            sample.dedup();
            sample.truncate(3);
            evidence.source(EvidenceSource::Homepage).note(format!(
                "Homepage contains e-edition style link(s): {}",
                sample.join(", ")
            ));
        }
        if !s.embeds.is_empty() {
            has_pdf = true;
            let sample: Vec<&str> = s.embeds.iter().take(3).map(String::as_str).collect();
            evidence.source(EvidenceSource::Homepage).note(format!(
                "Homepage embeds a digital edition viewer: {}",
                sample.join(", ")
            ));
        }
    }

    if sitemap.used {
        evidence.source(EvidenceSource::Sitemap);
        if sitemap.pdf_ratio > 0.0 {
            has_pdf = true;
            evidence.note(format!(
                "Sitemap shows {:.0}% PDF URLs",
                sitemap.pdf_ratio * 100.0
            ));
        }
    }

    if feed.feed_found {
        evidence.source(EvidenceSource::Rss).note(format!(
            "RSS present with {} entries ({} PDF-like)",
            feed.entry_count, feed.pdf_entry_count
        ));
    }

    let observed = signals.is_some() || sitemap.used || feed.feed_found;
    let auxiliary_observed = sitemap.used || feed.feed_found;

    let pdf_only = if let Some(chain) = chain {
        evidence.note(format!("Chain heuristic: {chain}, not PDF-only"));
        TriState::No
    } else if has_pdf {
        let strong_articles = signals.is_some_and(HomepageSignals::has_strong_articles);
        let mut feed_lacks_articles = feed.lacks_real_articles();
        if strong_articles && feed_lacks_articles {
            feed_lacks_articles = false;
            evidence.note("Homepage shows strong article signals");
        }

        let pdf_heavy = signals.is_some_and(HomepageSignals::is_pdf_heavy);
        let tecnavia = vendor.is_some_and(|v| v.to_lowercase().starts_with("tecnavia"));
        let sitemap_dominant = sitemap.pdf_ratio > SITEMAP_PDF_DOMINANT;

        let mut reasons: Vec<String> = Vec::new();
        if sitemap_dominant {
            reasons.push(format!(
                "sitemap is {:.0}% PDF URLs",
                sitemap.pdf_ratio * 100.0
            ));
        }
        if feed_lacks_articles {
            reasons.push("RSS absent, empty or mostly PDF".to_string());
        }
        if !sitemap.used {
            reasons.push("no sitemap found".to_string());
        }
        if tecnavia {
            reasons.push("CMS vendor is Tecnavia".to_string());
            reasons.push("Tecnavia hosts replica e-editions".to_string());
        }
        if let Some(s) = signals.filter(|s| s.is_pdf_heavy()) {
            reasons.push(format!(
                "homepage has {} PDF links out of {} anchors",
                s.pdf_links.len(),
                s.anchors
            ));
        }

        let decisive = sitemap_dominant || tecnavia || pdf_heavy;
        let only = (decisive && feed_lacks_articles) || (tecnavia && (feed_lacks_articles || pdf_heavy));

        if only {
            evidence.note(format!("PDF-only: {}", reasons.join("; ")));
            TriState::Yes
        } else if auxiliary_observed {
            TriState::No
        } else {
            if !reasons.is_empty() {
                evidence.note(format!("PDF-only undetermined: {}", reasons.join("; ")));
            }
            TriState::ManualReview
        }
    } else if observed {
        TriState::No
    } else {
        TriState::ManualReview
    };

    Verdict::new(
        PdfVerdict {
            has_pdf: TriState::from_bool(has_pdf),
            pdf_only,
        },
        evidence,
    )
}
