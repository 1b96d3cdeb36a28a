//! Mobile responsiveness.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use super::keywords::{RESPONSIVE_FRAMEWORKS, matching};
use crate::models::{Evidence, EvidenceSource, TriState, Verdict};

static META_NAMED: Lazy<Selector> = Lazy::new(|| Selector::parse("meta[name]").expect("valid selector"));
static MAX_WIDTH_QUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)@media[^{]*max-width").expect("valid regex"));

pub fn detect_responsive(homepage: Option<&str>) -> Verdict<TriState> {
    let mut evidence = Evidence::new();
    let Some(html) = homepage else {
        evidence.note("No homepage HTML available");
        return Verdict::new(TriState::ManualReview, evidence);
    };
    evidence.source(EvidenceSource::Homepage);

    let document = Html::parse_document(html);
    let has_viewport = document.select(&META_NAMED).any(|m| {
        m.value()
            .attr("name")
            .is_some_and(|n| n.trim().eq_ignore_ascii_case("viewport"))
    });
    if has_viewport {
        evidence.note("Viewport meta tag present");
        return Verdict::new(TriState::Yes, evidence);
    }

    if MAX_WIDTH_QUERY.is_match(html) {
        evidence.note("CSS media queries found");
        return Verdict::new(TriState::Yes, evidence);
    }

    let frameworks = matching(&html.to_lowercase(), RESPONSIVE_FRAMEWORKS);
    if !frameworks.is_empty() {
        evidence.note(format!("Responsive framework detected: {}", frameworks.join(", ")));
        return Verdict::new(TriState::Yes, evidence);
    }

    evidence.note("No responsive indicators");
    Verdict::new(TriState::No, evidence)
}
