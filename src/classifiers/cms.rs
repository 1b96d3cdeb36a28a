//! CMS platform and vendor fingerprinting.

use serde::{Deserialize, Serialize};

use super::signatures::{
    CMS_PLATFORM_SIGNATURES, CMS_VENDOR_SIGNATURES, SignatureMatch, first_match, implied_platform,
};
use crate::models::{Evidence, EvidenceSource, SitemapData, Verdict};

/// Platform and vendor labels; `None` means undetermined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmsLabels {
    pub platform: Option<String>,
    pub vendor: Option<String>,
}

pub fn detect_cms(homepage: Option<&str>, sitemap: &SitemapData) -> Verdict<CmsLabels> {
    let mut evidence = Evidence::new();
    let mut labels = CmsLabels::default();

    match homepage {
        Some(html) => {
            let lower = html.to_lowercase();
            if let Some(m) = first_match(CMS_PLATFORM_SIGNATURES, &lower) {
                record(&mut evidence, "platform", &m);
                labels.platform = Some(m.label.to_string());
            }
            if let Some(m) = first_match(CMS_VENDOR_SIGNATURES, &lower) {
                record(&mut evidence, "vendor", &m);
                labels.vendor = Some(m.label.to_string());
            }
        }
        None => {
            evidence.note("No homepage HTML available");
        }
    }

    if labels.vendor.as_deref() == Some("Lion's Light") {
        labels.platform = Some("ROAR".to_string());
        evidence.note("Lion's Light sites run on ROAR");
    }

    if labels.platform.is_none() && sitemap.urls.iter().any(|u| u.contains("wp-sitemap")) {
        labels.platform = Some("WordPress".to_string());
        evidence
            .source(EvidenceSource::Sitemap)
            .note("Sitemap contains wp-sitemap entries");
    }

    if labels.platform.is_none() {
        if let Some(implied) = labels.vendor.as_deref().and_then(implied_platform) {
            labels.platform = Some(implied.to_string());
        }
    }

    Verdict::new(labels, evidence)
}

fn record(evidence: &mut Evidence, kind: &str, m: &SignatureMatch) {
    evidence.source(EvidenceSource::Homepage).note(format!(
        "Detected {kind} indicators ({}): {}",
        m.label,
        m.tokens.join(", ")
    ));
}

/// Final label fixes that depend on the chain owner.
pub fn reconcile(mut labels: CmsLabels, chain: Option<&str>) -> CmsLabels {
    match (labels.vendor.as_deref(), labels.platform.is_none()) {
        (Some("BLOX"), true) => labels.platform = Some("BLOX Digital".to_string()),
        (Some("eType"), true) => labels.platform = Some("eType".to_string()),
        _ => {}
    }
    if chain == Some("Gannett") && labels.vendor.is_none() && labels.platform.is_none() {
        labels.vendor = Some("Gannett".to_string());
        labels.platform = Some("Presto".to_string());
    }
    labels
}
