//! Third-party tracker detection.
//!
//! Each vendor signature lists tokens per channel. A hit in a script `src`,
//! an `img src` (tracking pixels) or a `<noscript>` fallback is strong
//! evidence; a hit only in inline script code is weaker, since inline code
//! often just mentions a vendor.

use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::models::{
    Confidence, Evidence, EvidenceSource, PrivacyFlags, PrivacyReport, TrackerCategory,
    TrackerMatch, Verdict,
};
use crate::models::TrackerCategory::{Ads, Analytics, Consent, Pixel, SessionReplay, TagManager};
use crate::utils::truncate_for_log;

/// Evidence strings kept per vendor.
pub const MAX_EVIDENCE: usize = 3;

static SCRIPTS: Lazy<Selector> = Lazy::new(|| Selector::parse("script").expect("valid selector"));
static IMAGES: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").expect("valid selector"));
static NOSCRIPT: Lazy<Selector> = Lazy::new(|| Selector::parse("noscript").expect("valid selector"));

#[derive(Debug, Clone, Copy)]
pub struct TrackerSignature {
    pub name: &'static str,
    pub category: TrackerCategory,
    pub script_src: &'static [&'static str],
    pub inline: &'static [&'static str],
    pub img_src: &'static [&'static str],
}

const fn tracker(
    name: &'static str,
    category: TrackerCategory,
    script_src: &'static [&'static str],
    inline: &'static [&'static str],
    img_src: &'static [&'static str],
) -> TrackerSignature {
    TrackerSignature {
        name,
        category,
        script_src,
        inline,
        img_src,
    }
}

pub const TRACKER_SIGNATURES: &[TrackerSignature] = &[
    tracker(
        "Google Analytics",
        Analytics,
        &["google-analytics.com/analytics.js", "google-analytics.com/ga.js", "googletagmanager.com/gtag/js"],
        &["gtag(", "ga('create'", "googleanalyticsobject"],
        &["google-analytics.com/collect"],
    ),
    tracker(
        "Google Tag Manager",
        TagManager,
        &["googletagmanager.com/gtm.js", "googletagmanager.com/ns.html"],
        &["gtm.start", "googletagmanager.com/gtm.js"],
        &[],
    ),
    tracker(
        "Adobe Analytics",
        Analytics,
        &["omtrdc.net", "2o7.net", "assets.adobedtm.com"],
        &["s_code", "adobedtm"],
        &["omtrdc.net", "2o7.net"],
    ),
    tracker(
        "Chartbeat",
        Analytics,
        &["static.chartbeat.com"],
        &["_sf_async_config"],
        &["ping.chartbeat.net"],
    ),
    tracker(
        "Comscore",
        Analytics,
        &["scorecardresearch.com"],
        &["_comscore"],
        &["sb.scorecardresearch.com"],
    ),
    tracker(
        "Parse.ly",
        Analytics,
        &["parsely.com", "parse.ly"],
        &["parsely"],
        &["pixel.parsely.com"],
    ),
    tracker(
        "Quantcast Measure",
        Analytics,
        &["quantserve.com"],
        &["_qevents"],
        &["pixel.quantserve.com"],
    ),
    tracker(
        "Meta Pixel",
        Pixel,
        &["connect.facebook.net"],
        &["fbq("],
        &["facebook.com/tr?", "facebook.com/tr/"],
    ),
    tracker(
        "TikTok Pixel",
        Pixel,
        &["analytics.tiktok.com"],
        &["ttq.load"],
        &[],
    ),
    tracker(
        "LinkedIn Insight",
        Pixel,
        &["snap.licdn.com"],
        &["_linkedin_partner_id"],
        &["px.ads.linkedin.com"],
    ),
    tracker(
        "X (Twitter) Pixel",
        Pixel,
        &["static.ads-twitter.com"],
        &["twq("],
        &["t.co/i/adsct"],
    ),
    tracker(
        "Hotjar",
        SessionReplay,
        &["static.hotjar.com"],
        &["_hjsettings"],
        &[],
    ),
    tracker(
        "Microsoft Clarity",
        SessionReplay,
        &["clarity.ms"],
        &["clarity.ms/tag"],
        &[],
    ),
    tracker(
        "FullStory",
        SessionReplay,
        &["fullstory.com"],
        &["_fs_org"],
        &[],
    ),
    tracker(
        "Google Ad Manager",
        Ads,
        &["securepubads.g.doubleclick.net", "googletagservices.com/tag/js/gpt.js"],
        &["googletag.defineslot", "googletag.pubads"],
        &["doubleclick.net"],
    ),
    tracker(
        "Google AdSense",
        Ads,
        &["pagead2.googlesyndication.com"],
        &["adsbygoogle"],
        &[],
    ),
    tracker(
        "Amazon Publisher Services",
        Ads,
        &["c.amazon-adsystem.com"],
        &["apstag.init"],
        &["amazon-adsystem.com"],
    ),
    tracker(
        "Taboola",
        Ads,
        &["cdn.taboola.com"],
        &["_taboola"],
        &["trc.taboola.com"],
    ),
    tracker(
        "Outbrain",
        Ads,
        &["widgets.outbrain.com"],
        &["obr_extern", "outbrain"],
        &[],
    ),
    tracker("Prebid", Ads, &["prebid"], &["pbjs.que"], &[]),
    tracker(
        "OneTrust",
        Consent,
        &["cdn.cookielaw.org", "onetrust.com"],
        &["optanonwrapper", "onetrust"],
        &[],
    ),
    tracker(
        "Cookiebot",
        Consent,
        &["consent.cookiebot.com"],
        &["cookiebot"],
        &[],
    ),
    tracker(
        "Quantcast Choice",
        Consent,
        &["quantcast.mgr.consensu.org", "cmp.quantcast.com"],
        &["quantcast choice"],
        &[],
    ),
    tracker("Didomi", Consent, &["sdk.privacy-center.org"], &["didomi"], &[]),
];

/// Lower-cased markup grouped by channel.
#[derive(Debug, Default)]
struct Channels {
    script_srcs: Vec<String>,
    inline: Vec<String>,
    img_srcs: Vec<String>,
    noscript: Vec<String>,
}

impl Channels {
    fn collect(html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut channels = Self::default();

        for script in document.select(&SCRIPTS) {
            match script.value().attr("src") {
                Some(src) => channels.script_srcs.push(src.trim().to_lowercase()),
                None => {
                    let body = script.text().collect::<String>();
                    if !body.trim().is_empty() {
                        channels.inline.push(body.to_lowercase());
                    }
                }
            }
        }
        for img in document.select(&IMAGES) {
            if let Some(src) = img.value().attr("src") {
                channels.img_srcs.push(src.trim().to_lowercase());
            }
        }
        for fallback in document.select(&NOSCRIPT) {
            // Depending on parser scripting mode the body is either raw text
            // or parsed elements; keep both forms.
            let text = fallback.text().collect::<String>();
            let markup = fallback.inner_html();
            channels
                .noscript
                .push(format!("{text}\n{markup}").to_lowercase());
        }
        channels
    }

    fn scan(&self, sig: &TrackerSignature) -> Option<TrackerMatch> {
        let mut evidence: Vec<String> = Vec::new();
        let mut strong = false;

        for src in &self.script_srcs {
            if sig.script_src.iter().any(|t| src.contains(t)) {
                strong = true;
                evidence.push(format!("script src: {}", truncate_for_log(src, 120)));
            }
        }
        for src in &self.img_srcs {
            if sig.img_src.iter().any(|t| src.contains(t)) {
                strong = true;
                evidence.push(format!("img src: {}", truncate_for_log(src, 120)));
            }
        }
        for body in &self.noscript {
            let tokens = sig.script_src.iter().chain(sig.img_src.iter());
            if let Some(token) = tokens.into_iter().find(|t| body.contains(*t)) {
                strong = true;
                evidence.push(format!("noscript: {token}"));
            }
        }
        for body in &self.inline {
            if let Some(token) = sig.inline.iter().find(|t| body.contains(*t)) {
                evidence.push(format!("inline script: {token}"));
            }
        }

        if evidence.is_empty() {
            return None;
        }
        let evidence: Vec<String> = evidence.into_iter().unique().take(MAX_EVIDENCE).collect();
        Some(TrackerMatch {
            name: sig.name.to_string(),
            category: sig.category,
            confidence: if strong {
                Confidence::High
            } else {
                Confidence::Medium
            },
            evidence,
        })
    }
}

/// Detect trackers on the homepage and score them.
pub fn detect_privacy(homepage: Option<&str>) -> Verdict<PrivacyReport> {
    let mut evidence = Evidence::new();
    let Some(html) = homepage else {
        evidence.note("No homepage HTML available for tracker scan");
        return Verdict::new(PrivacyReport::default(), evidence);
    };

    let channels = Channels::collect(html);
    let vendors: Vec<TrackerMatch> = TRACKER_SIGNATURES
        .iter()
        .filter_map(|sig| channels.scan(sig))
        .collect();
    let report = build_report(vendors);

    if !report.vendors.is_empty() {
        evidence
            .source(EvidenceSource::Homepage)
            .note(format!("Trackers: {}", report.summary));
    }
    Verdict::new(report, evidence)
}

/// Flags, score and summary for a set of detected vendors.
pub fn build_report(vendors: Vec<TrackerMatch>) -> PrivacyReport {
    let has = |category: TrackerCategory| vendors.iter().any(|v| v.category == category);

    let flags = PrivacyFlags {
        tracking: vendors.iter().any(|v| v.category != Consent),
        consent: has(Consent),
        session_replay: has(SessionReplay),
        pixels: has(Pixel),
        tag_manager: has(TagManager),
        analytics: has(Analytics),
        ad_network: has(Ads),
    };

    let score: u32 = TrackerCategory::ORDER
        .iter()
        .filter(|c| has(**c))
        .map(|c| c.weight())
        .sum();

    let summary = if vendors.is_empty() {
        "No trackers detected".to_string()
    } else {
        TrackerCategory::ORDER
            .iter()
            .filter_map(|category| {
                let names: Vec<&str> = vendors
                    .iter()
                    .filter(|v| v.category == *category)
                    .map(|v| v.name.as_str())
                    .collect();
                (!names.is_empty()).then(|| format!("{}: {}", category.label(), names.join(", ")))
            })
            .join("; ")
    };

    PrivacyReport {
        flags,
        score: score.min(100) as u8,
        summary,
        vendors,
    }
}
