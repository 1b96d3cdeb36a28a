//! Keyword lists shared by the probes and the rule classifiers.
//!
//! All entries are lower-case and matched as substrings of lower-cased text.

pub const PAYWALL_KEYWORDS: &[&str] = &[
    "subscribe",
    "paywall",
    "metered",
    "membership",
    "premium",
    "registration",
];

/// Subscription tokens looked for in sitemap URLs.
pub const SUBSCRIPTION_URL_TOKENS: &[&str] = &["subscribe", "membership", "registration", "premium"];

pub const NOTICE_KEYWORDS: &[&str] = &[
    "public notice",
    "legal notice",
    "legals",
    "notices",
    "classifieds",
    "obituaries",
];

/// Notice keywords as they appear in URL paths.
pub const NOTICE_URL_KEYWORDS: &[&str] = &[
    "public-notice",
    "publicnotice",
    "legal-notice",
    "legals",
    "notices",
    "classifieds",
    "obituaries",
];

/// E-edition phrases looked for in anchor text.
pub const PDF_TEXT_KEYWORDS: &[&str] = &[
    "e-edition",
    "eedition",
    "e edition",
    "epaper",
    "e-paper",
    "digital edition",
    "digital replica",
    "replica edition",
    "enewspaper",
    "e-newspaper",
    "printed paper",
];

/// E-edition fragments looked for in anchor hrefs.
pub const PDF_HREF_KEYWORDS: &[&str] = &[
    "eedition",
    "epaper",
    "e-edition",
    "enewspaper",
    "digitaledition",
    "replica",
    "print-edition",
];

/// URL fragments that mark a link as PDF-like even without a `.pdf` suffix.
pub const PDF_URL_CONTEXT: &[&str] = &[
    "eedition",
    "e-edition",
    "epaper",
    "e-paper",
    "enewspaper",
    "replica",
    "digitaledition",
    "print-edition",
    "issuu.com",
    "pagesuite",
    "newsmemory",
    "/pdf/",
];

/// Hosts of hosted flip-book readers.
pub const FLIPBOOK_HOSTS: &[&str] = &["issuu.com", "pagesuite", "pagesuite-professional.co.uk"];

/// Other embed URL fragments that point at a digital edition.
pub const PDF_EMBED_KEYWORDS: &[&str] = &[
    ".pdf",
    "eedition",
    "e-edition",
    "epaper",
    "replica",
    "newsmemory",
    "tecnavia",
];

/// Href fragments of article pages.
pub const ARTICLE_HREF_KEYWORDS: &[&str] = &[
    "/article",
    "/story",
    "/news/",
    "/local/",
    "/sports/",
    "/opinion/",
    "/obituaries/",
    "/business/",
];

/// Class-name fragments used by article teasers.
pub const ARTICLE_CLASS_TOKENS: &[&str] = &[
    "article",
    "story",
    "headline",
    "entry-title",
    "post-title",
    "card-headline",
    "tnt-asset",
];

pub const RESPONSIVE_FRAMEWORKS: &[&str] = &["bootstrap", "tailwind", "foundation"];

/// Tokens from `list` contained in `haystack`, in list order.
pub fn matching<'a>(haystack: &str, list: &[&'a str]) -> Vec<&'a str> {
    list.iter().copied().filter(|k| haystack.contains(k)).collect()
}

pub fn contains_any(haystack: &str, list: &[&str]) -> bool {
    list.iter().any(|k| haystack.contains(k))
}
