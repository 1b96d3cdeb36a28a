//! Ordered signature tables for chain ownership and CMS fingerprinting.
//!
//! Tables are slices, not maps: the first label with any matching token
//! wins, so more specific labels must come first.

/// A label and the lower-case substrings that identify it.
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub label: &'static str,
    pub tokens: &'static [&'static str],
}

/// The winning label of a table scan and the tokens that matched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMatch {
    pub label: &'static str,
    pub tokens: Vec<&'static str>,
}

const fn sig(label: &'static str, tokens: &'static [&'static str]) -> Signature {
    Signature { label, tokens }
}

pub const CHAIN_SIGNATURES: &[Signature] = &[
    sig("Gannett", &["part of the usa today network", "usa today", "gannett"]),
    sig("Hearst", &["hearst newspapers", "© hearst", "hearst media"]),
    sig("Lee", &["lee enterprises", "lee enterprises inc"]),
    sig("CNHI", &["cnhi llc", "cnhi media"]),
    sig("McClatchy", &["mcclatchy"]),
    sig("Ogden", &["ogden newspapers", "ogdennews"]),
    sig("Adams Publishing", &["adams publishing group", "apgnews"]),
];

pub const CMS_PLATFORM_SIGNATURES: &[Signature] = &[
    sig("BLOX Digital", &["tncms", "bloximages", "townnews", "bloxcms"]),
    sig(
        "WordPress",
        &["wp-content", "wp-includes", "wordpress", "wp-json", "wp-sitemap"],
    ),
    sig("Drupal", &["drupal.settings", "drupal-settings-json", "drupal"]),
    sig(
        "Arc XP",
        &["arc-cdn", "arcpublishing", "thearc", "arc publishing", "washpost"],
    ),
    sig("Flatpage/Flatpack", &["flatpage", "flatpack", "wehaa"]),
    sig(
        "Presto",
        &["presto-content", "gannett-cdn", "gdn-presto", "gannettdigital"],
    ),
    sig("eType", &["etype.services", "etype1", "etype services"]),
    sig("Brightspot", &["brightspot", "bybrightspot"]),
    sig("NewsPack", &["newspack", "automattic", "wpengine"]),
];

pub const CMS_VENDOR_SIGNATURES: &[Signature] = &[
    sig("Creative Circle", &["creativecircle", "circle-media", "circleid"]),
    sig(
        "ePublishing",
        &["epublishing", "epubcorp", "epublishing.com", "cld.bz"],
    ),
    sig("eType", &["etype.services", "etype services", "etype1"]),
    sig("Lion's Light", &["lionslight", "lion's light", "lions-light"]),
    sig("Surf New Media", &["surfnewmedia", "snmportal", "surf new media"]),
    sig("Websites For Newspapers", &["websitesfornewspapers", "wfnpro", "wfnp"]),
    sig("BLOX", &["tncms", "bloximages", "townnews", "bloxcms"]),
    sig(
        "Gannett",
        &["gannett", "gannett-cdn", "gannettdigital", "presto-content"],
    ),
    sig("NewsPack", &["newspack", "automattic", "wpengine"]),
    sig("StuffSites", &["stuffsites", "stuff sites"]),
    sig("PubGenAI", &["pubgenai", "pubgen.ai", "pubgen"]),
    sig(
        "Arc Publishing",
        &["arc-cdn", "arcpublishing", "thearc", "arc publishing"],
    ),
    sig("Brightspot", &["brightspot", "bybrightspot"]),
    sig(
        "Our Hometown Web Publishing",
        &["our-hometown", "ourhometown", "our hometown", "oht-"],
    ),
    // Replica e-edition host; listed last so a real CMS vendor wins.
    sig("Tecnavia", &["tecnavia", "newsmemory"]),
];

/// Platform implied by a vendor when no platform signature matched.
pub const IMPLIED_PLATFORMS: &[(&str, &str)] = &[
    ("Creative Circle", "Creative Circle"),
    ("BLOX", "BLOX Digital"),
    ("Gannett", "Presto"),
    ("eType", "eType"),
    ("Arc Publishing", "Arc XP"),
    ("Brightspot", "Brightspot"),
    ("NewsPack", "WordPress"),
    ("Our Hometown Web Publishing", "WordPress"),
    ("StuffSites", "StuffSites"),
    ("PubGenAI", "PubGenAI"),
    ("ePublishing", "ePublishing"),
    ("Surf New Media", "Surf New Media"),
    ("Websites For Newspapers", "Websites For Newspapers"),
];

/// First signature in `table` with a token contained in `haystack`.
///
/// `haystack` must already be lower-cased.
pub fn first_match(table: &[Signature], haystack: &str) -> Option<SignatureMatch> {
    table.iter().find_map(|s| {
        let tokens: Vec<&'static str> = s
            .tokens
            .iter()
            .copied()
            .filter(|t| haystack.contains(t))
            .collect();
        (!tokens.is_empty()).then_some(SignatureMatch {
            label: s.label,
            tokens,
        })
    })
}

pub fn implied_platform(vendor: &str) -> Option<&'static str> {
    IMPLIED_PLATFORMS
        .iter()
        .find(|(v, _)| *v == vendor)
        .map(|(_, p)| *p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_respects_order() {
        // Both Gannett tokens and a Hearst token; Gannett is listed first.
        let html = "© hearst ... part of the usa today network";
        let m = first_match(CHAIN_SIGNATURES, html).unwrap();
        assert_eq!(m.label, "Gannett");
        assert_eq!(m.tokens, vec!["part of the usa today network", "usa today"]);
    }

    #[test]
    fn test_no_match() {
        assert!(first_match(CMS_PLATFORM_SIGNATURES, "plain html").is_none());
    }

    #[test]
    fn test_tokens_are_lower_case() {
        for table in [CHAIN_SIGNATURES, CMS_PLATFORM_SIGNATURES, CMS_VENDOR_SIGNATURES] {
            for s in table {
                for t in s.tokens {
                    assert_eq!(*t, t.to_lowercase(), "{}", s.label);
                }
            }
        }
    }

    #[test]
    fn test_implied_platform() {
        assert_eq!(implied_platform("BLOX"), Some("BLOX Digital"));
        assert_eq!(implied_platform("NewsPack"), Some("WordPress"));
        assert_eq!(implied_platform("Tecnavia"), None);
    }
}
