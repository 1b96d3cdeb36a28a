//! Corporate chain ownership.

use super::signatures::{CHAIN_SIGNATURES, first_match};
use crate::models::{Evidence, EvidenceSource, Verdict};

/// Owner reported when no chain signature matches.
pub const INDEPENDENT: &str = "Independent";

pub fn detect_chain(homepage: Option<&str>) -> Verdict<String> {
    let mut evidence = Evidence::new();
    let Some(html) = homepage else {
        evidence.note("No homepage HTML available");
        return Verdict::new(INDEPENDENT.to_string(), evidence);
    };

    match first_match(CHAIN_SIGNATURES, &html.to_lowercase()) {
        Some(m) => {
            evidence.source(EvidenceSource::Homepage).note(format!(
                "Detected chain indicators ({}): {}",
                m.label,
                m.tokens.join(", ")
            ));
            Verdict::new(m.label.to_string(), evidence)
        }
        None => Verdict::new(INDEPENDENT.to_string(), evidence),
    }
}

/// The chain name, or `None` for independents.
pub fn detected_chain(owner: &str) -> Option<&str> {
    (owner != INDEPENDENT).then_some(owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_chain() {
        let v = detect_chain(Some("<footer>A LEE ENTERPRISES newspaper</footer>"));
        assert_eq!(v.value, "Lee");
        assert!(v.evidence.has_source(EvidenceSource::Homepage));
        assert_eq!(
            v.evidence.notes(),
            &["Detected chain indicators (Lee): lee enterprises".to_string()]
        );
        assert_eq!(detected_chain(&v.value), Some("Lee"));
    }

    #[test]
    fn test_independent() {
        let v = detect_chain(Some("<p>Family owned since 1890</p>"));
        assert_eq!(v.value, INDEPENDENT);
        assert!(v.evidence.sources().is_empty());
        assert_eq!(detected_chain(&v.value), None);

        let none = detect_chain(None);
        assert_eq!(none.value, INDEPENDENT);
        assert_eq!(none.evidence.notes(), &["No homepage HTML available".to_string()]);
    }

    #[test]
    fn test_idempotent() {
        let html = "Part of the USA TODAY Network";
        assert_eq!(detect_chain(Some(html)), detect_chain(Some(html)));
    }
}
