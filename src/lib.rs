//! # Paper Audit
//!
//! Passive audits of newspaper websites. One audit fetches a homepage, probes
//! the site's sitemaps and RSS/Atom feed, and runs a battery of heuristic
//! classifiers over what came back:
//!
//! - PDF e-edition present, and whether the site is PDF-only
//! - paywall and free public notices
//! - mobile responsiveness
//! - corporate chain owner, CMS platform and vendor
//! - third-party trackers, with a privacy score
//! - social profile links
//!
//! Verdicts are tri-state (`Yes` / `No` / `Manual Review`) and carry the
//! evidence sources and notes that produced them.
//!
//! ## Usage
//!
//! ```no_run
//! use paper_audit::{AuditConfig, Auditor};
//!
//! # async fn run() -> paper_audit::Result<()> {
//! let auditor = Auditor::new(AuditConfig::default())?;
//! let result = auditor.audit("example-gazette.com").await?;
//! println!("{} -> PDF-only: {}", result.url, result.pdf_only);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetch** ([`fetch`]): header rotation, retries, HTTPS/AMP/Brotli and
//!    headless escalation
//! 2. **Probe** ([`probes`]): sitemaps and feeds on the resolved origin
//! 3. **Classify** ([`classifiers`]): pure functions over the collected inputs
//! 4. **Assemble** ([`audit`]): merged evidence, snapshot, final record

pub mod audit;
pub mod classifiers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod outputs;
pub mod probes;
pub mod social;
pub mod utils;

pub use audit::{Auditor, assemble, sanitize_snapshot};
pub use config::AuditConfig;
pub use error::{AuditError, Result};
pub use fetch::transport::{HttpTransport, Transport};
pub use fetch::{FetchOptions, Fetcher};
pub use models::{AuditResult, EvidenceSource, FetchResult, FetchStrategy, TriState};
pub use social::{extract_social_links, normalize_social_links};
