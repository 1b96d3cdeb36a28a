//! Command-line interface definitions for the audit binary.
//!
//! Flags override values from the optional YAML configuration file. Most of
//! them can also come from environment variables.

use std::path::PathBuf;

use clap::Parser;
use paper_audit::config::AuditConfig;

/// Audit newspaper websites for e-editions, paywalls, public notices,
/// CMS fingerprints and trackers.
///
/// # Examples
///
/// ```sh
/// # Print results for two sites as JSON
/// paper_audit example-gazette.com https://www.example-times.com
///
/// # Audit a list, four at a time, writing one JSON file per site
/// paper_audit --input papers.txt -j ./audits --concurrency 4
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Homepage URLs to audit; a missing scheme defaults to http://
    pub urls: Vec<String>,

    /// File with one URL per line (blank lines and `#` comments ignored)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Optional path to config.yaml file
    #[arg(short, long, env = "PAPER_AUDIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write one JSON file per audit here instead of printing to stdout
    #[arg(short, long, env = "PAPER_AUDIT_JSON_DIR")]
    pub json_output_dir: Option<String>,

    /// Fail an audit whose homepage fetch ends in a timeout
    #[arg(long)]
    pub strict: bool,

    /// Number of audits to run at once
    #[arg(long, env = "PAPER_AUDIT_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Allow headless browser rendering for sites that block plain clients
    #[arg(long)]
    pub headless: bool,
}

impl Cli {
    /// Apply flag values on top of a loaded configuration.
    ///
    /// Flags only ever switch things on or replace a value; an absent flag
    /// leaves the file's setting alone.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration loaded from `--config`, or the defaults
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let cli = Cli::parse_from(["paper_audit", "--strict", "--concurrency", "8", "paper.com"]);
    /// let mut config = AuditConfig::default();
    /// cli.apply_overrides(&mut config);
    /// assert!(config.strict_timeouts);
    /// assert_eq!(config.concurrency, 8);
    /// ```
    pub fn apply_overrides(&self, config: &mut AuditConfig) {
        if self.strict {
            config.strict_timeouts = true;
        }
        if let Some(n) = self.concurrency {
            config.concurrency = n;
        }
        if self.headless {
            config.headless.enabled = true;
        }
    }
}
