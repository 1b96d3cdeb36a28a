//! Audit configuration.
//!
//! Every field has a default, so an empty or partial YAML file is valid.
//!
//! ```yaml
//! fetch:
//!   timeout_secs: 6
//!   retries: 2
//!   backoff_ms: 1000
//! politeness:
//!   pause_ms: 500
//! snapshot:
//!   max_chars: 500000
//! strict_timeouts: false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{AuditError, Result};
use crate::fetch::headers::HeaderVariant;

/// Settings for the homepage fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub retries: u32,
    /// Base backoff; attempt `n` waits `backoff * (n + 1)`.
    pub backoff_ms: u64,
    /// Use only this header variant instead of rotating.
    pub header_variant: Option<HeaderVariant>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 6,
            retries: 2,
            backoff_ms: 1000,
            header_variant: None,
        }
    }
}

/// Settings for the sitemap and feed probes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub sitemap_timeout_secs: u64,
    pub feed_timeout_secs: u64,
    pub retries: u32,
    pub backoff_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            sitemap_timeout_secs: 12,
            feed_timeout_secs: 6,
            retries: 0,
            backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolitenessConfig {
    /// Minimum gap between two requests issued by one fetcher.
    pub min_gap_ms: u64,
    /// Courtesy pause after the homepage fetch and after the sitemap probe.
    pub pause_ms: u64,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            min_gap_ms: 0,
            pause_ms: 500,
        }
    }
}

/// Smallest snapshot cap that leaves room around the truncation marker.
pub const MIN_SNAPSHOT_CHARS: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub max_chars: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { max_chars: 500_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub chrome_path: Option<PathBuf>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: 20,
            chrome_path: None,
        }
    }
}

/// Top-level configuration for an [`Auditor`](crate::audit::Auditor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub fetch: FetchConfig,
    pub probe: ProbeConfig,
    pub politeness: PolitenessConfig,
    pub snapshot: SnapshotConfig,
    pub headless: HeadlessConfig,
    /// Raise a terminal homepage timeout instead of recording it.
    pub strict_timeouts: bool,
    /// Audits run at once by batch callers.
    pub concurrency: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            probe: ProbeConfig::default(),
            politeness: PolitenessConfig::default(),
            snapshot: SnapshotConfig::default(),
            headless: HeadlessConfig::default(),
            strict_timeouts: false,
            concurrency: 4,
        }
    }
}

impl AuditConfig {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: AuditConfig = if text.trim().is_empty() {
            AuditConfig::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)?;
        info!("Loaded audit configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch.timeout_secs == 0 {
            return Err(AuditError::config("fetch.timeout_secs must be positive"));
        }
        if self.concurrency == 0 {
            return Err(AuditError::config("concurrency must be at least 1"));
        }
        if self.snapshot.max_chars < MIN_SNAPSHOT_CHARS {
            return Err(AuditError::config(format!(
                "snapshot.max_chars must be at least {MIN_SNAPSHOT_CHARS}"
            )));
        }
        Ok(())
    }
}
