//! JSON serialization of audit results.
//!
//! Each audit goes to `{json_output_dir}/{date}/{host}_{HHMMSS}.json`, with
//! the date and time taken from the audit's UTC timestamp. A second audit of
//! the same host within the same second gets `_2`, `_3`, ... appended.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{error, info, instrument, warn};

use crate::error::Result;
use crate::models::AuditResult;
use crate::utils::host_slug;

/// Path an audit is written to under `json_output_dir`.
pub fn audit_path(result: &AuditResult, json_output_dir: &Path) -> PathBuf {
    let date = result.audited_at.format("%Y-%m-%d").to_string();
    let time = result.audited_at.format("%H%M%S");
    let host = if result.url.is_empty() {
        "unknown".to_string()
    } else {
        host_slug(&result.url)
    };
    json_output_dir.join(date).join(format!("{host}_{time}.json"))
}

/// Write one [`AuditResult`] as pretty JSON.
///
/// Creates the dated subdirectory if needed and never overwrites an
/// existing file: a taken name gets a numeric suffix instead.
///
/// # Arguments
///
/// * `result` - The audit to serialize
/// * `json_output_dir` - Root directory for the dated output folders
///
/// # Returns
///
/// The path the JSON was written to.
///
/// # Examples
///
/// ```ignore
/// let path = write_audit(&result, "./audits").await?;
/// // ./audits/2025-05-06/example-gazette_com_141503.json
/// ```
#[instrument(level = "info", skip_all, fields(url = %result.url))]
pub async fn write_audit(result: &AuditResult, json_output_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(result)?;
    let preferred = audit_path(result, json_output_dir.as_ref());

    if let Some(dir) = preferred.parent() {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    let path = unused_path(preferred).await?;
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote audit JSON");
    Ok(path)
}

/// `path` itself if free, else the first free `{stem}_{n}.json` with n >= 2.
async fn unused_path(path: PathBuf) -> Result<PathBuf> {
    if !fs::try_exists(&path).await? {
        return Ok(path);
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut n = 2u32;
    loop {
        let candidate = path.with_file_name(format!("{stem}_{n}.json"));
        if !fs::try_exists(&candidate).await? {
            warn!(path = %candidate.display(), "Audit file name taken; using suffix");
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Pretty JSON array of results, for stdout.
pub fn render_results(results: &[AuditResult]) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn result(url: &str) -> AuditResult {
        let mut r = AuditResult::unaudited(url, "test");
        r.audited_at = Utc.with_ymd_and_hms(2025, 5, 6, 14, 15, 3).unwrap();
        r
    }

    #[test]
    fn test_audit_path() {
        let path = audit_path(&result("https://www.example-gazette.com/"), Path::new("/out"));
        assert_eq!(path, PathBuf::from("/out/2025-05-06/example-gazette_com_141503.json"));

        let blank = audit_path(&result(""), Path::new("/out"));
        assert_eq!(blank, PathBuf::from("/out/2025-05-06/unknown_141503.json"));
    }

    #[tokio::test]
    async fn test_write_audit_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let original = result("http://paper.com");
        let path = write_audit(&original, dir.path()).await.unwrap();

        assert!(path.starts_with(dir.path().join("2025-05-06")));
        let text = std::fs::read_to_string(&path).unwrap();
        let back: AuditResult = serde_json::from_str(&text).unwrap();
        assert_eq!(back, original);
        assert!(text.contains("\"has_pdf\": \"Manual Review\""));
    }

    #[tokio::test]
    async fn test_same_host_same_second_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = result("https://paper.com");
        first.notes.push("first".into());
        let mut second = result("https://paper.com");
        second.notes.push("second".into());

        let a = write_audit(&first, dir.path()).await.unwrap();
        let b = write_audit(&second, dir.path()).await.unwrap();
        let c = write_audit(&second, dir.path()).await.unwrap();

        assert_eq!(a.file_name().unwrap(), "paper_com_141503.json");
        assert_eq!(b.file_name().unwrap(), "paper_com_141503_2.json");
        assert_eq!(c.file_name().unwrap(), "paper_com_141503_3.json");
        assert!(std::fs::read_to_string(&a).unwrap().contains("\"first\""));
        assert!(std::fs::read_to_string(&b).unwrap().contains("\"second\""));
    }

    #[test]
    fn test_render_results_is_array() {
        let text = render_results(&[result("a.com"), result("b.com")]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
    }
}
