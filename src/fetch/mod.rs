//! Multi-strategy HTTP retrieval.
//!
//! [`Fetcher::fetch`] is the retry loop: header-variant rotation, linear
//! backoff, the HTTP→HTTPS retry on 403, Brotli gating and charset decoding.
//! [`Fetcher::fetch_homepage`] wraps it in the escalation chain described in
//! [`escalation`].
//!
//! Ordinary failures come back inside a [`FetchResult`]; the only error is a
//! terminal timeout when [`FetchOptions::raise_on_timeout`] is set.

pub mod decode;
pub mod escalation;
pub mod headers;
pub mod render;
pub mod throttle;
pub mod transport;

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::config::{AuditConfig, FetchConfig};
use crate::error::{AuditError, Result};
use crate::models::{FailureKind, FetchResult};
use headers::HeaderVariant;
use render::HeadlessRenderer;
use throttle::Throttle;
use transport::{BROTLI_SUPPORTED, HttpTransport, RawResponse, RequestSpec, Transport, TransportError};

/// Error recorded when a Brotli body cannot be decoded.
pub const BROTLI_UNAVAILABLE: &str = "Brotli-encoded response but Brotli decoding is unavailable";

/// Knobs for one [`Fetcher::fetch`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub timeout: Duration,
    /// Extra attempts per header variant.
    pub retries: u32,
    /// Attempt `n` (0-based) is followed by a wait of `backoff * (n + 1)`.
    pub backoff: Duration,
    /// Use only this variant instead of rotating through all of them.
    pub header_variant: Option<HeaderVariant>,
    pub allow_brotli: bool,
    /// Follow 3xx responses; when off, the redirect is the result.
    pub follow_redirects: bool,
    /// Return [`AuditError::Timeout`] when the last outcome is a timeout.
    pub raise_on_timeout: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

impl FetchOptions {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            retries: config.retries,
            backoff: Duration::from_millis(config.backoff_ms),
            header_variant: config.header_variant,
            allow_brotli: false,
            follow_redirects: true,
            raise_on_timeout: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_variant(mut self, variant: HeaderVariant) -> Self {
        self.header_variant = Some(variant);
        self
    }

    pub fn allow_brotli(mut self, allow: bool) -> Self {
        self.allow_brotli = allow;
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn raise_on_timeout(mut self, raise: bool) -> Self {
        self.raise_on_timeout = raise;
        self
    }
}

/// HTTP fetcher for one audit.
///
/// Owns its politeness [`Throttle`]; the transport itself may be shared.
#[derive(Debug)]
pub struct Fetcher<T = HttpTransport> {
    transport: T,
    throttle: Throttle,
    renderer: Option<HeadlessRenderer>,
}

impl Fetcher<HttpTransport> {
    /// Fetcher over a shared reqwest transport, configured from `config`.
    pub fn from_config(transport: HttpTransport, config: &AuditConfig) -> Self {
        Self::new(transport, Throttle::from_config(&config.politeness))
            .with_renderer(HeadlessRenderer::from_config(&config.headless))
    }
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, throttle: Throttle) -> Self {
        Self {
            transport,
            throttle,
            renderer: None,
        }
    }

    pub fn with_renderer(mut self, renderer: Option<HeadlessRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn renderer(&self) -> Option<&HeadlessRenderer> {
        self.renderer.as_ref()
    }

    /// Fetch `url`, rotating header variants and retrying with backoff.
    ///
    /// - 200: body decoded to text (or the Brotli-unavailable error).
    /// - 403 over `http://`: the same attempt is repeated over `https://`
    ///   and the HTTPS URL is kept from then on.
    /// - 403/429 and transport failures: retried, then the next variant.
    /// - any other status: returned immediately.
    #[instrument(level = "info", skip(self, options), fields(retries = options.retries))]
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchResult> {
        let t0 = Instant::now();
        let mut target = url.to_string();
        let mut last: Option<FetchResult> = None;
        let mut last_timed_out = false;

        for variant in HeaderVariant::rotation(options.header_variant) {
            for attempt in 0..=options.retries {
                let mut outcome = self.send(&target, variant, options).await;

                if matches!(&outcome, Ok(resp) if resp.status == 403) {
                    if let Some(https) = upgrade_to_https(&target) {
                        debug!(from = %target, to = %https, "403 over HTTP; retrying over HTTPS");
                        target = https;
                        outcome = self.send(&target, variant, options).await;
                    }
                }

                match outcome {
                    Ok(resp) if resp.status == 200 => {
                        let result = self.accept(resp, options);
                        info!(
                            variant = variant.name(),
                            attempt,
                            elapsed_ms = t0.elapsed().as_millis() as u64,
                            ok = result.html.is_some(),
                            "Fetch completed"
                        );
                        return Ok(result);
                    }
                    Ok(resp) if matches!(resp.status, 403 | 429) => {
                        warn!(status = resp.status, variant = variant.name(), attempt, "Blocked; backing off");
                        last_timed_out = false;
                        last = Some(FetchResult::status_only(resp.status, resp.final_url));
                    }
                    Ok(resp) => {
                        debug!(status = resp.status, "Terminal status");
                        return Ok(FetchResult::status_only(resp.status, resp.final_url));
                    }
                    Err(err) => {
                        warn!(error = %err, kind = ?err.kind, variant = variant.name(), attempt, "Request failed");
                        last_timed_out = err.kind == FailureKind::Timeout;
                        last = Some(FetchResult::failed(None, err.message, err.kind, target.clone()));
                    }
                }

                if attempt < options.retries {
                    let delay = options.backoff * (attempt + 1);
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
            debug!(variant = variant.name(), "Header variant exhausted");
        }

        let result = last.unwrap_or_else(|| {
            FetchResult::failed(None, "no request was attempted", FailureKind::Other, target.clone())
        });

        if last_timed_out && options.raise_on_timeout {
            let detail = result.error.clone().unwrap_or_else(|| "timed out".to_string());
            return Err(AuditError::timeout(url, result.status, detail));
        }

        info!(
            status = ?result.status,
            error = ?result.error,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetch gave up"
        );
        Ok(result)
    }

    async fn send(
        &self,
        url: &str,
        variant: HeaderVariant,
        options: &FetchOptions,
    ) -> std::result::Result<RawResponse, TransportError> {
        self.throttle.acquire().await;
        self.transport
            .get(&RequestSpec {
                url,
                variant,
                timeout: options.timeout,
                allow_brotli: options.allow_brotli,
                follow_redirects: options.follow_redirects,
            })
            .await
    }

    fn accept(&self, resp: RawResponse, options: &FetchOptions) -> FetchResult {
        if resp.is_brotli_encoded() {
            // An allowed, supported Brotli body arrives already decoded with
            // the header stripped, so reaching here means no decoder ran.
            debug!(allowed = options.allow_brotli, supported = BROTLI_SUPPORTED, "Undecoded Brotli body");
            return FetchResult::failed(Some(200), BROTLI_UNAVAILABLE, FailureKind::Decode, resp.final_url);
        }
        let html = decode::decode_body(&resp.body, resp.content_type.as_deref());
        FetchResult::success(html, resp.status, resp.final_url)
    }
}

/// `https://` form of an `http://` URL.
pub fn upgrade_to_https(url: &str) -> Option<String> {
    let rest = url.strip_prefix("http://")?;
    Some(format!("https://{rest}"))
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_upgrade_to_https() {
        assert_eq!(
            upgrade_to_https("http://example.com/a?b=1").as_deref(),
            Some("https://example.com/a?b=1")
        );
        assert_eq!(upgrade_to_https("https://example.com"), None);
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let t = ScriptedTransport::new();
        t.respond("http://example.com", 200, "<html>hi</html>");
        let f = fetcher(t);
        let result = f.fetch("http://example.com", &quick_options()).await.unwrap();
        assert_eq!(result.html.as_deref(), Some("<html>hi</html>"));
        assert_eq!(result.status, Some(200));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_403_over_http_retries_over_https_in_same_attempt() {
        let t = ScriptedTransport::new();
        t.respond("http://example.com", 403, "");
        t.respond("https://example.com", 200, "<html>secure</html>");
        let f = fetcher(t);
        let opts = quick_options().with_retries(0).with_variant(HeaderVariant::Default);
        let result = f.fetch("http://example.com", &opts).await.unwrap();

        assert_eq!(result.html.as_deref(), Some("<html>secure</html>"));
        assert_eq!(
            f.transport().urls(),
            vec!["http://example.com".to_string(), "https://example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn test_persistent_429_rotates_variants() {
        let t = ScriptedTransport::new();
        for _ in 0..6 {
            t.respond("https://example.com", 429, "");
        }
        t.respond("https://example.com", 200, "<html>ok</html>");
        let f = fetcher(t);
        let opts = quick_options().with_retries(2);
        let result = f.fetch("https://example.com", &opts).await.unwrap();

        assert_eq!(result.html.as_deref(), Some("<html>ok</html>"));
        let variants: Vec<_> = f.transport().requests().into_iter().map(|(_, v, _)| v).collect();
        assert_eq!(&variants[..3], &[HeaderVariant::Default; 3]);
        assert_eq!(&variants[3..6], &[HeaderVariant::Chrome; 3]);
        assert_eq!(variants[6], HeaderVariant::Firefox);
    }

    #[tokio::test]
    async fn test_exhausted_variants_return_last_status() {
        let t = ScriptedTransport::new();
        for _ in 0..8 {
            t.respond("https://example.com", 403, "");
        }
        let f = fetcher(t);
        let opts = quick_options().with_retries(1);
        let result = f.fetch("https://example.com", &opts).await.unwrap();
        assert!(result.html.is_none());
        assert_eq!(result.status, Some(403));
        assert_eq!(f.transport().requests().len(), 8);
    }

    #[tokio::test]
    async fn test_other_status_is_terminal() {
        let t = ScriptedTransport::new();
        t.respond("https://example.com", 500, "");
        let f = fetcher(t);
        let result = f.fetch("https://example.com", &quick_options()).await.unwrap();
        assert_eq!(result.status, Some(500));
        assert_eq!(f.transport().requests().len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_absorbed_by_default() {
        let t = ScriptedTransport::new();
        for _ in 0..3 {
            t.fail("https://slow.example", FailureKind::Timeout, "operation timed out");
        }
        let f = fetcher(t);
        let opts = quick_options().with_retries(2).with_variant(HeaderVariant::Default);
        let result = f.fetch("https://slow.example", &opts).await.unwrap();
        assert!(result.html.is_none());
        assert_eq!(result.failure, Some(FailureKind::Timeout));
        assert_eq!(result.error.as_deref(), Some("operation timed out"));
    }

    #[tokio::test]
    async fn test_strict_mode_raises_terminal_timeout() {
        let t = ScriptedTransport::new();
        t.fail("https://slow.example", FailureKind::Timeout, "operation timed out");
        let f = fetcher(t);
        let opts = quick_options()
            .with_retries(0)
            .with_variant(HeaderVariant::Default)
            .raise_on_timeout(true);
        let err = f.fetch("https://slow.example", &opts).await.unwrap_err();
        match err {
            AuditError::Timeout { url, detail, .. } => {
                assert_eq!(url, "https://slow.example");
                assert!(detail.contains("timed out"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_strict_mode_ignores_recovered_timeout() {
        let t = ScriptedTransport::new();
        t.fail("https://slow.example", FailureKind::Timeout, "operation timed out");
        t.respond("https://slow.example", 200, "<html>late</html>");
        let f = fetcher(t);
        let opts = quick_options()
            .with_retries(1)
            .with_variant(HeaderVariant::Default)
            .raise_on_timeout(true);
        let result = f.fetch("https://slow.example", &opts).await.unwrap();
        assert!(result.has_html());
    }

    #[tokio::test]
    async fn test_brotli_body_reports_distinct_error() {
        let t = ScriptedTransport::new();
        let mut resp = response("https://example.com", 200, "\u{1b}binary");
        resp.content_encoding = Some("br".into());
        t.push("https://example.com", Ok(resp));
        let f = fetcher(t);
        let result = f.fetch("https://example.com", &quick_options()).await.unwrap();
        assert!(result.html.is_none());
        assert_eq!(result.error.as_deref(), Some(BROTLI_UNAVAILABLE));
        assert_eq!(result.failure, Some(FailureKind::Decode));
    }

    #[tokio::test]
    async fn test_connection_reset_retried_then_next_variant() {
        let t = ScriptedTransport::new();
        t.fail("https://example.com", FailureKind::Reset, "connection reset by peer");
        t.respond("https://example.com", 200, "<html>ok</html>");
        let f = fetcher(t);
        let opts = quick_options().with_retries(0);
        let result = f.fetch("https://example.com", &opts).await.unwrap();
        assert!(result.has_html());
        let variants: Vec<_> = f.transport().requests().into_iter().map(|(_, v, _)| v).collect();
        assert_eq!(variants, vec![HeaderVariant::Default, HeaderVariant::Chrome]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_linear_without_trailing_wait() {
        let t = ScriptedTransport::new();
        for _ in 0..3 {
            t.respond("https://example.com", 429, "");
        }
        let f = fetcher(t);
        let opts = FetchOptions::default()
            .with_variant(HeaderVariant::Default)
            .with_retries(2)
            .with_backoff(Duration::from_millis(100));

        let start = tokio::time::Instant::now();
        let result = f.fetch("https://example.com", &opts).await.unwrap();

        // 100ms after attempt 0, 200ms after attempt 1, nothing after attempt 2.
        assert_eq!(start.elapsed(), Duration::from_millis(300));
        assert_eq!(result.status, Some(429));
        assert_eq!(f.transport().requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_never_sleeps() {
        let t = ScriptedTransport::new();
        t.respond("https://example.com", 429, "");
        let f = fetcher(t);
        let opts = FetchOptions::default()
            .with_variant(HeaderVariant::Default)
            .with_retries(0)
            .with_backoff(Duration::from_secs(5));

        let start = tokio::time::Instant::now();
        f.fetch("https://example.com", &opts).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_unfollowed_redirect_is_terminal() {
        let t = ScriptedTransport::new();
        t.respond("http://example.com", 301, "");
        let f = fetcher(t);
        let opts = quick_options().follow_redirects(false);
        let result = f.fetch("http://example.com", &opts).await.unwrap();

        assert!(result.is_redirect());
        assert_eq!(f.transport().redirect_policies(), vec![false]);
    }
}
