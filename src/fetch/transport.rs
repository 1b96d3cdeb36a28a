//! The single-request layer underneath the fetcher.
//!
//! [`Transport`] performs exactly one GET and reports what came back. Retry,
//! rotation and escalation live above it in [`Fetcher`](super::Fetcher), so a
//! scripted transport can drive those paths in tests.

use std::error::Error as StdError;
use std::time::Duration;

use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderMap};
use thiserror::Error;
use tracing::{debug, instrument};

use super::headers::HeaderVariant;
use crate::error::Result;
use crate::models::FailureKind;

/// One GET request as the fetcher wants it sent.
#[derive(Debug, Clone)]
pub struct RequestSpec<'a> {
    pub url: &'a str,
    pub variant: HeaderVariant,
    pub timeout: Duration,
    pub allow_brotli: bool,
    /// When `false`, a 3xx comes back as-is instead of being followed.
    pub follow_redirects: bool,
}

/// Raw response; the body is only read for 200s.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub final_url: String,
    pub content_type: Option<String>,
    /// Still present only when the client left the body encoded.
    pub content_encoding: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_brotli_encoded(&self) -> bool {
        self.content_encoding
            .as_deref()
            .is_some_and(|e| e.split(',').any(|part| part.trim().eq_ignore_ascii_case("br")))
    }
}

/// A request that produced no HTTP response at all.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct TransportError {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        // The URL is logged separately and would confuse classification.
        let err = err.without_url();
        let message = error_chain(&err);
        let kind = classify_failure(&message, err.is_timeout(), err.is_connect());
        Self { kind, message }
    }
}

/// Something that can perform a single GET.
pub trait Transport {
    async fn get(&self, request: &RequestSpec<'_>) -> std::result::Result<RawResponse, TransportError>;
}

/// `true` when this build can decode Brotli bodies.
pub const BROTLI_SUPPORTED: bool = cfg!(feature = "brotli");

/// Production transport backed by reqwest.
///
/// Holds one client per combination of Brotli decoding (only when the
/// `brotli` feature is compiled in) and redirect policy. All of them are
/// cheap to clone and safe to share across concurrent audits.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    plain: reqwest::Client,
    brotli: reqwest::Client,
    plain_manual: reqwest::Client,
    brotli_manual: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Ok(Self {
            plain: build_client(false, true)?,
            brotli: build_client(true, true)?,
            plain_manual: build_client(false, false)?,
            brotli_manual: build_client(true, false)?,
        })
    }

    fn client(&self, allow_brotli: bool, follow_redirects: bool) -> &reqwest::Client {
        match (allow_brotli, follow_redirects) {
            (false, true) => &self.plain,
            (true, true) => &self.brotli,
            (false, false) => &self.plain_manual,
            (true, false) => &self.brotli_manual,
        }
    }
}

fn build_client(allow_brotli: bool, follow_redirects: bool) -> Result<reqwest::Client> {
    let builder = reqwest::Client::builder().gzip(true).deflate(true);
    let builder = if allow_brotli {
        #[cfg(feature = "brotli")]
        let builder = builder.brotli(true);
        builder
    } else {
        builder.no_brotli()
    };
    let builder = if follow_redirects {
        builder
    } else {
        builder.redirect(reqwest::redirect::Policy::none())
    };
    Ok(builder.build()?)
}

impl Transport for HttpTransport {
    #[instrument(level = "debug", skip_all, fields(url = %request.url, variant = request.variant.name()))]
    async fn get(&self, request: &RequestSpec<'_>) -> std::result::Result<RawResponse, TransportError> {
        let client = self.client(request.allow_brotli, request.follow_redirects);

        let mut builder = client.get(request.url).timeout(request.timeout);
        for (name, value) in request.variant.headers() {
            builder = builder.header(*name, *value);
        }

        let response = builder.send().await.map_err(TransportError::from_reqwest)?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = header_value(response.headers(), CONTENT_TYPE.as_str());
        let content_encoding = header_value(response.headers(), CONTENT_ENCODING.as_str());

        let body = if status == 200 {
            response
                .bytes()
                .await
                .map_err(TransportError::from_reqwest)?
                .to_vec()
        } else {
            Vec::new()
        };

        debug!(status, bytes = body.len(), %final_url, "Received response");
        Ok(RawResponse {
            status,
            final_url,
            content_type,
            content_encoding,
            body,
        })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }
    message
}

/// Map an error description onto a [`FailureKind`].
pub fn classify_failure(message: &str, is_timeout: bool, is_connect: bool) -> FailureKind {
    if is_timeout {
        return FailureKind::Timeout;
    }
    let lower = message.to_lowercase();
    if ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|t| lower.contains(t))
    {
        FailureKind::Tls
    } else if lower.contains("reset") {
        FailureKind::Reset
    } else if ["abort", "connection closed", "broken pipe", "unexpected eof", "incomplete message"]
        .iter()
        .any(|t| lower.contains(t))
    {
        FailureKind::Aborted
    } else if lower.contains("timed out") {
        FailureKind::Timeout
    } else if is_connect || lower.contains("dns") || lower.contains("connect") {
        FailureKind::Connect
    } else {
        FailureKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};

    fn request(url: &str, follow_redirects: bool) -> RequestSpec<'_> {
        RequestSpec {
            url,
            variant: HeaderVariant::Default,
            timeout: Duration::from_secs(5),
            allow_brotli: false,
            follow_redirects,
        }
    }
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_classify_failure() {
        assert_eq!(classify_failure("anything", true, false), FailureKind::Timeout);
        assert_eq!(
            classify_failure("invalid peer certificate: UnknownIssuer", false, true),
            FailureKind::Tls
        );
        assert_eq!(
            classify_failure("connection reset by peer", false, false),
            FailureKind::Reset
        );
        assert_eq!(
            classify_failure("connection closed before message completed", false, false),
            FailureKind::Aborted
        );
        assert_eq!(
            classify_failure("dns error: failed to lookup address", false, true),
            FailureKind::Connect
        );
        assert_eq!(classify_failure("builder error", false, false), FailureKind::Other);
    }

    #[test]
    fn test_brotli_detection() {
        let mut resp = RawResponse {
            status: 200,
            final_url: "http://x".into(),
            content_type: None,
            content_encoding: Some("br".into()),
            body: vec![],
        };
        assert!(resp.is_brotli_encoded());
        resp.content_encoding = Some("gzip, BR".into());
        assert!(resp.is_brotli_encoded());
        resp.content_encoding = Some("gzip".into());
        assert!(!resp.is_brotli_encoded());
        resp.content_encoding = None;
        assert!(!resp.is_brotli_encoded());
    }

    #[tokio::test]
    async fn test_http_transport_sends_variant_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("DNT", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html>firefox</html>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let url = format!("{}/", server.uri());
        let resp = transport
            .get(&RequestSpec {
                url: &url,
                variant: HeaderVariant::Firefox,
                timeout: Duration::from_secs(5),
                allow_brotli: false,
                follow_redirects: true,
            })
            .await
            .unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"<html>firefox</html>");
        assert_eq!(resp.content_type.as_deref(), Some("text/html; charset=utf-8"));
    }

    #[tokio::test]
    async fn test_http_transport_skips_body_for_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let url = format!("{}/missing", server.uri());
        let resp = transport
            .get(&RequestSpec {
                url: &url,
                variant: HeaderVariant::Default,
                timeout: Duration::from_secs(5),
                allow_brotli: false,
                follow_redirects: true,
            })
            .await
            .unwrap();

        assert_eq!(resp.status, 404);
        assert!(resp.body.is_empty());
    }

    #[tokio::test]
    async fn test_http_transport_reports_connect_failure() {
        let transport = HttpTransport::new().unwrap();
        let err = transport
            .get(&RequestSpec {
                url: "http://127.0.0.1:9/",
                variant: HeaderVariant::Default,
                timeout: Duration::from_secs(2),
                allow_brotli: false,
                follow_redirects: true,
            })
            .await
            .unwrap_err();
        assert_ne!(err.kind, FailureKind::Other);
        assert!(!err.message.is_empty());
    }

    #[tokio::test]
    async fn test_http_transport_redirect_policy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/moved"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/moved"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>moved</html>"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let url = format!("{}/", server.uri());

        let manual = transport.get(&request(&url, false)).await.unwrap();
        assert_eq!(manual.status, 301);
        assert_eq!(manual.final_url, url);
        assert!(manual.body.is_empty());

        let followed = transport.get(&request(&url, true)).await.unwrap();
        assert_eq!(followed.status, 200);
        assert!(followed.final_url.ends_with("/moved"));
        assert_eq!(followed.body, b"<html>moved</html>");
    }
}
