//! Sitemap probe.

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, info, instrument, warn};

use super::{XmlError, is_pdf_like, local_name, origin_of};
use crate::classifiers::keywords::{NOTICE_KEYWORDS, NOTICE_URL_KEYWORDS, contains_any};
use crate::fetch::transport::Transport;
use crate::fetch::{FetchOptions, Fetcher};
use crate::models::SitemapData;

pub const SITEMAP_PATHS: [&str; 4] = [
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap-news.xml",
    "/wp-sitemap.xml",
];

/// Probe every well-known sitemap path on the origin of `base_url` and
/// summarize the URLs found across all of them.
#[instrument(level = "info", skip(fetcher, options))]
pub async fn probe_sitemaps<T: Transport>(
    fetcher: &Fetcher<T>,
    base_url: &str,
    options: &FetchOptions,
) -> SitemapData {
    let Some(origin) = origin_of(base_url) else {
        warn!("Cannot derive an origin; skipping sitemap probe");
        return SitemapData::default();
    };

    let mut used = false;
    let mut urls = Vec::new();

    for path in SITEMAP_PATHS {
        let Ok(target) = origin.join(path) else {
            continue;
        };
        let result = match fetcher.fetch(target.as_str(), options).await {
            Ok(result) => result,
            Err(e) => {
                warn!(url = %target, error = %e, "Sitemap fetch raised; skipping");
                continue;
            }
        };
        let Some(body) = result.html.as_deref().filter(|b| !b.trim().is_empty()) else {
            debug!(url = %target, status = ?result.status, "No sitemap here");
            continue;
        };

        used = true;
        match parse_sitemap_locs(body) {
            Ok(locs) => {
                debug!(url = %target, locs = locs.len(), "Parsed sitemap");
                urls.extend(locs);
            }
            Err(e) => warn!(url = %target, error = %e, "Malformed sitemap; skipping"),
        }
    }

    let data = summarize(urls, used);
    info!(
        used = data.used,
        urls = data.urls.len(),
        pdf_ratio = data.pdf_ratio,
        notices = data.notices_found,
        "Sitemap probe finished"
    );
    data
}

/// Trimmed, lower-cased `<loc>` values of a sitemap or sitemap index.
///
/// Any parse error rejects the whole document.
pub fn parse_sitemap_locs(xml: &str) -> Result<Vec<String>, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut open: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut locs = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                open.push(local_name(&e));
                text.clear();
            }
            Event::Text(e) => {
                if open.last().is_some_and(|n| n == "loc") {
                    text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if open.last().is_some_and(|n| n == "loc") {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(_) => {
                if open.pop().as_deref() == Some("loc") {
                    let loc = text.trim().to_lowercase();
                    if !loc.is_empty() {
                        locs.push(loc);
                    }
                }
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match open.pop() {
        Some(unclosed) => Err(XmlError::Truncated(unclosed)),
        None => Ok(locs),
    }
}

/// Ratio and notice flag over the collected URLs.
pub fn summarize(urls: Vec<String>, used: bool) -> SitemapData {
    let total = urls.len();
    let pdf_count = urls.iter().filter(|u| is_pdf_like(u)).count();
    let pdf_ratio = if total == 0 {
        0.0
    } else {
        pdf_count as f64 / total as f64
    };
    let notices_found = urls
        .iter()
        .any(|u| contains_any(u, NOTICE_URL_KEYWORDS) || contains_any(u, NOTICE_KEYWORDS));

    SitemapData {
        pdf_ratio,
        notices_found,
        used,
        urls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{ScriptedTransport, fetcher, quick_options};
    use crate::fetch::throttle::Throttle;
    use crate::fetch::transport::HttpTransport;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn urlset(locs: &[&str]) -> String {
        let body: String = locs
            .iter()
            .map(|l| format!("<url><loc>{l}</loc></url>"))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{body}</urlset>"#
        )
    }

    #[test]
    fn test_parse_locs_trims_and_lowercases() {
        let xml = "<urlset><url><loc>\n  https://X.com/News/A \n</loc></url><url><loc><![CDATA[https://x.com/B.pdf]]></loc></url></urlset>";
        assert_eq!(
            parse_sitemap_locs(xml).unwrap(),
            vec!["https://x.com/news/a".to_string(), "https://x.com/b.pdf".to_string()]
        );
    }

    #[test]
    fn test_parse_sitemap_index_with_prefix() {
        let xml = r#"<sm:sitemapindex xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9"><sm:sitemap><sm:loc>https://x.com/s1.xml</sm:loc></sm:sitemap></sm:sitemapindex>"#;
        assert_eq!(parse_sitemap_locs(xml).unwrap(), vec!["https://x.com/s1.xml"]);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_sitemap_locs("<urlset><url><loc>https://x.com/a</loc></url>").is_err());
        assert!(parse_sitemap_locs("<urlset><loc>a</url></urlset>").is_err());
    }

    #[test]
    fn test_summarize_ratio_bounds() {
        let empty = summarize(Vec::new(), true);
        assert_eq!(empty.pdf_ratio, 0.0);
        assert!(empty.used);

        let mut urls: Vec<String> = (0..9).map(|i| format!("https://x.com/p{i}.pdf")).collect();
        urls.push("https://x.com/news/story".into());
        let data = summarize(urls, true);
        assert!((data.pdf_ratio - 0.9).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&data.pdf_ratio));
        assert!(!data.notices_found);
    }

    #[test]
    fn test_summarize_notices() {
        let data = summarize(vec!["https://x.com/public-notices/2024".into()], true);
        assert!(data.notices_found);
    }

    #[tokio::test]
    async fn test_probe_accumulates_across_paths() {
        let t = ScriptedTransport::new();
        t.respond("https://x.com/sitemap.xml", 200, &urlset(&["https://x.com/a.pdf"]));
        t.respond(
            "https://x.com/sitemap-news.xml",
            200,
            &urlset(&["https://x.com/news/b", "https://x.com/legals/c"]),
        );
        let f = fetcher(t);
        let data = probe_sitemaps(&f, "https://x.com/home?ref=1", &quick_options()).await;

        assert!(data.used);
        assert_eq!(data.urls.len(), 3);
        assert!((data.pdf_ratio - 1.0 / 3.0).abs() < 1e-9);
        assert!(data.notices_found);
    }

    #[tokio::test]
    async fn test_malformed_path_is_skipped_but_counts_as_used() {
        let t = ScriptedTransport::new();
        t.respond("https://x.com/sitemap.xml", 200, "<urlset><url><loc>https://x.com/a.pdf");
        t.respond("https://x.com/wp-sitemap.xml", 200, &urlset(&["https://x.com/wp-sitemap-posts-post-1.xml"]));
        let f = fetcher(t);
        let data = probe_sitemaps(&f, "https://x.com/", &quick_options()).await;

        assert!(data.used);
        assert_eq!(data.urls, vec!["https://x.com/wp-sitemap-posts-post-1.xml"]);
        assert_eq!(data.pdf_ratio, 0.0);
    }

    #[tokio::test]
    async fn test_no_sitemaps() {
        let f = fetcher(ScriptedTransport::new());
        let data = probe_sitemaps(&f, "https://x.com/", &quick_options()).await;
        assert_eq!(data, SitemapData::default());
        assert_eq!(f.transport().urls().len(), SITEMAP_PATHS.len());
    }

    #[tokio::test]
    async fn test_probe_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap_index.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(urlset(&[
                "https://paper.test/eedition/today",
                "https://paper.test/news/story-1",
            ])))
            .mount(&server)
            .await;

        let f = Fetcher::new(HttpTransport::new().unwrap(), Throttle::disabled());
        let data = probe_sitemaps(&f, &format!("{}/index.html", server.uri()), &quick_options()).await;

        assert!(data.used);
        assert_eq!(data.urls.len(), 2);
        assert!((data.pdf_ratio - 0.5).abs() < 1e-9);
    }
}
