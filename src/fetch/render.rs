//! Last-resort headless browser rendering.
//!
//! Only used when a site blocks plain HTTP clients. Rendering needs the
//! `headless` cargo feature (chromiumoxide) and a local Chrome/Chromium.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::config::HeadlessConfig;
use crate::error::{AuditError, Result};

#[derive(Debug, Clone)]
pub struct HeadlessRenderer {
    timeout: Duration,
    chrome_path: Option<PathBuf>,
}

impl HeadlessRenderer {
    pub fn new(timeout: Duration, chrome_path: Option<PathBuf>) -> Self {
        Self {
            timeout,
            chrome_path,
        }
    }

    /// `None` unless rendering is enabled in the configuration.
    pub fn from_config(config: &HeadlessConfig) -> Option<Self> {
        config.enabled.then(|| {
            Self::new(
                Duration::from_secs(config.timeout_secs),
                config.chrome_path.clone(),
            )
        })
    }

    /// Render `url` and return the DOM as HTML, bounded by the fixed timeout.
    #[instrument(level = "info", skip(self))]
    pub async fn render(&self, url: &str) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.render_page(url)).await {
            Ok(Ok(html)) => {
                info!(bytes = html.len(), "Headless render succeeded");
                Ok(html)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Headless render failed");
                Err(e)
            }
            Err(_) => Err(AuditError::render(
                url,
                format!("timed out after {}s", self.timeout.as_secs()),
            )),
        }
    }

    #[cfg(feature = "headless")]
    async fn render_page(&self, url: &str) -> Result<String> {
        use chromiumoxide::browser::{Browser, BrowserConfig};
        use futures::StreamExt;

        let mut builder = BrowserConfig::builder();
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(|e| AuditError::render(url, e))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AuditError::render(url, e))?;
        let driver = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let outcome = async {
            let page = browser.new_page(url).await?;
            page.wait_for_navigation().await?;
            page.content().await
        }
        .await;

        if let Err(e) = browser.close().await {
            warn!(error = %e, "Failed to close headless browser");
        }
        let _ = driver.await;

        outcome.map_err(|e| AuditError::render(url, e))
    }

    #[cfg(not(feature = "headless"))]
    async fn render_page(&self, url: &str) -> Result<String> {
        let _ = &self.chrome_path;
        Err(AuditError::render(
            url,
            "headless rendering not available (built without the `headless` feature)",
        ))
    }
}
