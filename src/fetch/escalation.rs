//! Homepage escalation chain.
//!
//! Steps run in order until one yields HTML:
//!
//! 1. [`Escalation::Direct`]: plain fetch with header rotation; redirects of
//!    `http://` URLs are not followed
//! 2. [`Escalation::HttpsUpgrade`]: direct fetch redirected and the URL is `http://`
//! 3. [`Escalation::Amp`]: same URL with `output=amp` merged into the query
//! 4. [`Escalation::Brotli`]: same URL with Brotli decoding allowed
//! 5. [`Escalation::Headless`]: browser render, only for bot blocks
//!
//! Each step decides from the earlier results alone whether it applies
//! ([`Escalation::plan`]); only the executor touches the network.

use tracing::{debug, info, instrument};
use url::Url;

use super::transport::{BROTLI_SUPPORTED, Transport};
use super::{FetchOptions, Fetcher, upgrade_to_https};
use crate::error::Result;
use crate::models::{FailureKind, FetchResult, FetchStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    Direct,
    HttpsUpgrade,
    Amp,
    Brotli,
    Headless,
}

/// What a step wants fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    pub url: String,
    pub allow_brotli: bool,
    pub follow_redirects: bool,
    pub render: bool,
}

impl StepPlan {
    fn fetch(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            allow_brotli: false,
            follow_redirects: true,
            render: false,
        }
    }
}

impl Escalation {
    pub const CHAIN: [Escalation; 5] = [
        Self::Direct,
        Self::HttpsUpgrade,
        Self::Amp,
        Self::Brotli,
        Self::Headless,
    ];

    pub fn strategy(self) -> FetchStrategy {
        match self {
            Self::Direct => FetchStrategy::Direct,
            Self::HttpsUpgrade => FetchStrategy::HttpsUpgrade,
            Self::Amp => FetchStrategy::Amp,
            Self::Brotli => FetchStrategy::Brotli,
            Self::Headless => FetchStrategy::Headless,
        }
    }

    /// Decide whether this step runs, given the results of earlier steps.
    pub fn plan(self, url: &str, prior: &[FetchResult], headless_available: bool) -> Option<StepPlan> {
        match self {
            // An http:// redirect is left for the HTTPS upgrade to act on.
            Self::Direct => Some(StepPlan {
                follow_redirects: upgrade_to_https(url).is_none(),
                ..StepPlan::fetch(url)
            }),
            Self::HttpsUpgrade => {
                let direct = prior.first()?;
                if !direct.is_redirect() {
                    return None;
                }
                upgrade_to_https(url).map(StepPlan::fetch)
            }
            Self::Amp => with_amp_query(url).map(StepPlan::fetch),
            Self::Brotli => BROTLI_SUPPORTED.then(|| StepPlan {
                allow_brotli: true,
                ..StepPlan::fetch(url)
            }),
            Self::Headless => {
                if headless_available && prior.iter().any(FetchResult::is_bot_blocked) {
                    Some(StepPlan {
                        render: true,
                        ..StepPlan::fetch(url)
                    })
                } else {
                    None
                }
            }
        }
    }
}

/// Merge `output=amp` into the query string, replacing any `output` value.
pub fn with_amp_query(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "output")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = parsed.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair("output", "amp");
    }
    Some(parsed.to_string())
}

impl<T: Transport> Fetcher<T> {
    /// Fetch a homepage, escalating through [`Escalation::CHAIN`].
    ///
    /// Returns the first result with HTML, else the last failure. The only
    /// error is a strict-mode timeout from the direct step.
    #[instrument(level = "info", skip(self, options))]
    pub async fn fetch_homepage(&self, url: &str, options: &FetchOptions) -> Result<FetchResult> {
        let mut history: Vec<FetchResult> = Vec::new();

        for step in Escalation::CHAIN {
            let Some(plan) = step.plan(url, &history, self.renderer().is_some()) else {
                debug!(?step, "Escalation step not applicable");
                continue;
            };

            let result = if plan.render {
                self.render_result(&plan.url).await
            } else {
                let step_options = options
                    .clone()
                    .allow_brotli(plan.allow_brotli)
                    .follow_redirects(plan.follow_redirects);
                self.fetch(&plan.url, &step_options).await?
            }
            .with_strategy(step.strategy());

            if result.has_html() {
                info!(strategy = %result.strategy, url = %plan.url, "Homepage retrieved");
                return Ok(result);
            }
            debug!(?step, status = ?result.status, error = ?result.error, "Escalation step produced no HTML");
            history.push(result);
        }

        Ok(history
            .pop()
            .unwrap_or_else(|| FetchResult::failed(None, "no fetch strategy applied", FailureKind::Other, url)))
    }

    async fn render_result(&self, url: &str) -> FetchResult {
        let Some(renderer) = self.renderer() else {
            return FetchResult::failed(None, "headless rendering disabled", FailureKind::Other, url);
        };
        match renderer.render(url).await {
            Ok(html) => FetchResult::success(html, 200, url),
            Err(e) => FetchResult::failed(None, e.to_string(), FailureKind::Other, url),
        }
    }
}
