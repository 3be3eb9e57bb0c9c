//! Headless-Chromium upstream session.
//!
//! The upstream API only answers reliably to requests made from its own
//! page, so this session loads the landing page once and then runs `fetch`
//! inside it for every form post. One browser process per session.

use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{SessionFactory, UpstreamSession, UpstreamSettings};
use crate::error::ScraperError;
use crate::form::UpstreamForm;
use crate::rate_limit::retry_with_backoff;

#[derive(Debug, Clone)]
pub struct BrowserConnector {
    settings: UpstreamSettings,
}

impl BrowserConnector {
    #[must_use]
    pub fn new(settings: UpstreamSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self) -> Result<BrowserConfig, ScraperError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(command_timeout(&self.settings));
        if let Some(path) = &self.settings.chrome_path {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(|reason| ScraperError::Session {
            reason: format!("invalid browser configuration: {reason}"),
        })
    }
}

/// CDP command timeout. Page creation and landing navigation are CDP
/// commands too, and `open` bounds those by the session timeout.
fn command_timeout(settings: &UpstreamSettings) -> Duration {
    settings.request_timeout.max(settings.session_timeout)
}

pub struct BrowserSession {
    /// Only touched again at close; the mutex makes the session `Sync`.
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    page: Page,
    settings: UpstreamSettings,
}

/// What the in-page `fetch` hands back.
#[derive(Debug, Deserialize)]
struct FetchOutcome {
    status: u16,
    body: String,
}

impl SessionFactory for BrowserConnector {
    type Session = BrowserSession;

    async fn open(&self) -> Result<BrowserSession, ScraperError> {
        let config = self.browser_config()?;
        let session_timeout = self.settings.session_timeout;
        let secs = session_timeout.as_secs();

        let (mut browser, mut handler) =
            tokio::time::timeout(session_timeout, Browser::launch(config))
                .await
                .map_err(|_| ScraperError::Session {
                    reason: format!("browser did not start within {secs}s"),
                })?
                .map_err(|e| ScraperError::Session {
                    reason: format!("browser launch failed: {e}"),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!(error = %e, "browser handler event error");
                }
            }
        });

        let landing_url = self.settings.landing_url();
        let navigation = tokio::time::timeout(session_timeout, async {
            let page = browser.new_page(landing_url.as_str()).await?;
            page.wait_for_navigation().await?;
            Ok::<Page, CdpError>(page)
        })
        .await;

        let page = match navigation {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                shutdown(&mut browser, handler).await;
                return Err(ScraperError::Session {
                    reason: format!("navigation to {landing_url} failed: {e}"),
                });
            }
            Err(_) => {
                shutdown(&mut browser, handler).await;
                return Err(ScraperError::Session {
                    reason: format!("navigation to {landing_url} did not finish within {secs}s"),
                });
            }
        };

        tracing::debug!(landing_url, "browser upstream session opened");

        Ok(BrowserSession {
            browser: Mutex::new(browser),
            handler,
            page,
            settings: self.settings.clone(),
        })
    }
}

impl BrowserSession {
    async fn post_once(&self, form: &UpstreamForm) -> Result<Value, ScraperError> {
        let context = form.describe();
        let params = EvaluateParams::builder()
            .expression(fetch_script(UpstreamSettings::api_path(), &form.encode()))
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(|reason| ScraperError::Malformed {
                context: context.clone(),
                reason: format!("cannot build evaluation: {reason}"),
            })?;

        let evaluation =
            tokio::time::timeout(self.settings.request_timeout, self.page.evaluate_expression(params))
                .await
                .map_err(|_| ScraperError::Timeout {
                    context: context.clone(),
                    secs: self.settings.request_timeout_secs(),
                })??;

        let outcome: FetchOutcome =
            evaluation
                .into_value()
                .map_err(|source| ScraperError::Deserialize {
                    context: format!("in-page fetch result for {context}"),
                    source,
                })?;

        if outcome.status == 429 {
            return Err(ScraperError::RateLimited {
                retry_after_secs: 60,
            });
        }
        if !(200..300).contains(&outcome.status) {
            return Err(ScraperError::UnexpectedStatus {
                status: outcome.status,
                url: UpstreamSettings::api_path().to_owned(),
            });
        }

        serde_json::from_str::<Value>(&outcome.body)
            .map_err(|source| ScraperError::Deserialize { context, source })
    }
}

impl UpstreamSession for BrowserSession {
    async fn post_form(&self, form: &UpstreamForm) -> Result<Value, ScraperError> {
        retry_with_backoff(
            self.settings.max_retries,
            self.settings.retry_backoff_base_ms,
            || self.post_once(form),
        )
        .await
    }

    async fn close(self) {
        let Self {
            browser,
            handler,
            page,
            ..
        } = self;
        drop(page);
        let mut browser = browser.into_inner();
        shutdown(&mut browser, handler).await;
        tracing::debug!("browser upstream session closed");
    }
}

async fn shutdown(browser: &mut Browser, handler: JoinHandle<()>) {
    if let Err(e) = browser.close().await {
        tracing::warn!(error = %e, "browser close failed");
    }
    if let Err(e) = browser.wait().await {
        tracing::warn!(error = %e, "waiting for browser process failed");
    }
    handler.abort();
}

/// Builds the in-page script: a same-origin form POST whose status and raw
/// body are returned by value.
fn fetch_script(api_path: &str, body: &str) -> String {
    let api_path = Value::String(api_path.to_owned());
    let body = Value::String(body.to_owned());
    format!(
        "(async () => {{ \
           const res = await fetch({api_path}, {{ \
             method: 'POST', \
             credentials: 'same-origin', \
             headers: {{ 'Content-Type': 'application/x-www-form-urlencoded; charset=UTF-8', 'X-Requested-With': 'XMLHttpRequest' }}, \
             body: {body} \
           }}); \
           return {{ status: res.status, body: await res.text() }}; \
         }})()"
    )
}
