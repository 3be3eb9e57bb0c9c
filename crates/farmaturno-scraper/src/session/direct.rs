//! Plain-HTTP upstream session.
//!
//! Opens with one GET of the landing page so the cookie jar holds whatever
//! session cookies the site sets, then replays the same form posts the
//! upstream's own map page makes.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use super::{SessionFactory, UpstreamSession, UpstreamSettings};
use crate::error::ScraperError;
use crate::form::UpstreamForm;
use crate::rate_limit::retry_with_backoff;

#[derive(Debug, Clone)]
pub struct DirectConnector {
    settings: UpstreamSettings,
}

impl DirectConnector {
    #[must_use]
    pub fn new(settings: UpstreamSettings) -> Self {
        Self { settings }
    }
}

pub struct DirectSession {
    client: Client,
    api_url: String,
    landing_url: String,
    settings: UpstreamSettings,
}

impl SessionFactory for DirectConnector {
    type Session = DirectSession;

    async fn open(&self) -> Result<DirectSession, ScraperError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(self.settings.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(self.settings.user_agent.as_str())
            .build()
            .map_err(|e| ScraperError::Session {
                reason: format!("cannot build HTTP client: {e}"),
            })?;

        let landing_url = self.settings.landing_url();
        let session_timeout = self.settings.session_timeout;
        let response = client
            .get(&landing_url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "es-CL,es;q=0.9")
            // Overrides the client-wide request timeout.
            .timeout(session_timeout)
            .send()
            .await
            .map_err(|e| ScraperError::Session {
                reason: if e.is_timeout() {
                    format!(
                        "landing page {landing_url} did not respond within {}s",
                        session_timeout.as_secs()
                    )
                } else {
                    format!("landing page {landing_url} unreachable: {e}")
                },
            })?;

        if !response.status().is_success() {
            return Err(ScraperError::Session {
                reason: format!(
                    "landing page {landing_url} returned HTTP {}",
                    response.status().as_u16()
                ),
            });
        }

        tracing::debug!(landing_url, "direct upstream session opened");

        Ok(DirectSession {
            client,
            api_url: self.settings.api_url(),
            landing_url,
            settings: self.settings.clone(),
        })
    }
}

impl DirectSession {
    async fn post_once(&self, form: &UpstreamForm) -> Result<Value, ScraperError> {
        let response = self
            .client
            .post(&self.api_url)
            .header(reqwest::header::ACCEPT, "application/json, text/javascript, */*; q=0.01")
            .header(reqwest::header::REFERER, &self.landing_url)
            .header("X-Requested-With", "XMLHttpRequest")
            .form(form.fields())
            .send()
            .await
            .map_err(|e| self.classify(e, form))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ScraperError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.api_url.clone(),
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e, form))?;
        serde_json::from_str::<Value>(&body).map_err(|source| ScraperError::Deserialize {
            context: form.describe(),
            source,
        })
    }

    fn classify(&self, err: reqwest::Error, form: &UpstreamForm) -> ScraperError {
        if err.is_timeout() {
            ScraperError::Timeout {
                context: form.describe(),
                secs: self.settings.request_timeout_secs(),
            }
        } else {
            ScraperError::Http(err)
        }
    }
}

impl UpstreamSession for DirectSession {
    async fn post_form(&self, form: &UpstreamForm) -> Result<Value, ScraperError> {
        retry_with_backoff(
            self.settings.max_retries,
            self.settings.retry_backoff_base_ms,
            || self.post_once(form),
        )
        .await
    }

    async fn close(self) {
        // Dropping the client closes pooled connections and the cookie jar.
        tracing::debug!(api_url = %self.api_url, "direct upstream session closed");
    }
}
