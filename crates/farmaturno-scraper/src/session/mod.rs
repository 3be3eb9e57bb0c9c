//! Upstream access behind a small capability trait.
//!
//! The collector only ever needs "POST this form to the pharmacy API and
//! give me the JSON back", within one session that is opened at the start of
//! a run and closed at the end. Two implementations exist: a headless
//! Chromium page that issues `fetch` from inside the upstream origin, and a
//! plain HTTP client with a cookie jar.

mod browser;
mod direct;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use farmaturno_core::{AppConfig, FetchBackend};
use serde_json::Value;

use crate::error::ScraperError;
use crate::form::UpstreamForm;

pub use browser::{BrowserConnector, BrowserSession};
pub use direct::{DirectConnector, DirectSession};

const LANDING_PATH: &str = "/asdigital/index.php?mfarmacias";
const API_PATH: &str = "/asdigital/mfarmacias/mapa.php";

/// One live upstream session. Must be closed when the run ends.
pub trait UpstreamSession: Send + Sync {
    /// POST `form` to the pharmacy API and return the decoded JSON body.
    fn post_form(
        &self,
        form: &UpstreamForm,
    ) -> impl Future<Output = Result<Value, ScraperError>> + Send;

    /// Release every resource held by the session. Never fails; problems
    /// are logged.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Opens a fresh [`UpstreamSession`] for each collection run.
pub trait SessionFactory: Send + Sync {
    type Session: UpstreamSession;

    fn open(&self) -> impl Future<Output = Result<Self::Session, ScraperError>> + Send;
}

/// Settings shared by both session kinds.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub request_timeout: Duration,
    pub session_timeout: Duration,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub chrome_path: Option<PathBuf>,
}

impl UpstreamSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.upstream_base_url.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            session_timeout: Duration::from_secs(config.session_timeout_secs),
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            retry_backoff_base_ms: config.retry_backoff_base_ms,
            chrome_path: config.chrome_path.clone(),
        }
    }

    #[must_use]
    pub fn landing_url(&self) -> String {
        format!("{}{LANDING_PATH}", self.base_url)
    }

    #[must_use]
    pub fn api_url(&self) -> String {
        format!("{}{API_PATH}", self.base_url)
    }

    pub(crate) fn api_path() -> &'static str {
        API_PATH
    }

    pub(crate) fn request_timeout_secs(&self) -> u64 {
        self.request_timeout.as_secs()
    }
}

/// Backend chosen by configuration.
#[derive(Debug, Clone)]
pub enum Connector {
    Browser(BrowserConnector),
    Direct(DirectConnector),
}

impl Connector {
    #[must_use]
    pub fn new(backend: FetchBackend, settings: UpstreamSettings) -> Self {
        match backend {
            FetchBackend::Browser => Self::Browser(BrowserConnector::new(settings)),
            FetchBackend::Direct => Self::Direct(DirectConnector::new(settings)),
        }
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            config.fetch_backend,
            UpstreamSettings::from_app_config(config),
        )
    }

    #[must_use]
    pub fn backend(&self) -> FetchBackend {
        match self {
            Self::Browser(_) => FetchBackend::Browser,
            Self::Direct(_) => FetchBackend::Direct,
        }
    }
}

/// Session produced by a [`Connector`].
pub enum AnySession {
    Browser(BrowserSession),
    Direct(DirectSession),
}

impl UpstreamSession for AnySession {
    async fn post_form(&self, form: &UpstreamForm) -> Result<Value, ScraperError> {
        match self {
            Self::Browser(session) => session.post_form(form).await,
            Self::Direct(session) => session.post_form(form).await,
        }
    }

    async fn close(self) {
        match self {
            Self::Browser(session) => session.close().await,
            Self::Direct(session) => session.close().await,
        }
    }
}

impl SessionFactory for Connector {
    type Session = AnySession;

    async fn open(&self) -> Result<AnySession, ScraperError> {
        match self {
            Self::Browser(connector) => connector.open().await.map(AnySession::Browser),
            Self::Direct(connector) => connector.open().await.map(AnySession::Direct),
        }
    }
}
