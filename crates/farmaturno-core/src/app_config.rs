use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How the collector talks to the upstream pharmacy API.
///
/// The upstream endpoint has historically required a real browser context
/// (cookies set by the landing page), so `Browser` is the default. `Direct`
/// replays the same form posts over plain HTTP with a cookie jar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchBackend {
    Browser,
    Direct,
}

impl std::fmt::Display for FetchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchBackend::Browser => write!(f, "browser"),
            FetchBackend::Direct => write!(f, "direct"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Where the collector commits the dataset and the publisher reads it.
    pub dataset_path: PathBuf,
    /// Static map client assets served by the server binary.
    pub public_dir: PathBuf,
    pub fetch_backend: FetchBackend,
    /// Upstream origin, e.g. `https://seremienlinea.minsal.cl`.
    pub upstream_base_url: String,
    pub request_timeout_secs: u64,
    /// Bound on browser launch plus landing-page navigation.
    pub session_timeout_secs: u64,
    pub user_agent: String,
    /// Maximum number of detail requests in flight at once.
    pub max_in_flight: usize,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// Six-field cron expression (`sec min hour dom month dow`).
    pub schedule: String,
    pub timezone: chrono_tz::Tz,
    pub run_on_startup: bool,
    pub chrome_path: Option<PathBuf>,
}
