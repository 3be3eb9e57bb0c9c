use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("browser automation error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    /// The upstream session could not be established (browser launch,
    /// landing-page navigation, or HTTP client construction).
    #[error("could not open upstream session: {reason}")]
    Session { reason: String },

    #[error("timed out after {secs}s during {context}")]
    Timeout { context: String, secs: u64 },

    #[error("rate limited by upstream (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The upstream answered but flagged the request as not successful.
    #[error("upstream reported failure for {context}")]
    Unsuccessful { context: String },

    #[error("malformed upstream payload for {context}: {reason}")]
    Malformed { context: String, reason: String },
}
