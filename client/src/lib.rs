mod backoff;
pub mod client;
pub mod sponsor;

pub use client::Client;
pub use client::RetryPolicy;
pub use sponsor::SponsorClient;
use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("object error: {0}")]
    ObjectError(String),
    #[error("unexpected response")]
    UnexpectedResponse,
    #[error("timed out waiting for {0}")]
    Timeout(String),
    #[error("sponsor unavailable: {0}")]
    SponsorUnavailable(String),
    #[error("sponsor rejected transaction: {0}")]
    SponsorRejected(String),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
