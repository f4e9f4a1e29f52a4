//! Error types for the HTTP collaborators.

use thiserror::Error;

/// Errors from a single HTTP attempt.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("{url} returned {status}")]
    Status { url: String, status: u16 },

    #[error("invalid response body: {0}")]
    Parse(String),

    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        let url = e.url().map(|u| redact_path(u.path())).unwrap_or_default();
        // reqwest embeds the full URL in its Display, bot token included.
        let e = e.without_url();
        if e.is_decode() {
            ClientError::Parse(e.to_string())
        } else if let Some(status) = e.status() {
            ClientError::Status {
                url,
                status: status.as_u16(),
            }
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

/// Mask Bot API credentials (`/bot<id>:<secret>/...`) in a request path.
fn redact_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with("bot") && segment.contains(':') {
                "bot<redacted>"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Every retry attempt failed.
#[derive(Debug, Error)]
#[error("giving up after {attempts} attempts: {last}")]
pub struct Exhausted {
    pub attempts: u32,
    pub last: ClientError,
}

pub type ClientResult<T> = Result<T, ClientError>;
