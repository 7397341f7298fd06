use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned by the GitHub client.
#[derive(Debug, Error)]
pub enum GithubError {
    /// The request could not be sent or the response not read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub answered with a non-success status.
    #[error("GitHub API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The rate limit is exhausted until `reset`.
    #[error("GitHub rate limit exceeded{}", .reset.map(|r| format!(" until {r}")).unwrap_or_default())]
    RateLimited { reset: Option<DateTime<Utc>> },

    #[error("decoding GitHub response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A listed item lacks what identifies it.
    #[error("malformed GitHub item: {0}")]
    MalformedItem(String),
}
