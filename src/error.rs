//! Error types shared by the remote client, source fetcher and reconciler.

use std::time::Duration;
use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Connection failure or 5xx; retried by the client.
    #[error("transient failure: {0}")]
    Transient(String),

    /// 429 from the gateway API; retried after `retry_after` or the computed backoff.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Non-2xx response or `success: false` envelope.
    #[error("API error during {action}: {status} - {message}")]
    Api {
        action: String,
        status: u16,
        message: String,
    },

    #[error("{method} {path} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        method: String,
        path: String,
        attempts: u32,
        last_error: String,
    },

    #[error("inconsistent pagination for {path}: {reason}")]
    Pagination { path: String, reason: String },

    /// Every configured URL of a source failed.
    #[error("could not fetch {name} from any URL ({})", .attempts.join("; "))]
    Fetch {
        name: String,
        attempts: Vec<String>,
    },

    #[error("no valid domains found in {name}")]
    Validation { name: String },

    #[error("unexpected response body during {action}: {reason}")]
    Decode { action: String, reason: String },

    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transient(_) | SyncError::RateLimited { .. } => true,
            SyncError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }

    /// True for an API error carrying a 404 status.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::Api { status: 404, .. })
    }
}

/// Failure reading or writing the version cache. Never fatal to a run.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("version cache IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("version cache at {path} is not valid JSON: {source}")]
    Format {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
