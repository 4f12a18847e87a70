//! The fetch seam between the engine and the outside world.
//!
//! A [`SourceClient`] performs one request against one source and hands
//! back a [`SourceResult`]. It never returns an error type: every failure
//! is captured in [`SourceResult::Failed`] so a cycle always receives
//! exactly one result per source.

use async_trait::async_trait;

pub use wirecut_core::model::SourceKind;

/// A response that made it back over HTTP, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure below the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportFailure {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// No connection could be established (DNS, refused, TLS).
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other request or body-read failure.
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Outcome of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceResult {
    Fetched(RawResponse),
    Failed(TransportFailure),
}

/// Performs single fetches against the three sources.
///
/// Implementations hold no memory of earlier fetches and do not retry;
/// the next scheduled cycle is the retry.
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn fetch(&self, kind: SourceKind) -> SourceResult;
}
