//! REST client for the controller's status endpoints.
//!
//! Wraps the three polled endpoints (heartbeat, active job, progress)
//! using [`reqwest`]. Every call resolves to a [`SourceResult`]; HTTP
//! error statuses are passed through untouched for the normalizers to
//! classify.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL};

use crate::source::{RawResponse, SourceClient, SourceKind, SourceResult, TransportFailure};

/// Default path of the heartbeat endpoint under the API base URL.
pub const HEARTBEAT_PATH: &str = "/status/last";

/// Default path of the active-job endpoint under the API base URL.
pub const JOB_PATH: &str = "/toDo";

/// Default path of the progress endpoint under the API base URL.
pub const PROGRESS_PATH: &str = "/progress";

/// Full URLs of the three sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub heartbeat: String,
    pub job: String,
    pub progress: String,
}

impl Endpoints {
    /// Derive all three URLs from an API base such as
    /// `http://host:8000/api/mcp101`.
    pub fn from_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            heartbeat: format!("{base}{HEARTBEAT_PATH}"),
            job: format!("{base}{JOB_PATH}"),
            progress: format!("{base}{PROGRESS_PATH}"),
        }
    }

    pub fn url(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Heartbeat => &self.heartbeat,
            SourceKind::Job => &self.job,
            SourceKind::Progress => &self.progress,
        }
    }
}

/// HTTP client for one controller's status API.
pub struct ControllerApi {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl ControllerApi {
    /// Create a client whose requests give up after `timeout`.
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoints })
    }

    /// Issue the request for `kind` and read the full body.
    ///
    /// The heartbeat is a `GET`; the job and progress endpoints expect an
    /// empty `POST`.
    async fn request(&self, kind: SourceKind) -> Result<RawResponse, TransportFailure> {
        let url = self.endpoints.url(kind);
        let builder = match kind {
            SourceKind::Heartbeat => self.client.get(url),
            SourceKind::Job | SourceKind::Progress => self.client.post(url).body(""),
        };

        let response = builder
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

#[async_trait]
impl SourceClient for ControllerApi {
    async fn fetch(&self, kind: SourceKind) -> SourceResult {
        match self.request(kind).await {
            Ok(raw) => {
                tracing::trace!(source = %kind, status = raw.status, "Source responded");
                SourceResult::Fetched(raw)
            }
            Err(e) => {
                tracing::warn!(source = %kind, error = %e, "Source fetch failed");
                SourceResult::Failed(e)
            }
        }
    }
}
