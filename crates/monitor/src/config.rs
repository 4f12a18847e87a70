use std::time::Duration;

use wirecut_core::reconcile::{Reconciler, DEFAULT_ONLINE_THRESHOLD_SECS};
use wirecut_sources::api::Endpoints;

/// Default base URL of the controller status API.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/mcp101";

/// Default polling cadence.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default per-request timeout. Bounds how long one cycle can stay in flight.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

/// A configuration value that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{var}={value:?} is invalid: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: &'static str,
}

/// Monitor configuration loaded from environment variables.
///
/// All fields have defaults suitable for a controller API on localhost.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// URLs of the heartbeat, job and progress sources.
    pub endpoints: Endpoints,
    /// Time between cycle starts.
    pub poll_interval: Duration,
    /// Heartbeat staleness window.
    pub online_threshold: Duration,
    /// Timeout applied to every source request.
    pub request_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::from_base(DEFAULT_API_URL),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            online_threshold: Duration::from_secs(DEFAULT_ONLINE_THRESHOLD_SECS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                 | Default                            |
    /// |-------------------------|------------------------------------|
    /// | `CONTROLLER_API_URL`    | `http://localhost:8000/api/mcp101` |
    /// | `HEARTBEAT_URL`         | `{base}/status/last`               |
    /// | `JOB_URL`               | `{base}/toDo`                      |
    /// | `PROGRESS_URL`          | `{base}/progress`                  |
    /// | `POLL_INTERVAL_MS`      | `1000`                             |
    /// | `ONLINE_THRESHOLD_SECS` | `7`                                |
    /// | `REQUEST_TIMEOUT_MS`    | `5000`                             |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match lookup("CONTROLLER_API_URL") {
            Some(url) => require_http_url("CONTROLLER_API_URL", url)?,
            None => DEFAULT_API_URL.to_string(),
        };
        let mut endpoints = Endpoints::from_base(&base);

        if let Some(url) = lookup("HEARTBEAT_URL") {
            endpoints.heartbeat = require_http_url("HEARTBEAT_URL", url)?;
        }
        if let Some(url) = lookup("JOB_URL") {
            endpoints.job = require_http_url("JOB_URL", url)?;
        }
        if let Some(url) = lookup("PROGRESS_URL") {
            endpoints.progress = require_http_url("PROGRESS_URL", url)?;
        }

        let poll_interval_ms =
            positive_u64(&lookup, "POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        let online_threshold_secs =
            positive_u64(&lookup, "ONLINE_THRESHOLD_SECS", DEFAULT_ONLINE_THRESHOLD_SECS)?;
        let request_timeout_ms =
            positive_u64(&lookup, "REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?;

        Ok(Self {
            endpoints,
            poll_interval: Duration::from_millis(poll_interval_ms),
            online_threshold: Duration::from_secs(online_threshold_secs),
            request_timeout: Duration::from_millis(request_timeout_ms),
        })
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.online_threshold)
    }
}

fn require_http_url(var: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(ConfigError {
            var,
            value,
            reason: "must be an http:// or https:// URL",
        })
    }
}

fn positive_u64<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError {
            var,
            value: raw,
            reason: "must be greater than zero",
        }),
        Ok(n) => Ok(n),
        Err(_) => Err(ConfigError {
            var,
            value: raw,
            reason: "must be a whole number",
        }),
    }
}
