//! JSON shapes returned by the controller API.
//!
//! These mirror the wire format only. Conversion into domain values and
//! the absence rules live in [`normalize`](crate::normalize).

use serde::Deserialize;
use wirecut_core::model::{DeviceDetail, Measure};

/// `GET /status/last` body.
#[derive(Debug, Deserialize)]
pub struct HeartbeatPayload {
    /// Device clock in seconds since the Unix epoch; may be fractional.
    pub time: f64,
    /// Free-form device information rows. Kept loose so a bad row does
    /// not invalidate the heartbeat itself.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// One `{"label": ..., "info": ...}` row of heartbeat device data.
#[derive(Debug, Deserialize)]
pub struct DetailRow {
    pub label: String,
    #[serde(default)]
    pub info: Option<serde_json::Value>,
}

impl From<DetailRow> for DeviceDetail {
    fn from(row: DetailRow) -> Self {
        let info = match row.info {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };
        DeviceDetail {
            label: row.label,
            info,
        }
    }
}

/// Job identifiers are creation timestamps and arrive as either JSON
/// numbers or strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum JobIdPayload {
    Text(String),
    Number(serde_json::Number),
}

impl JobIdPayload {
    pub fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

/// A numeric-or-text job parameter.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MeasurePayload {
    Number(f64),
    Text(String),
}

impl From<MeasurePayload> for Measure {
    fn from(m: MeasurePayload) -> Self {
        match m {
            MeasurePayload::Number(n) => Measure::Number(n),
            MeasurePayload::Text(s) => Measure::Text(s),
        }
    }
}

/// One element of the `POST /toDo` array.
///
/// The queue stores quantity, length and stripping in columns named
/// `a`, `b` and `c`; the descriptive names are accepted as well.
#[derive(Debug, Deserialize)]
pub struct JobPayload {
    pub jobid: JobIdPayload,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "quantity")]
    pub a: MeasurePayload,
    #[serde(alias = "length")]
    pub b: MeasurePayload,
    #[serde(alias = "stripping")]
    pub c: MeasurePayload,
}

/// `POST /progress` body.
#[derive(Debug, Deserialize)]
pub struct ProgressPayload {
    #[serde(alias = "fraction")]
    pub output: f64,
}

/// FastAPI-style error body: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
pub struct ErrorPayload {
    pub detail: serde_json::Value,
}
