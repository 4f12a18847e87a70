//! Domain values exchanged between the sources, the reconciler, and
//! observers.

use std::fmt;

use serde::Serialize;

use crate::error::SourceError;

// ---------------------------------------------------------------------------
// Source kinds
// ---------------------------------------------------------------------------

/// The three independently polled data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Heartbeat,
    Job,
    Progress,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heartbeat => "heartbeat",
            Self::Job => "job",
            Self::Progress => "progress",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

/// One labelled row of device information reported with a heartbeat
/// (IP address, MAC address, firmware mode, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDetail {
    pub label: String,
    pub info: Option<String>,
}

/// Liveness signal from the controller, stamped with the device's own
/// clock. Only meaningful relative to the poller's wall clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartbeatSample {
    pub device_time_seconds: i64,
    pub details: Vec<DeviceDetail>,
}

impl HeartbeatSample {
    pub fn at(device_time_seconds: i64) -> Self {
        Self {
            device_time_seconds,
            details: Vec::new(),
        }
    }

    /// Look up a detail row by its exact label.
    pub fn detail(&self, label: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|d| d.label == label)
            .and_then(|d| d.info.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Job descriptor
// ---------------------------------------------------------------------------

/// A job parameter the upstream stores as either a number or free text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Measure {
    Number(f64),
    Text(String),
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// The single job currently assigned to the controller.
///
/// Identity is `job_id` alone: two descriptors with different ids are
/// different jobs even when every other field matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobDescriptor {
    pub job_id: String,
    pub title: String,
    pub description: String,
    /// Number of pieces to cut.
    pub quantity: Measure,
    /// Length of each piece.
    pub length: Measure,
    /// Insulation stripping setting.
    pub stripping: Measure,
}

impl JobDescriptor {
    pub fn same_job(&self, other: &JobDescriptor) -> bool {
        self.job_id == other.job_id
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Completion fraction reported for the current job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressSample {
    pub fraction: f64,
}

impl ProgressSample {
    /// Build a sample, clamping the fraction into `0.0..=1.0`.
    ///
    /// Callers must reject non-finite values before getting here.
    pub fn clamped(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    /// Whole-number percentage in `0..=100`.
    pub fn percent(&self) -> u8 {
        percent_from_fraction(self.fraction)
    }
}

/// `round(clamp(fraction, 0, 1) * 100)`. NaN maps to 0.
pub fn percent_from_fraction(fraction: f64) -> u8 {
    if fraction.is_nan() {
        return 0;
    }
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
}

// ---------------------------------------------------------------------------
// Merged state
// ---------------------------------------------------------------------------

/// The engine's single owned record, replaced wholesale every cycle.
///
/// Invariants maintained by [`Reconciler`](crate::reconcile::Reconciler):
/// - `progress_percent` is in `0..=100`, and is 0 whenever `job` is `None`.
/// - when `fatal_error` is set, `job` is `None`, the device is reported
///   offline, and `non_fatal_issues` is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedState {
    pub job: Option<JobDescriptor>,
    pub progress_percent: u8,
    pub device_online: bool,
    pub last_heartbeat_at_ms: Option<i64>,
    pub device_details: Vec<DeviceDetail>,
    pub non_fatal_issues: Vec<String>,
    pub fatal_error: Option<SourceError>,
}

impl MergedState {
    pub fn job_id(&self) -> Option<&str> {
        self.job.as_ref().map(|j| j.job_id.as_str())
    }

    /// Data is shown but at least one secondary source misbehaved.
    pub fn is_degraded(&self) -> bool {
        self.fatal_error.is_none() && !self.non_fatal_issues.is_empty()
    }
}
