//! Merging of the three per-cycle source results into the next
//! [`MergedState`].
//!
//! [`Reconciler::reconcile`] is pure: it reads the previous state and the
//! normalized inputs and returns a fresh value. The job source anchors
//! everything else. A job failure is fatal and wipes the state; heartbeat
//! and progress failures are recorded as non-fatal issues and fall back
//! to fail-safe values.

use std::time::Duration;

use crate::error::SourceError;
use crate::model::{HeartbeatSample, JobDescriptor, MergedState, ProgressSample, SourceKind};
use crate::types::{Normalized, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// A heartbeat older than this many seconds means the device is offline.
pub const DEFAULT_ONLINE_THRESHOLD_SECS: u64 = 7;

/// Upper bound on the non-fatal issues kept for a single cycle.
pub const MAX_NON_FATAL_ISSUES: usize = 8;

/// Recorded when a job that was present last cycle is gone this cycle.
pub const JOB_CLEARED_REMOTELY: &str = "job completed or cleared remotely";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Exactly one normalized result per source for one cycle.
#[derive(Debug, Clone)]
pub struct CycleInputs {
    pub heartbeat: Normalized<HeartbeatSample>,
    /// `Ok(None)` is valid-absence: the source confirmed there is no job.
    pub job: Normalized<Option<JobDescriptor>>,
    pub progress: Normalized<ProgressSample>,
}

/// `true` when the job identity differs between two cycles, including a
/// job appearing or disappearing.
pub fn job_identity_changed(
    previous: Option<&JobDescriptor>,
    next: Option<&JobDescriptor>,
) -> bool {
    match (previous, next) {
        (None, None) => false,
        (Some(a), Some(b)) => !a.same_job(b),
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Stateless merge policy, parameterised by the heartbeat staleness window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciler {
    online_threshold_secs: i64,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_ONLINE_THRESHOLD_SECS))
    }
}

impl Reconciler {
    /// Sub-second precision is dropped; heartbeats carry whole seconds.
    pub fn new(online_threshold: Duration) -> Self {
        Self {
            online_threshold_secs: i64::try_from(online_threshold.as_secs()).unwrap_or(i64::MAX),
        }
    }

    pub fn online_threshold_secs(&self) -> i64 {
        self.online_threshold_secs
    }

    /// Whether a heartbeat stamped `device_time_seconds` counts as live at
    /// `now`. A device clock ahead of ours counts as offline.
    pub fn is_fresh(&self, device_time_seconds: i64, now: Timestamp) -> bool {
        let delta = now.timestamp().saturating_sub(device_time_seconds);
        (0..self.online_threshold_secs).contains(&delta)
    }

    /// Compute the state that replaces `previous` after one cycle.
    pub fn reconcile(
        &self,
        previous: &MergedState,
        inputs: &CycleInputs,
        now: Timestamp,
    ) -> MergedState {
        let job = match &inputs.job {
            Ok(job) => job.clone(),
            Err(err) => return Self::fatal(err.clone()),
        };

        let mut issues = IssueList::default();

        let (device_online, last_heartbeat_at_ms, device_details) = match &inputs.heartbeat {
            Ok(hb) => (
                self.is_fresh(hb.device_time_seconds, now),
                Some(hb.device_time_seconds.saturating_mul(1000)),
                hb.details.clone(),
            ),
            Err(err) => {
                issues.record(SourceKind::Heartbeat, err);
                (false, None, Vec::new())
            }
        };

        let changed = job_identity_changed(previous.job.as_ref(), job.as_ref());

        let progress_percent = match (&job, &inputs.progress) {
            (None, _) => {
                if previous.job.is_some() {
                    issues.note(JOB_CLEARED_REMOTELY);
                }
                0
            }
            (Some(_), Ok(sample)) => sample.percent(),
            (Some(_), Err(err)) => {
                issues.record(SourceKind::Progress, err);
                if changed {
                    0
                } else {
                    previous.progress_percent.min(100)
                }
            }
        };

        MergedState {
            job,
            progress_percent,
            device_online,
            last_heartbeat_at_ms,
            device_details,
            non_fatal_issues: issues.into_vec(),
            fatal_error: None,
        }
    }

    /// Nothing job-dependent survives a fatal job failure.
    fn fatal(err: SourceError) -> MergedState {
        MergedState {
            fatal_error: Some(err),
            ..MergedState::default()
        }
    }
}

/// Deduplicated, capped list of this cycle's non-fatal issues.
#[derive(Default)]
struct IssueList(Vec<String>);

impl IssueList {
    fn record(&mut self, source: SourceKind, err: &SourceError) {
        self.note(&format!("{source}: {err}"));
    }

    fn note(&mut self, message: &str) {
        if self.0.len() < MAX_NON_FATAL_ISSUES && !self.0.iter().any(|m| m == message) {
            self.0.push(message.to_string());
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
