//! Display status derived from a [`MergedState`].
//!
//! The status is never stored. It is recomputed from the latest state on
//! every cycle, so any status can follow any other except `Loading`,
//! which only exists before the first cycle completes.

use std::fmt;

use serde::Serialize;

use crate::model::MergedState;

/// What the display layer should show for the current job slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedStatus {
    /// No cycle has completed yet.
    Loading,
    /// The controller has no job assigned.
    Idle,
    /// A job is assigned and the device heartbeat is fresh.
    Running,
    /// A job is assigned but the device looks offline.
    Paused,
    /// The job reports 100% progress.
    Completed,
    /// The job source failed; nothing else is trustworthy.
    Error,
}

impl DerivedStatus {
    /// Human-readable badge text.
    pub fn label(self) -> &'static str {
        match self {
            Self::Loading => "Loading...",
            Self::Idle => "Idle",
            Self::Running => "In Progress",
            Self::Paused => "Paused",
            Self::Completed => "Completed",
            Self::Error => "Error",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for DerivedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a merged state to its display status.
///
/// Precedence: loading, error, idle, completed, then running/paused by
/// heartbeat freshness. A finished job stays `Completed` even when the
/// device has gone quiet.
pub fn derive(state: &MergedState, first_cycle_done: bool) -> DerivedStatus {
    if !first_cycle_done {
        return DerivedStatus::Loading;
    }
    if state.fatal_error.is_some() {
        return DerivedStatus::Error;
    }
    if state.job.is_none() {
        return DerivedStatus::Idle;
    }
    if state.progress_percent >= 100 {
        return DerivedStatus::Completed;
    }
    if state.device_online {
        DerivedStatus::Running
    } else {
        DerivedStatus::Paused
    }
}

// ---------------------------------------------------------------------------
// Details panel hint
// ---------------------------------------------------------------------------

/// Instruction for an expandable job-details panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailsHint {
    /// Close the panel; its content no longer applies.
    Collapse,
    /// Leave the panel as the user left it.
    Keep,
}

impl DetailsHint {
    pub fn for_cycle(job_changed: bool, status: DerivedStatus) -> Self {
        let closes = matches!(
            status,
            DerivedStatus::Idle | DerivedStatus::Error | DerivedStatus::Completed
        );
        if job_changed || closes {
            Self::Collapse
        } else {
            Self::Keep
        }
    }
}

/// Whether the display may offer to expand job details right now.
pub fn can_expand_details(state: &MergedState, status: DerivedStatus) -> bool {
    state.job.is_some()
        && matches!(
            status,
            DerivedStatus::Running | DerivedStatus::Paused | DerivedStatus::Completed
        )
}
