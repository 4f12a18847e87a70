//! Logging observer for [`StatusUpdate`]s.
//!
//! Only transitions are logged at `info` and above; an unchanged cycle
//! produces a single `debug` line.

use wirecut_core::error::SourceError;
use wirecut_core::status::{can_expand_details, DerivedStatus};

use crate::scheduler::StatusUpdate;

/// What changed between the previous update and this one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transition {
    pub status_changed: bool,
    pub job_changed: bool,
    pub issues_changed: bool,
    pub online_changed: bool,
    pub fatal_changed: bool,
}

impl Transition {
    pub fn is_quiet(&self) -> bool {
        *self == Self::default()
    }
}

/// Remembers the last update it saw so it can report differences.
#[derive(Debug, Default)]
pub struct StatusReporter {
    last_status: Option<DerivedStatus>,
    last_job_id: Option<String>,
    last_issues: Vec<String>,
    last_online: Option<bool>,
    last_fatal: Option<SourceError>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, update: &StatusUpdate) -> Transition {
        let state = &update.state;
        let job_id = state.job_id().map(str::to_owned);

        let transition = Transition {
            status_changed: self.last_status != Some(update.status),
            job_changed: self.last_job_id != job_id,
            issues_changed: self.last_issues != state.non_fatal_issues,
            online_changed: self.last_online != Some(state.device_online),
            fatal_changed: self.last_fatal != state.fatal_error,
        };

        if transition.fatal_changed {
            if let Some(err) = &state.fatal_error {
                tracing::error!(
                    cycle = update.cycle,
                    error = %err,
                    "Status unavailable: job source failed"
                );
            }
        }

        if transition.status_changed && state.fatal_error.is_none() {
            tracing::info!(
                cycle = update.cycle,
                status = %update.status,
                label = update.status.label(),
                progress = state.progress_percent,
                "Status changed"
            );
        }

        if transition.job_changed {
            match &state.job {
                Some(job) => tracing::info!(
                    job_id = %job.job_id,
                    title = %job.title,
                    quantity = %job.quantity,
                    length = %job.length,
                    stripping = %job.stripping,
                    expandable = can_expand_details(state, update.status),
                    "Active job"
                ),
                None => tracing::info!(previous = ?self.last_job_id, "No active job"),
            }
        }

        if transition.online_changed {
            tracing::info!(
                online = state.device_online,
                last_heartbeat_at_ms = ?state.last_heartbeat_at_ms,
                "Device connectivity changed"
            );
        }

        if transition.issues_changed {
            for issue in &state.non_fatal_issues {
                tracing::warn!(cycle = update.cycle, issue = %issue, "Degraded source");
            }
            if state.non_fatal_issues.is_empty() && !self.last_issues.is_empty() {
                tracing::info!(cycle = update.cycle, "All sources healthy again");
            }
        }

        if transition.is_quiet() {
            tracing::debug!(
                cycle = update.cycle,
                status = %update.status,
                progress = state.progress_percent,
                "No change"
            );
        }

        self.last_status = Some(update.status);
        self.last_job_id = job_id;
        self.last_issues.clone_from(&state.non_fatal_issues);
        self.last_online = Some(state.device_online);
        self.last_fatal.clone_from(&state.fatal_error);

        transition
    }
}
