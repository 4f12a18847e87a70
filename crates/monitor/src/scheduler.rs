//! Periodic reconciliation driver.
//!
//! One cycle fetches all three sources concurrently, normalizes them,
//! reconciles against the previous state and hands a [`StatusUpdate`] to
//! the observer. Cycles never overlap: a tick that fires while a cycle is
//! still in flight is skipped, so a slow controller lowers the effective
//! poll rate instead of piling up requests.
//!
//! The driver runs as a spawned task and owns the merged state. Callers
//! only ever see immutable snapshots.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use wirecut_core::model::MergedState;
use wirecut_core::reconcile::{job_identity_changed, CycleInputs, Reconciler};
use wirecut_core::status::{derive, DerivedStatus, DetailsHint};
use wirecut_sources::normalize::{normalize_heartbeat, normalize_job, normalize_progress};
use wirecut_sources::source::{SourceClient, SourceKind};

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

/// Result of one completed cycle, as delivered to the observer.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    /// 1-based count of completed cycles.
    pub cycle: u64,
    pub state: Arc<MergedState>,
    pub status: DerivedStatus,
    pub details: DetailsHint,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Shortest accepted poll interval; shorter values are raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls the status sources on a fixed cadence.
pub struct Scheduler {
    client: Arc<dyn SourceClient>,
    reconciler: Reconciler,
    interval: Duration,
}

impl Scheduler {
    /// `interval` is raised to [`MIN_POLL_INTERVAL`] when shorter.
    pub fn new(client: Arc<dyn SourceClient>, reconciler: Reconciler, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                min_ms = MIN_POLL_INTERVAL.as_millis() as u64,
                "Poll interval too short, using minimum"
            );
        }
        let interval = interval.max(MIN_POLL_INTERVAL);
        Self {
            client,
            reconciler,
            interval,
        }
    }

    /// Start polling. The first cycle begins immediately.
    ///
    /// `on_update` runs on the driver task once per completed cycle and is
    /// never invoked after [`StopHandle::stop`] returns.
    pub fn start<F>(self, on_update: F) -> StopHandle
    where
        F: FnMut(StatusUpdate) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(on_update, cancel.clone()));
        StopHandle { cancel, task }
    }

    async fn run<F>(self, mut on_update: F, cancel: CancellationToken)
    where
        F: FnMut(StatusUpdate) + Send + 'static,
    {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            online_threshold_secs = self.reconciler.online_threshold_secs(),
            "Status scheduler started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut state = Arc::new(MergedState::default());
        let mut in_flight: Option<JoinHandle<CycleInputs>> = None;
        let mut first_cycle_done = false;
        let mut cycle: u64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tracing::info!(cycles = cycle, "Status scheduler stopping");
                    break;
                }
                joined = settle(&mut in_flight) => {
                    in_flight = None;
                    let inputs = match joined {
                        Ok(inputs) => inputs,
                        Err(e) => {
                            tracing::error!(error = %e, "Fetch task failed, cycle dropped");
                            continue;
                        }
                    };

                    // A result that lands after stop() was requested is discarded.
                    if cancel.is_cancelled() {
                        break;
                    }

                    cycle += 1;
                    let next = self.reconciler.reconcile(&state, &inputs, Utc::now());
                    first_cycle_done = true;

                    let status = derive(&next, first_cycle_done);
                    let job_changed = job_identity_changed(state.job.as_ref(), next.job.as_ref());
                    let details = DetailsHint::for_cycle(job_changed, status);
                    state = Arc::new(next);

                    tracing::debug!(cycle, status = %status, "Cycle complete");
                    on_update(StatusUpdate {
                        cycle,
                        state: Arc::clone(&state),
                        status,
                        details,
                    });
                }
                _ = ticker.tick() => {
                    if in_flight.is_some() {
                        tracing::debug!(cycle, "Previous cycle still in flight, skipping tick");
                    } else {
                        in_flight = Some(spawn_fetch(Arc::clone(&self.client)));
                    }
                }
            }
        }
    }
}

/// Wait for the in-flight cycle, or forever when there is none.
async fn settle(
    in_flight: &mut Option<JoinHandle<CycleInputs>>,
) -> Result<CycleInputs, JoinError> {
    match in_flight {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

/// Fetch and normalize all three sources concurrently.
///
/// Runs detached from the driver so that stopping never aborts a request
/// mid-flight; its result is simply dropped.
fn spawn_fetch(client: Arc<dyn SourceClient>) -> JoinHandle<CycleInputs> {
    tokio::spawn(async move {
        let (heartbeat, job, progress) = tokio::join!(
            client.fetch(SourceKind::Heartbeat),
            client.fetch(SourceKind::Job),
            client.fetch(SourceKind::Progress),
        );
        CycleInputs {
            heartbeat: normalize_heartbeat(heartbeat),
            job: normalize_job(job),
            progress: normalize_progress(progress),
        }
    })
}

// ---------------------------------------------------------------------------
// Stop handle
// ---------------------------------------------------------------------------

/// Controls a running [`Scheduler`]. Dropping the handle also stops it.
pub struct StopHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl StopHandle {
    /// Stop polling and wait for the driver to exit.
    ///
    /// Idempotent in effect: the driver observes cancellation at most once.
    /// A cycle still in flight runs to completion in the background but
    /// its result is discarded.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Err(e) = (&mut self.task).await {
            tracing::error!(error = %e, "Status scheduler task ended abnormally");
        }
    }
}

impl Drop for StopHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
