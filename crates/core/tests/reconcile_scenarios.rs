//! Multi-cycle reconciliation scenarios, run through both the reconciler
//! and the status deriver the way the scheduler chains them.

use assert_matches::assert_matches;
use chrono::TimeZone;

use wirecut_core::error::{SourceError, BAD_JOB_FORMAT, BAD_PROGRESS_FORMAT};
use wirecut_core::model::{HeartbeatSample, JobDescriptor, Measure, MergedState, ProgressSample};
use wirecut_core::reconcile::{CycleInputs, Reconciler};
use wirecut_core::status::{derive, DerivedStatus};
use wirecut_core::types::{Normalized, Timestamp};

const NOW_SECS: i64 = 1_720_000_000;

fn now() -> Timestamp {
    chrono::Utc.timestamp_opt(NOW_SECS, 0).unwrap()
}

fn job(id: &str) -> JobDescriptor {
    JobDescriptor {
        job_id: id.to_string(),
        title: "Panel loom".into(),
        description: "Blue 22AWG".into(),
        quantity: Measure::Number(25.0),
        length: Measure::Number(300.0),
        stripping: Measure::Text("8".into()),
    }
}

fn fresh_heartbeat() -> Normalized<HeartbeatSample> {
    Ok(HeartbeatSample::at(NOW_SECS - 2))
}

fn cycle(
    job: Normalized<Option<JobDescriptor>>,
    progress: Normalized<ProgressSample>,
) -> CycleInputs {
    CycleInputs {
        heartbeat: fresh_heartbeat(),
        job,
        progress,
    }
}

/// Run one cycle and derive the status as a scheduler past cycle 1 would.
fn step(previous: &MergedState, inputs: CycleInputs) -> (MergedState, DerivedStatus) {
    let next = Reconciler::default().reconcile(previous, &inputs, now());
    let status = derive(&next, true);
    (next, status)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn new_job_with_progress_is_running() {
    let (state, status) = step(
        &MergedState::default(),
        cycle(Ok(Some(job("J1"))), Ok(ProgressSample::clamped(0.42))),
    );

    assert_eq!(state.job_id(), Some("J1"));
    assert_eq!(state.progress_percent, 42);
    assert!(state.device_online);
    assert_eq!(status, DerivedStatus::Running);
}

#[test]
fn transient_progress_drop_keeps_percentage() {
    let (first, _) = step(
        &MergedState::default(),
        cycle(Ok(Some(job("J1"))), Ok(ProgressSample::clamped(0.8))),
    );
    assert_eq!(first.progress_percent, 80);

    let (second, status) = step(
        &first,
        cycle(
            Ok(Some(job("J1"))),
            Err(SourceError::transport("connection reset")),
        ),
    );

    assert_eq!(second.progress_percent, 80);
    assert_eq!(status, DerivedStatus::Running);
    assert!(second.is_degraded());
}

#[test]
fn job_disappearing_goes_idle() {
    let (first, _) = step(
        &MergedState::default(),
        cycle(Ok(Some(job("J1"))), Ok(ProgressSample::clamped(0.6))),
    );
    let (second, status) = step(&first, cycle(Ok(None), Ok(ProgressSample::clamped(0.6))));

    assert!(second.job.is_none());
    assert_eq!(second.progress_percent, 0);
    assert_eq!(status, DerivedStatus::Idle);
}

#[test]
fn job_timeout_is_error_whatever_else_happens() {
    let previous = MergedState {
        job: Some(job("J1")),
        progress_percent: 35,
        device_online: true,
        ..MergedState::default()
    };

    for progress in [
        Ok(ProgressSample::clamped(0.5)),
        Err(SourceError::decode(BAD_PROGRESS_FORMAT)),
    ] {
        let mut inputs = cycle(Err(SourceError::transport("operation timed out")), progress);
        inputs.heartbeat = fresh_heartbeat();
        let (state, status) = step(&previous, inputs);

        assert_matches!(state.fatal_error, Some(SourceError::Transport { .. }));
        assert!(state.job.is_none());
        assert_eq!(state.progress_percent, 0);
        assert!(!state.device_online);
        assert_eq!(status, DerivedStatus::Error);
    }
}

#[test]
fn full_progress_is_completed_even_online() {
    let (state, status) = step(
        &MergedState::default(),
        cycle(Ok(Some(job("J1"))), Ok(ProgressSample::clamped(1.0))),
    );
    assert!(state.device_online);
    assert_eq!(status, DerivedStatus::Completed);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn percent_always_in_range_and_rounded() {
    let fractions = [
        -3.0, -0.01, 0.0, 0.004, 0.006, 0.25, 0.5, 0.42, 0.75, 0.999, 1.0, 1.2, 80.0,
    ];
    for f in fractions {
        let (state, _) = step(
            &MergedState::default(),
            cycle(Ok(Some(job("J1"))), Ok(ProgressSample::clamped(f))),
        );
        let expected = (f.clamp(0.0, 1.0) * 100.0).round() as u8;
        assert!(state.progress_percent <= 100, "fraction {f}");
        assert_eq!(state.progress_percent, expected, "fraction {f}");
    }
}

#[test]
fn switching_jobs_never_inherits_old_percentage() {
    let previous = MergedState {
        job: Some(job("J1")),
        progress_percent: 90,
        device_online: true,
        ..MergedState::default()
    };

    let (valid, _) = step(
        &previous,
        cycle(Ok(Some(job("J2"))), Ok(ProgressSample::clamped(0.1))),
    );
    assert_eq!(valid.progress_percent, 10);

    let (failed, status) = step(
        &previous,
        cycle(Ok(Some(job("J2"))), Err(SourceError::transport("refused"))),
    );
    assert_eq!(failed.progress_percent, 0);
    assert_eq!(status, DerivedStatus::Running);
}

#[test]
fn fatal_then_valid_job_recovers() {
    let (broken, status) = step(
        &MergedState::default(),
        cycle(
            Err(SourceError::decode(BAD_JOB_FORMAT)),
            Ok(ProgressSample::clamped(0.2)),
        ),
    );
    assert_eq!(status, DerivedStatus::Error);

    let (healed, status) = step(
        &broken,
        cycle(Ok(Some(job("J3"))), Ok(ProgressSample::clamped(0.2))),
    );
    assert!(healed.fatal_error.is_none());
    assert_eq!(healed.progress_percent, 20);
    assert_eq!(status, DerivedStatus::Running);
}

#[test]
fn stale_heartbeat_pauses_job() {
    let inputs = CycleInputs {
        heartbeat: Ok(HeartbeatSample::at(NOW_SECS - 60)),
        job: Ok(Some(job("J1"))),
        progress: Ok(ProgressSample::clamped(0.3)),
    };
    let (state, status) = step(&MergedState::default(), inputs);
    assert!(!state.device_online);
    assert!(state.non_fatal_issues.is_empty());
    assert_eq!(status, DerivedStatus::Paused);
}
