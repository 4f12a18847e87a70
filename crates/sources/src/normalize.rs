//! Validation and decoding of raw source results.
//!
//! One function per source. Each maps a [`SourceResult`] to a
//! [`Normalized`] value: the typed domain value, or a [`SourceError`]
//! classified here once so nothing downstream has to inspect messages.
//! Transport failures pass straight through without any decoding.

use serde_json::Value;
use wirecut_core::error::{
    SourceError, BAD_HEARTBEAT_FORMAT, BAD_JOB_FORMAT, BAD_PROGRESS_FORMAT,
};
use wirecut_core::model::{DeviceDetail, HeartbeatSample, JobDescriptor, ProgressSample};
use wirecut_core::types::Normalized;

use crate::payloads::{DetailRow, ErrorPayload, HeartbeatPayload, JobPayload, ProgressPayload};
use crate::source::{RawResponse, SourceResult};

/// HTTP status the job endpoint uses to say "no job queued".
pub const JOB_NOT_FOUND_STATUS: u16 = 404;

/// Longest error body carried into a [`SourceError::Http`] detail.
const MAX_DETAIL_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

/// Decode a heartbeat. The payload must carry a numeric `time`.
pub fn normalize_heartbeat(result: SourceResult) -> Normalized<HeartbeatSample> {
    let raw = require_success(result)?;
    let payload: HeartbeatPayload = serde_json::from_str(&raw.body)
        .map_err(|_| SourceError::decode(BAD_HEARTBEAT_FORMAT))?;

    if !payload.time.is_finite() || payload.time.abs() > i64::MAX as f64 {
        return Err(SourceError::decode(BAD_HEARTBEAT_FORMAT));
    }

    Ok(HeartbeatSample {
        device_time_seconds: payload.time.floor() as i64,
        details: decode_details(payload.data),
    })
}

/// Keep every well-formed detail row and drop the rest.
fn decode_details(data: Option<Value>) -> Vec<DeviceDetail> {
    match data {
        Some(Value::Array(rows)) => rows
            .into_iter()
            .filter_map(|row| serde_json::from_value::<DetailRow>(row).ok())
            .map(DeviceDetail::from)
            .collect(),
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Decode the active-job response.
///
/// Two encodings mean "no job" and yield `Ok(None)`: a 404 status, and a
/// well-formed empty result (`null`, `[]`, or a first element without a
/// job id). A present job with the wrong field types is a decode failure.
pub fn normalize_job(result: SourceResult) -> Normalized<Option<JobDescriptor>> {
    let raw = match result {
        SourceResult::Fetched(raw) if raw.status == JOB_NOT_FOUND_STATUS => return Ok(None),
        other => require_success(other)?,
    };

    let value: Value =
        serde_json::from_str(&raw.body).map_err(|_| SourceError::decode(BAD_JOB_FORMAT))?;

    let candidate = match value {
        Value::Null => return Ok(None),
        Value::Array(items) => match items.into_iter().next() {
            None => return Ok(None),
            Some(first @ Value::Object(_)) => first,
            Some(_) => return Err(SourceError::decode(BAD_JOB_FORMAT)),
        },
        obj @ Value::Object(_) => {
            if lacks_job_id(&obj) {
                return Err(SourceError::decode(BAD_JOB_FORMAT));
            }
            obj
        }
        _ => return Err(SourceError::decode(BAD_JOB_FORMAT)),
    };

    if lacks_job_id(&candidate) {
        return Ok(None);
    }

    let payload: JobPayload =
        serde_json::from_value(candidate).map_err(|_| SourceError::decode(BAD_JOB_FORMAT))?;

    Ok(Some(JobDescriptor {
        job_id: payload.jobid.into_string(),
        title: payload.title.unwrap_or_default(),
        description: payload.description.unwrap_or_default(),
        quantity: payload.a.into(),
        length: payload.b.into(),
        stripping: payload.c.into(),
    }))
}

/// A missing, null or empty-string `jobid` marks an empty queue slot.
fn lacks_job_id(value: &Value) -> bool {
    match value.get("jobid") {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Decode a progress fraction. Out-of-range values are clamped, not
/// rejected; non-finite or missing values are a decode failure.
pub fn normalize_progress(result: SourceResult) -> Normalized<ProgressSample> {
    let raw = require_success(result)?;
    let payload: ProgressPayload = serde_json::from_str(&raw.body)
        .map_err(|_| SourceError::decode(BAD_PROGRESS_FORMAT))?;

    if !payload.output.is_finite() {
        return Err(SourceError::decode(BAD_PROGRESS_FORMAT));
    }
    Ok(ProgressSample::clamped(payload.output))
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Unwrap a successful response, classifying everything else.
fn require_success(result: SourceResult) -> Result<RawResponse, SourceError> {
    match result {
        SourceResult::Failed(failure) => Err(SourceError::transport(failure.to_string())),
        SourceResult::Fetched(raw) if raw.is_success() => Ok(raw),
        SourceResult::Fetched(raw) => Err(SourceError::Http {
            status: raw.status,
            detail: error_detail(&raw),
        }),
    }
}

/// Best human-readable explanation for an error response: the `detail`
/// field if the body has one, else the body itself, else the status.
fn error_detail(raw: &RawResponse) -> String {
    if let Ok(ErrorPayload { detail }) = serde_json::from_str::<ErrorPayload>(&raw.body) {
        return match detail {
            Value::String(s) => truncate(&s),
            other => truncate(&other.to_string()),
        };
    }
    let body = raw.body.trim();
    if body.is_empty() {
        format!("HTTP error {}", raw.status)
    } else {
        truncate(body)
    }
}

fn truncate(s: &str) -> String {
    s.chars().take(MAX_DETAIL_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::TransportFailure;
    use assert_matches::assert_matches;
    use wirecut_core::model::Measure;

    fn ok(body: &str) -> SourceResult {
        SourceResult::Fetched(RawResponse::ok(body))
    }

    fn status(code: u16, body: &str) -> SourceResult {
        SourceResult::Fetched(RawResponse::with_status(code, body))
    }

    fn timeout() -> SourceResult {
        SourceResult::Failed(TransportFailure::Timeout)
    }

    // -- heartbeat ------------------------------------------------------------

    #[test]
    fn heartbeat_integer_time() {
        let hb = normalize_heartbeat(ok(r#"{"time": 1700000000, "data": []}"#)).unwrap();
        assert_eq!(hb.device_time_seconds, 1_700_000_000);
        assert!(hb.details.is_empty());
    }

    #[test]
    fn heartbeat_fractional_time_is_floored() {
        let hb = normalize_heartbeat(ok(r#"{"time": 1700000000.9}"#)).unwrap();
        assert_eq!(hb.device_time_seconds, 1_700_000_000);
    }

    #[test]
    fn heartbeat_details_are_kept_leniently() {
        let body = r#"{"time": 5, "data": [
            {"label": "IP Address", "info": "192.168.1.40"},
            {"label": "RSSI", "info": -61},
            {"label": "Mode", "info": null},
            {"nolabel": true}
        ]}"#;
        let hb = normalize_heartbeat(ok(body)).unwrap();
        assert_eq!(hb.details.len(), 3);
        assert_eq!(hb.detail("IP Address"), Some("192.168.1.40"));
        assert_eq!(hb.detail("RSSI"), Some("-61"));
        assert_eq!(hb.detail("Mode"), None);
    }

    #[test]
    fn heartbeat_without_numeric_time_is_bad_format() {
        for body in [r#"{"time": "soon"}"#, r#"{"data": []}"#, "not json", "[]"] {
            assert_eq!(
                normalize_heartbeat(ok(body)),
                Err(SourceError::decode(BAD_HEARTBEAT_FORMAT)),
                "body {body}"
            );
        }
    }

    #[test]
    fn heartbeat_http_error_uses_detail_field() {
        let err = normalize_heartbeat(status(500, r#"{"detail": "Database error: gone"}"#))
            .unwrap_err();
        assert_eq!(
            err,
            SourceError::Http {
                status: 500,
                detail: "Database error: gone".into()
            }
        );
    }

    #[test]
    fn heartbeat_transport_failure_passes_through() {
        assert_eq!(
            normalize_heartbeat(timeout()),
            Err(SourceError::transport("request timed out"))
        );
    }

    // -- job ------------------------------------------------------------------

    #[test]
    fn job_first_array_element_is_current() {
        let body = r#"[
            {"jobid": 1712000000.25, "title": "Loom", "description": "Red", "a": 40, "b": 120.5, "c": "6"},
            {"jobid": "next", "title": "Later", "description": "", "a": 1, "b": 1, "c": 1}
        ]"#;
        let job = normalize_job(ok(body)).unwrap().unwrap();
        assert_eq!(job.job_id, "1712000000.25");
        assert_eq!(job.title, "Loom");
        assert_eq!(job.quantity, Measure::Number(40.0));
        assert_eq!(job.length, Measure::Number(120.5));
        assert_eq!(job.stripping, Measure::Text("6".into()));
    }

    #[test]
    fn job_descriptive_field_names_accepted() {
        let body = r#"{"jobid": "J7", "quantity": 3, "length": 90, "stripping": "both"}"#;
        let job = normalize_job(ok(body)).unwrap().unwrap();
        assert_eq!(job.job_id, "J7");
        assert_eq!(job.title, "");
        assert_eq!(job.stripping, Measure::Text("both".into()));
    }

    #[test]
    fn job_not_found_is_valid_absence() {
        assert_eq!(normalize_job(status(404, r#"{"detail":"Job not found"}"#)), Ok(None));
    }

    #[test]
    fn job_empty_results_are_valid_absence() {
        for body in ["[]", "null", r#"[{"jobid": null}]"#, r#"[{"title": "x"}]"#, r#"[{"jobid": ""}]"#] {
            assert_eq!(normalize_job(ok(body)), Ok(None), "body {body}");
        }
    }

    #[test]
    fn job_malformed_payloads_are_bad_format() {
        for body in [
            r#"[{"jobid": "J1", "a": [1], "b": 2, "c": 3}]"#,
            r#"[{"jobid": "J1", "b": 2, "c": 3}]"#,
            r#"[{"jobid": true, "a": 1, "b": 2, "c": 3}]"#,
            r#"[42]"#,
            r#"{"status": "ok"}"#,
            r#""J1""#,
            "<html>",
        ] {
            assert_eq!(
                normalize_job(ok(body)),
                Err(SourceError::decode(BAD_JOB_FORMAT)),
                "body {body}"
            );
        }
    }

    #[test]
    fn job_server_error_is_http_failure() {
        assert_matches!(
            normalize_job(status(503, "")),
            Err(SourceError::Http { status: 503, ref detail }) if detail == "HTTP error 503"
        );
    }

    #[test]
    fn job_transport_failure_is_not_absence() {
        assert_matches!(normalize_job(timeout()), Err(SourceError::Transport { .. }));
    }

    // -- progress -------------------------------------------------------------

    #[test]
    fn progress_in_range() {
        let p = normalize_progress(ok(r#"{"output": 0.42}"#)).unwrap();
        assert_eq!(p.percent(), 42);
    }

    #[test]
    fn progress_out_of_range_is_clamped() {
        assert_eq!(normalize_progress(ok(r#"{"output": 1.4}"#)).unwrap().fraction, 1.0);
        assert_eq!(normalize_progress(ok(r#"{"output": -0.2}"#)).unwrap().fraction, 0.0);
    }

    #[test]
    fn progress_fraction_alias() {
        let p = normalize_progress(ok(r#"{"fraction": 0.5}"#)).unwrap();
        assert_eq!(p.percent(), 50);
    }

    #[test]
    fn progress_non_numeric_is_bad_format() {
        for body in [r#"{"output": "half"}"#, r#"{"output": null}"#, "{}", ""] {
            assert_eq!(
                normalize_progress(ok(body)),
                Err(SourceError::decode(BAD_PROGRESS_FORMAT)),
                "body {body}"
            );
        }
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let err = normalize_progress(status(502, &body)).unwrap_err();
        assert_matches!(err, SourceError::Http { detail, .. } if detail.len() == MAX_DETAIL_LEN);
    }
}
