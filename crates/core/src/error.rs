use serde::Serialize;

/// Decode failure reason for a heartbeat payload without a numeric time.
pub const BAD_HEARTBEAT_FORMAT: &str = "bad heartbeat format";

/// Decode failure reason for a present-looking but malformed job payload.
pub const BAD_JOB_FORMAT: &str = "bad job format";

/// Decode failure reason for a progress payload without a finite fraction.
pub const BAD_PROGRESS_FORMAT: &str = "bad progress format";

/// Classified failure of one source for one cycle.
///
/// Produced once at the normalizer boundary. Downstream code matches on
/// the variant and the [`SourceKind`](crate::model::SourceKind) it came
/// from; it never inspects the message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceError {
    /// The request never produced an HTTP response (network, DNS, timeout).
    #[error("transport failure: {reason}")]
    Transport { reason: String },

    /// The source answered with a non-success status that is not a
    /// recognized valid-absence signal.
    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    /// The response arrived but its payload has the wrong shape.
    #[error("{reason}")]
    Decode { reason: String },
}

impl SourceError {
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    /// `true` for failures that happened below the HTTP layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
