/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Result of normalizing one source response for one cycle.
///
/// `Ok` is the decoded domain value, `Err` the classified failure.
pub type Normalized<T> = Result<T, crate::error::SourceError>;
