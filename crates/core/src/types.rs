/// Script definition identifiers are monotonically assigned integers.
pub type ScriptId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
