use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A finalized watch of one video. Immutable once concluded; appended to
/// the session history in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WatchSession {
    pub id: String,
    pub video_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub watch_duration_ms: u64,
    pub eligible: bool,
}
