use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the analyzer claims to have seen in a screenshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub liked: bool,
    pub subscribed: bool,
}

/// Detection plus the coin reward it maps to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub liked: bool,
    pub subscribed: bool,
    pub coins_awarded: u64,
}

/// Persisted record of one verification attempt. `(video_id,
/// file_fingerprint)` is unique so the same screenshot cannot be cashed in
/// twice for the same video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    pub id: String,
    pub video_id: String,
    pub file_fingerprint: String,
    pub liked: bool,
    pub subscribed: bool,
    pub coins_awarded: u64,
    pub created_at: DateTime<Utc>,
}
