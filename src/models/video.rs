use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A promoted video. Insert-only; rows are never mutated after upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadedVideo {
    pub id: String,
    pub title: String,
    pub source_url: String,
    pub thumbnail_url: Option<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}
