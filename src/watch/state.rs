use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::WatchSession;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum WatchStatus {
    Idle,
    Watching,
    Concluded,
}

impl Default for WatchStatus {
    fn default() -> Self {
        WatchStatus::Idle
    }
}

/// Live tracker for the one video currently being watched. Time flows in
/// as parameters so eligibility is deterministic under test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchState {
    pub status: WatchStatus,
    pub video_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl WatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a video. Always a fresh session; any previous
    /// unconcluded one is abandoned and never persisted.
    pub fn begin(&mut self, video_id: impl Into<String>, start_at: DateTime<Utc>) {
        *self = Self {
            status: WatchStatus::Watching,
            video_id: Some(video_id.into()),
            started_at: Some(start_at),
        };
    }

    /// Concludes the live session when the app regains focus. Duration is
    /// measured open -> focus-regain; if the user never actually left the
    /// app this overcounts, a tolerated inaccuracy. Returns `None` when
    /// nothing was being watched.
    pub fn conclude(
        &mut self,
        now: DateTime<Utc>,
        eligibility_threshold_ms: u64,
    ) -> Option<WatchSession> {
        if self.status != WatchStatus::Watching {
            return None;
        }
        let video_id = self.video_id.take()?;
        let started_at = self.started_at.take()?;
        self.status = WatchStatus::Concluded;

        let watch_duration_ms = (now - started_at).num_milliseconds().max(0) as u64;
        Some(WatchSession {
            id: Uuid::new_v4().to_string(),
            video_id,
            started_at,
            ended_at: Some(now),
            watch_duration_ms,
            eligible: watch_duration_ms >= eligibility_threshold_ms,
        })
    }
}
