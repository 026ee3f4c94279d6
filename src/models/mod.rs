mod account;
mod session;
mod verification;
mod video;

pub use account::Account;
pub use session::WatchSession;
pub use verification::{Detection, VerificationOutcome, VerificationRecord};
pub use video::UploadedVideo;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn account_serializes_camel_case() {
        let account = Account::new("user-1", Utc::now());
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["coinBalance"], 0);
        assert_eq!(json["freeUploadUsed"], false);
    }

    #[test]
    fn session_round_trips_through_json() {
        let now = Utc::now();
        let session = WatchSession {
            id: "s-1".into(),
            video_id: "abc123".into(),
            started_at: now,
            ended_at: Some(now),
            watch_duration_ms: 200_000,
            eligible: true,
        };
        let json = serde_json::to_string(&session).unwrap();
        let back: WatchSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
