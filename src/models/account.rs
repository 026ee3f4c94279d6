use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Single-user coin ledger entry. The balance is unsigned so it can never
/// go negative; the only debit path checks affordability first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub coin_balance: u64,
    /// One-time upload-cost waiver. Transitions false -> true exactly once.
    pub free_upload_used: bool,
    /// Set when the signup bonus is applied; guards against re-seeding.
    pub initialized: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            coin_balance: 0,
            free_upload_used: false,
            initialized: false,
            created_at,
            updated_at: created_at,
        }
    }
}
