use thiserror::Error;

use crate::models::{Account, Detection, VerificationOutcome};

use super::EconomyConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EconomyError {
    #[error("account already received its signup bonus")]
    AlreadyInitialized,

    #[error("upload denied: {shortfall} more coins needed")]
    UploadDenied { shortfall: u64 },
}

/// Seeds a fresh account with the signup bonus. Refuses to run twice on
/// the same account; re-seeding would silently reset an earned balance.
pub fn apply_signup_bonus(
    mut account: Account,
    config: &EconomyConfig,
) -> Result<Account, EconomyError> {
    if account.initialized {
        return Err(EconomyError::AlreadyInitialized);
    }
    account.coin_balance = config.signup_bonus;
    account.initialized = true;
    Ok(account)
}

/// Charges for one upload. The first upload spends the free waiver and
/// leaves the balance alone; after that the cost is debited, or the charge
/// is denied with the exact shortfall and the account untouched.
pub fn charge_upload(mut account: Account, config: &EconomyConfig) -> Result<Account, EconomyError> {
    if !account.free_upload_used {
        account.free_upload_used = true;
        return Ok(account);
    }
    if account.coin_balance >= config.upload_cost {
        account.coin_balance -= config.upload_cost;
        return Ok(account);
    }
    Err(EconomyError::UploadDenied {
        shortfall: config.upload_cost - account.coin_balance,
    })
}

/// Adds the fixed watch reward. The engine keeps no claim state; the
/// caller must check its claimed-session guard first or this will happily
/// credit the same session twice.
pub fn award_watch_coins(mut account: Account, config: &EconomyConfig) -> Account {
    account.coin_balance += config.watch_reward;
    account
}

/// Adds whatever a verification outcome was worth.
pub fn award_verification_coins(mut account: Account, outcome: &VerificationOutcome) -> Account {
    account.coin_balance += outcome.coins_awarded;
    account
}

/// Maps a detection to its coin value: like + subscribe beats like alone,
/// and a subscribe without a like earns nothing.
pub fn coins_for_detection(detection: Detection, config: &EconomyConfig) -> u64 {
    match (detection.liked, detection.subscribed) {
        (true, true) => config.like_subscribe_reward,
        (true, false) => config.like_reward,
        (false, _) => 0,
    }
}
