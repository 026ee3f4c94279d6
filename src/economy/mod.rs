pub mod config;
pub mod rules;

pub use config::EconomyConfig;
pub use rules::{
    apply_signup_bonus, award_verification_coins, award_watch_coins, charge_upload,
    coins_for_detection, EconomyError,
};
