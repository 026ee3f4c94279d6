use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use anyhow::{Context, Result};

/// Fixed economy constants. Rewards are never negotiated at runtime; the
/// struct exists so tests and the settings file can tune thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EconomyConfig {
    /// Coins seeded into a fresh account at registration.
    pub signup_bonus: u64,
    /// Coins debited per upload once the free upload is spent.
    pub upload_cost: u64,
    /// Coins for one eligible watch session.
    pub watch_reward: u64,
    /// Coins when only a like is detected.
    pub like_reward: u64,
    /// Coins when both a like and a subscribe are detected.
    pub like_subscribe_reward: u64,
    /// Minimum watch duration for a session to count.
    pub eligibility_threshold_ms: u64,
    /// Screenshots below this edge length are rejected as too small.
    pub min_screenshot_edge_px: u32,
    /// Screenshots above this byte size are rejected outright.
    pub max_screenshot_bytes: u64,
    /// Simulated analyzer odds of detecting a like.
    pub like_probability: f64,
    /// Simulated analyzer odds of detecting a subscribe.
    pub subscribe_probability: f64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            signup_bonus: 5,
            upload_cost: 5,
            watch_reward: 5,
            like_reward: 10,
            like_subscribe_reward: 15,
            eligibility_threshold_ms: 180_000,
            min_screenshot_edge_px: 500,
            max_screenshot_bytes: 10 * 1024 * 1024,
            like_probability: 0.7,
            subscribe_probability: 0.5,
        }
    }
}

impl EconomyConfig {
    /// Loads overrides from a JSON settings file, falling back to the
    /// defaults when the file is absent or unreadable as config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read economy config from {}", path.display()))?;
        Ok(serde_json::from_str(&contents).unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write economy config to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_published_rates() {
        let config = EconomyConfig::default();
        assert_eq!(config.signup_bonus, 5);
        assert_eq!(config.upload_cost, 5);
        assert_eq!(config.watch_reward, 5);
        assert_eq!(config.like_reward, 10);
        assert_eq!(config.like_subscribe_reward, 15);
        assert_eq!(config.eligibility_threshold_ms, 180_000);
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let config = EconomyConfig::load(Path::new("/nonexistent/economy.json")).unwrap();
        assert_eq!(config.upload_cost, EconomyConfig::default().upload_cost);
    }

    #[test]
    fn save_then_load_round_trips_overrides() {
        let path = std::env::temp_dir().join(format!("economy-{}.json", std::process::id()));

        let mut config = EconomyConfig::default();
        config.watch_reward = 7;
        config.eligibility_threshold_ms = 60_000;
        config.save(&path).unwrap();

        let loaded = EconomyConfig::load(&path).unwrap();
        assert_eq!(loaded.watch_reward, 7);
        assert_eq!(loaded.eligibility_threshold_ms, 60_000);
        assert_eq!(loaded.upload_cost, 5);

        let _ = std::fs::remove_file(&path);
    }
}
