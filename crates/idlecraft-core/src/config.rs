//! Gameplay tuning

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Engine configuration, usually embedded in the server's RON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Lifetime of a market listing without an explicit expiry
    #[serde(default = "default_listing_lifetime")]
    pub listing_lifetime_secs: u64,
    /// Multiplier on every XP award
    #[serde(default = "default_xp_multiplier")]
    pub xp_multiplier: u64,
    /// Seed for generation rolls; `None` seeds from the clock at startup
    #[serde(default)]
    pub rng_seed: Option<u64>,
    #[serde(default = "default_starting_gold")]
    pub starting_gold: Decimal,
    #[serde(default = "default_starting_energy")]
    pub starting_energy: f64,
    /// Tools (name, tier) granted on registration
    #[serde(default = "default_starter_tools")]
    pub starter_tools: Vec<(String, u32)>,
    /// Items granted on registration
    #[serde(default = "default_starter_items")]
    pub starter_items: BTreeMap<String, u64>,
}

fn default_listing_lifetime() -> u64 {
    7 * 24 * 60 * 60
}

fn default_xp_multiplier() -> u64 {
    1
}

fn default_starting_gold() -> Decimal {
    Decimal::from(10)
}

fn default_starting_energy() -> f64 {
    100.0
}

fn default_starter_tools() -> Vec<(String, u32)> {
    vec![("player_ultimate".to_string(), 1)]
}

fn default_starter_items() -> BTreeMap<String, u64> {
    let mut items = BTreeMap::new();
    items.insert("mining_stone".to_string(), 10);
    items
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            listing_lifetime_secs: default_listing_lifetime(),
            xp_multiplier: default_xp_multiplier(),
            rng_seed: None,
            starting_gold: default_starting_gold(),
            starting_energy: default_starting_energy(),
            starter_tools: default_starter_tools(),
            starter_items: default_starter_items(),
        }
    }
}

impl EngineConfig {
    pub fn listing_lifetime(&self) -> Duration {
        Duration::seconds(self.listing_lifetime_secs.min(i64::MAX as u64) as i64)
    }
}
