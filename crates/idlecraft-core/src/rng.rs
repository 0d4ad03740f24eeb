//! Deterministic random number generator
//!
//! Generation rolls use a simple xorshift64 algorithm so a seeded engine
//! produces the same grants on every platform.

use serde::{Deserialize, Serialize};

/// A deterministic random number generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRng {
    state: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        // xorshift requires a non-zero state
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Get the current state
    pub fn state(&self) -> u64 {
        self.state
    }

    /// Generate the next raw u64 value
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Generate a uniform f64 in range [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        // top 53 bits fill the mantissa exactly, so 1.0 is unreachable
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Roll against a success probability: succeeds iff the sample is `<= probability`
    ///
    /// A probability of zero or below never succeeds.
    pub fn roll(&mut self, probability: f64) -> bool {
        if probability <= 0.0 {
            return false;
        }
        self.next_f64() <= probability
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::new(12345)
    }
}
