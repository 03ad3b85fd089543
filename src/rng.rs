use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use crate::settings::Settings;

/// Source of every random draw the clicker makes.
///
/// Wraps a seedable generator so a whole session can be replayed from a
/// single seed in tests and simulations.
#[derive(Debug, Clone)]
pub struct Dice {
    rng: StdRng,
}

impl Dice {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform integer in `[min, max]`, both ends inclusive.
    pub fn random_int(&mut self, min: i64, max: i64) -> i64 {
        debug_assert!(min <= max, "random_int called with min {min} > max {max}");
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.rng.gen_range(lo..=hi)
    }

    /// True with probability `probability_percent / 100`.
    ///
    /// Values at or below 0 never fire, values at or above 100 always do.
    pub fn random_bool(&mut self, probability_percent: f64) -> bool {
        self.rng.gen::<f64>() < probability_percent / 100.0
    }

    /// Delay drawn from the configured `[min_delay_ms, max_delay_ms]` band.
    pub fn random_delay(&mut self, settings: &Settings) -> Duration {
        let (lo, hi) = if settings.min_delay_ms <= settings.max_delay_ms {
            (settings.min_delay_ms, settings.max_delay_ms)
        } else {
            (settings.max_delay_ms, settings.min_delay_ms)
        };
        Duration::from_millis(self.rng.gen_range(lo..=hi))
    }
}

impl Default for Dice {
    fn default() -> Self {
        Self::from_entropy()
    }
}
