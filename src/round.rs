use std::ops::RangeInclusive;

use crate::rng::Dice;
use crate::settings::Settings;

/// Knobs for the per-round jitter. Not persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTuning {
    /// Flower-skip multiplier range, in percent (70..=400 is 0.7x to 4.0x).
    pub flower_skip_jitter_percent: RangeInclusive<i64>,
}

impl Default for RoundTuning {
    fn default() -> Self {
        Self {
            flower_skip_jitter_percent: 70..=400,
        }
    }
}

/// Parameters rolled once when a round starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundParams {
    pub is_bad_game: bool,
    pub effective_flower_skip_percentage: f64,
}

impl RoundParams {
    /// Parameters with no jitter applied, used before the first round starts.
    pub fn unjittered(settings: &Settings) -> Self {
        Self {
            is_bad_game: false,
            effective_flower_skip_percentage: settings.flower_skip_percentage,
        }
    }

    pub fn roll(settings: &Settings, tuning: &RoundTuning, dice: &mut Dice) -> Self {
        let is_bad_game = dice.random_bool(settings.bad_games_percentage);
        let jitter = dice.random_int(
            *tuning.flower_skip_jitter_percent.start(),
            *tuning.flower_skip_jitter_percent.end(),
        ) as f64
            / 100.0;
        Self {
            is_bad_game,
            effective_flower_skip_percentage: settings.flower_skip_percentage * jitter,
        }
    }

    /// Skip chance actually applied to a flower, in percent.
    ///
    /// May exceed 100, in which case every flower is skipped.
    pub fn flower_skip_chance(&self, settings: &Settings) -> f64 {
        if self.is_bad_game {
            self.effective_flower_skip_percentage * settings.bad_game_flower_skip_percentage_multiplier
        } else {
            self.effective_flower_skip_percentage
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_skip_within_jitter_band() {
        let settings = Settings {
            flower_skip_percentage: 20.0,
            ..Settings::default()
        };
        let tuning = RoundTuning::default();
        let mut dice = Dice::seeded(11);
        for _ in 0..1_000 {
            let p = RoundParams::roll(&settings, &tuning, &mut dice);
            assert!(p.effective_flower_skip_percentage >= 20.0 * 0.7 - 1e-9);
            assert!(p.effective_flower_skip_percentage <= 20.0 * 4.0 + 1e-9);
        }
    }

    #[test]
    fn bad_game_follows_percentage() {
        let tuning = RoundTuning::default();
        let mut dice = Dice::seeded(12);

        let never = Settings {
            bad_games_percentage: 0.0,
            ..Settings::default()
        };
        assert!((0..500).all(|_| !RoundParams::roll(&never, &tuning, &mut dice).is_bad_game));

        let always = Settings {
            bad_games_percentage: 100.0,
            ..Settings::default()
        };
        assert!((0..500).all(|_| RoundParams::roll(&always, &tuning, &mut dice).is_bad_game));
    }

    #[test]
    fn bad_game_scales_skip_chance() {
        let settings = Settings {
            bad_game_flower_skip_percentage_multiplier: 3.0,
            ..Settings::default()
        };
        let good = RoundParams {
            is_bad_game: false,
            effective_flower_skip_percentage: 10.0,
        };
        let bad = RoundParams {
            is_bad_game: true,
            ..good
        };
        assert_eq!(good.flower_skip_chance(&settings), 10.0);
        assert_eq!(bad.flower_skip_chance(&settings), 30.0);
    }

    #[test]
    fn fixed_tuning_removes_jitter() {
        let settings = Settings::default();
        let tuning = RoundTuning {
            flower_skip_jitter_percent: 100..=100,
        };
        let mut dice = Dice::seeded(0);
        let p = RoundParams::roll(&settings, &tuning, &mut dice);
        assert_eq!(p.effective_flower_skip_percentage, settings.flower_skip_percentage);
    }
}
