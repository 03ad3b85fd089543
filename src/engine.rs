use std::time::Duration;
use tracing::{debug, trace};

use crate::element::{ElementKind, HostElement};
use crate::rng::Dice;
use crate::round::RoundParams;
use crate::settings::Settings;
use crate::stats::SessionStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Action {
    Click,
    Skip,
}

/// Per-kind policy. Mutates `stats` for the chosen action and returns it.
///
/// Only flowers consume randomness.
pub fn decide(
    kind: ElementKind,
    settings: &Settings,
    stats: &mut SessionStats,
    round: &RoundParams,
    dice: &mut Dice,
) -> Action {
    match kind {
        ElementKind::Flower => {
            if dice.random_bool(round.flower_skip_chance(settings)) {
                stats.flowers_skipped += 1;
                Action::Skip
            } else {
                stats.score += 1;
                Action::Click
            }
        }
        ElementKind::Bomb => {
            if stats.bomb_hits < settings.min_bomb_hits {
                // a bomb wipes the accumulated score
                stats.score = 0;
                stats.bomb_hits += 1;
                Action::Click
            } else {
                Action::Skip
            }
        }
        ElementKind::Ice => {
            if stats.ice_hits < settings.min_ice_hits {
                stats.ice_hits += 1;
                Action::Click
            } else {
                Action::Skip
            }
        }
        ElementKind::Other => Action::Skip,
    }
}

/// Classify a host element, decide, and click it when the policy says so.
///
/// Malformed elements are skipped without touching stats or the dice.
pub fn handle_element<E: HostElement + ?Sized>(
    element: &mut E,
    settings: &Settings,
    stats: &mut SessionStats,
    round: &RoundParams,
    dice: &mut Dice,
    now: Duration,
) -> Action {
    let Some(kind) = element.classify() else {
        trace!("ignoring malformed element");
        return Action::Skip;
    };

    let action = decide(kind, settings, stats, round, dice);
    if action == Action::Click {
        element.trigger();
        element.mark_consumed(now);
    }
    debug!(%kind, %action, score = stats.score, "element handled");
    action
}
