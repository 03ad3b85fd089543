use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::{trace, warn};

use crate::element::HostElement;
use crate::engine::{self, Action};
use crate::lifecycle::{LifecycleState, Task, PLAY_POLL_INTERVAL};
use crate::rng::Dice;
use crate::round::{RoundParams, RoundTuning};
use crate::runtime::{FixedTicker, Scheduler, TimerId};
use crate::settings::{Settings, SettingsStore};
use crate::stats::SessionStats;

/// Single-threaded shared handle to the session context
pub type SessionHandle = Rc<RefCell<Session>>;

/// Finished rounds kept in the session history, oldest dropped first.
pub const HISTORY_LIMIT: usize = 1_000;

/// Outcome of one finished round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundRecord {
    pub stats: SessionStats,
    pub params: RoundParams,
    pub finished_at: Duration,
}

/// Everything the clicker mutates lives here: settings, round counters,
/// round parameters, the dice and the timer queue.
pub struct Session {
    pub(crate) settings: Settings,
    pub(crate) stats: SessionStats,
    pub(crate) round: RoundParams,
    pub(crate) tuning: RoundTuning,
    pub(crate) dice: Dice,
    pub(crate) state: LifecycleState,
    pub(crate) scheduler: Scheduler<Task>,
    pub(crate) play_ticker: FixedTicker,
    pub(crate) claim_ticker: Option<FixedTicker>,
    pub(crate) autoplay_timer: Option<TimerId>,
    pub(crate) pending_play: Option<TimerId>,
    pub(crate) rounds_started: u32,
    pub(crate) history: Vec<RoundRecord>,
    store: Box<dyn SettingsStore>,
}

impl Session {
    pub fn new(settings: Settings, store: Box<dyn SettingsStore>, dice: Dice) -> Self {
        let settings = settings.normalized();
        let round = RoundParams::unjittered(&settings);
        Self {
            settings,
            stats: SessionStats::new(),
            round,
            tuning: RoundTuning::default(),
            dice,
            state: LifecycleState::Idle,
            scheduler: Scheduler::new(),
            play_ticker: FixedTicker::new(PLAY_POLL_INTERVAL),
            claim_ticker: None,
            autoplay_timer: None,
            pending_play: None,
            rounds_started: 0,
            history: Vec::new(),
            store,
        }
    }

    /// Load the persisted settings over freshly jittered defaults.
    ///
    /// Absent or corrupt records fall back to the jittered defaults.
    pub fn bootstrap(store: Box<dyn SettingsStore>, mut dice: Dice) -> Self {
        let defaults = Settings::jittered(&mut dice);
        let settings = store.load_over(&defaults).unwrap_or(defaults);
        Self::new(settings, store, dice)
    }

    pub fn with_tuning(mut self, tuning: RoundTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn into_handle(self) -> SessionHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn round(&self) -> &RoundParams {
        &self.round
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn rounds_started(&self) -> u32 {
        self.rounds_started
    }

    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    pub fn autoplay_armed(&self) -> bool {
        self.autoplay_timer.is_some()
    }

    pub(crate) fn persist_settings(&self) {
        if let Err(err) = self.store.save(&self.settings) {
            warn!(%err, "failed to persist settings");
        }
    }

    /// Run the decision engine over a freshly appended batch, in order.
    ///
    /// Does nothing while paused.
    pub fn route_elements<E: HostElement>(&mut self, elements: &mut [E]) -> Vec<Action> {
        if self.is_paused() {
            trace!(count = elements.len(), "paused, batch not routed");
            return Vec::new();
        }
        let now = self.scheduler.now();
        elements
            .iter_mut()
            .map(|el| {
                engine::handle_element(el, &self.settings, &mut self.stats, &self.round, &mut self.dice, now)
            })
            .collect()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("settings", &self.settings)
            .field("stats", &self.stats)
            .field("round", &self.round)
            .field("state", &self.state)
            .field("now", &self.scheduler.now())
            .field("autoplay_timer", &self.autoplay_timer)
            .field("pending_play", &self.pending_play)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::SpawnedElement;
    use crate::settings::MemorySettingsStore;

    #[test]
    fn bootstrap_without_saved_record_uses_jittered_defaults() {
        let session = Session::bootstrap(Box::new(MemorySettingsStore::new()), Dice::seeded(10));
        let s = session.settings();
        assert!(s.min_bomb_hits <= 1);
        assert!((2..=3).contains(&s.min_ice_hits));
        assert!((15.0..=25.0).contains(&s.flower_skip_percentage));
        assert_eq!(session.state(), LifecycleState::Idle);
    }

    #[test]
    fn bootstrap_merges_saved_record() {
        let store = MemorySettingsStore::with_raw(r#"{"minIceHits": 7, "autoClickPlay": true}"#);
        let session = Session::bootstrap(Box::new(store), Dice::seeded(10));
        assert_eq!(session.settings().min_ice_hits, 7);
        assert!(session.settings().auto_click_play);
    }

    #[test]
    fn bootstrap_survives_corrupt_record() {
        let store = MemorySettingsStore::with_raw("}}garbage");
        let session = Session::bootstrap(Box::new(store), Dice::seeded(10));
        assert!((2..=3).contains(&session.settings().min_ice_hits));
    }

    #[test]
    fn route_elements_updates_stats_in_order() {
        let settings = Settings {
            min_bomb_hits: 1,
            min_ice_hits: 1,
            flower_skip_percentage: 0.0,
            ..Settings::default()
        };
        let mut session = Session::new(settings, Box::new(MemorySettingsStore::new()), Dice::seeded(1));
        let mut batch = vec![
            SpawnedElement::new("CLOVER", || {}),
            SpawnedElement::new("CLOVER", || {}),
            SpawnedElement::new("BOMB", || {}),
            SpawnedElement::new("CLOVER", || {}),
            SpawnedElement::new("FREEZE", || {}),
            SpawnedElement::new("FREEZE", || {}),
        ];
        let actions = session.route_elements(&mut batch);
        assert_eq!(
            actions,
            vec![Action::Click, Action::Click, Action::Click, Action::Click, Action::Click, Action::Skip]
        );
        assert_eq!(session.stats().score, 1);
        assert_eq!(session.stats().bomb_hits, 1);
        assert_eq!(session.stats().ice_hits, 1);
    }
}
