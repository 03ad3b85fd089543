//! A stand-in for the real game page: spawns falling elements on a frame
//! clock, shows a reward view when a round runs out, and hands out play
//! tickets from a farming claim.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

use crate::app::AutoClicker;
use crate::element::SpawnedElement;
use crate::host::{Control, Host};
use crate::interceptor::ElementStream;
use crate::rng::Dice;
use crate::session::{RoundRecord, Session};

#[derive(Debug, Clone, PartialEq)]
pub struct GameRules {
    pub round_length: Duration,
    /// Most elements spawned in one frame
    pub max_spawn_per_frame: i64,
    pub bomb_percent: f64,
    pub ice_percent: f64,
    /// Share of spawned objects that are not game elements at all
    pub junk_percent: f64,
    pub starting_tickets: u32,
    pub tickets_per_claim: u32,
    pub farm_period: Duration,
    /// Elements older than this fall off the screen
    pub element_lifetime: Duration,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            round_length: Duration::from_secs(30),
            max_spawn_per_frame: 2,
            bomb_percent: 6.0,
            ice_percent: 5.0,
            junk_percent: 2.0,
            starting_tickets: 5,
            tickets_per_claim: 3,
            farm_period: Duration::from_secs(8 * 60),
            element_lifetime: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Lobby,
    Playing { remaining: Duration },
    Reward,
}

/// Points as the game itself counts them
#[derive(Debug, Default)]
struct Scoreboard {
    points: Cell<u32>,
    freezes: Cell<u32>,
}

pub struct SimulatedGame {
    rules: GameRules,
    screen: Screen,
    tickets: u32,
    farm_ready_in: Duration,
    root: bool,
    clock: Duration,
    spawned_at: Vec<Duration>,
    stream: ElementStream<SpawnedElement>,
    scoreboard: Rc<Scoreboard>,
    dice: Dice,
    finished_rounds: Vec<u32>,
}

impl SimulatedGame {
    pub fn new(rules: GameRules, seed: u64) -> Self {
        Self {
            screen: Screen::Lobby,
            tickets: rules.starting_tickets,
            farm_ready_in: rules.farm_period,
            root: true,
            clock: Duration::ZERO,
            spawned_at: Vec::new(),
            stream: ElementStream::new(),
            scoreboard: Rc::new(Scoreboard::default()),
            dice: Dice::seeded(seed),
            finished_rounds: Vec::new(),
            rules,
        }
    }

    /// Page without the root container mutation observation needs.
    pub fn without_root(mut self) -> Self {
        self.root = false;
        self
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn tickets(&self) -> u32 {
        self.tickets
    }

    pub fn stream(&self) -> &ElementStream<SpawnedElement> {
        &self.stream
    }

    /// Game-side points of every finished round
    pub fn finished_rounds(&self) -> &[u32] {
        &self.finished_rounds
    }

    pub fn freezes(&self) -> u32 {
        self.scoreboard.freezes.get()
    }

    /// Append elements straight into the live collection, as the game does.
    pub fn spawn(&mut self, batch: Vec<SpawnedElement>) -> usize {
        self.spawned_at.extend(std::iter::repeat(self.clock).take(batch.len()));
        self.stream.push(batch)
    }

    /// Advance one frame. Returns true when the visible page changed.
    pub fn tick(&mut self, dt: Duration) -> bool {
        self.clock += dt;
        let mut changed = self.expire_elements();

        if self.farm_ready_in > Duration::ZERO {
            self.farm_ready_in = self.farm_ready_in.saturating_sub(dt);
            changed |= self.farm_ready_in.is_zero();
        }

        if let Screen::Playing { remaining } = self.screen {
            let batch = self.spawn_batch();
            if !batch.is_empty() {
                self.spawn(batch);
                changed = true;
            }
            let remaining = remaining.saturating_sub(dt);
            if remaining.is_zero() {
                self.finished_rounds.push(self.scoreboard.points.get());
                self.screen = Screen::Reward;
                debug!(points = self.scoreboard.points.get(), "simulated round over");
                changed = true;
            } else {
                self.screen = Screen::Playing { remaining };
            }
        }
        changed
    }

    fn expire_elements(&mut self) -> bool {
        let lifetime = self.rules.element_lifetime;
        let clock = self.clock;
        // spawn times are monotonic, so expired elements form a prefix
        let expired = self
            .spawned_at
            .iter()
            .take_while(|at| clock.saturating_sub(**at) >= lifetime)
            .count();
        if expired == 0 {
            return false;
        }
        self.spawned_at.drain(..expired);
        let mut index = 0;
        self.stream.retain(|_| {
            index += 1;
            index > expired
        });
        true
    }

    fn spawn_batch(&mut self) -> Vec<SpawnedElement> {
        let count = self.dice.random_int(0, self.rules.max_spawn_per_frame);
        (0..count).map(|_| self.make_element()).collect()
    }

    fn make_element(&mut self) -> SpawnedElement {
        let board = self.scoreboard.clone();
        if self.dice.random_bool(self.rules.junk_percent) {
            return if self.dice.random_bool(50.0) {
                SpawnedElement::inert("CLOVER")
            } else {
                SpawnedElement::untagged(|| {})
            };
        }
        let roll = self.dice.random_int(0, 9_999) as f64 / 100.0;
        if roll < self.rules.bomb_percent {
            SpawnedElement::new("BOMB", move || board.points.set(0))
        } else if roll < self.rules.bomb_percent + self.rules.ice_percent {
            SpawnedElement::new("FREEZE", move || board.freezes.set(board.freezes.get() + 1))
        } else {
            SpawnedElement::new("CLOVER", move || board.points.set(board.points.get() + 1))
        }
    }

    fn begin_round(&mut self) {
        self.tickets -= 1;
        self.scoreboard.points.set(0);
        self.screen = Screen::Playing {
            remaining: self.rules.round_length,
        };
    }
}

impl Host for SimulatedGame {
    type Element = SpawnedElement;

    fn has_root(&self) -> bool {
        self.root
    }

    fn round_over_visible(&self) -> bool {
        self.screen == Screen::Reward
    }

    fn is_actionable(&self, control: Control) -> bool {
        match control {
            // the reward view offers "play again" while tickets last
            Control::Play => {
                matches!(self.screen, Screen::Lobby | Screen::Reward) && self.tickets > 0
            }
            Control::Claim => {
                self.farm_ready_in.is_zero() && !matches!(self.screen, Screen::Playing { .. })
            }
            Control::Start | Control::Continue => false,
        }
    }

    fn press(&mut self, control: Control) -> bool {
        if !self.is_actionable(control) {
            return false;
        }
        match control {
            Control::Play => self.begin_round(),
            Control::Claim => {
                self.tickets += self.rules.tickets_per_claim;
                self.farm_ready_in = self.rules.farm_period;
            }
            Control::Start | Control::Continue => return false,
        }
        true
    }

    fn element_stream(&mut self) -> Option<&mut ElementStream<SpawnedElement>> {
        Some(&mut self.stream)
    }
}

/// Summary of a simulation run
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub elapsed: Duration,
    pub rounds_started: u32,
    pub rounds: Vec<RoundRecord>,
    pub game_points: Vec<u32>,
    pub tickets_left: u32,
    pub auto_play_on: bool,
}

/// Drives an `AutoClicker` against a `SimulatedGame` frame by frame.
pub struct Simulation {
    clicker: AutoClicker<SimulatedGame>,
    frame: Duration,
}

impl Simulation {
    pub const DEFAULT_FRAME: Duration = Duration::from_millis(100);

    pub fn new(session: Session, game: SimulatedGame) -> Self {
        Self {
            clicker: AutoClicker::install(game, session),
            frame: Self::DEFAULT_FRAME,
        }
    }

    pub fn with_frame(mut self, frame: Duration) -> Self {
        self.frame = frame;
        self
    }

    pub fn run_for(&mut self, span: Duration) {
        let end = self.clicker.now() + span;
        while self.clicker.now() < end {
            let step = self.frame.min(end - self.clicker.now());
            self.clicker.run_for(step);
            if self.clicker.host_mut().tick(step) {
                self.clicker.notify_mutation();
            }
        }
    }

    pub fn clicker(&self) -> &AutoClicker<SimulatedGame> {
        &self.clicker
    }

    pub fn clicker_mut(&mut self) -> &mut AutoClicker<SimulatedGame> {
        &mut self.clicker
    }

    pub fn report(&self) -> SimulationReport {
        let session = self.clicker.session();
        SimulationReport {
            elapsed: session.now(),
            rounds_started: session.rounds_started(),
            rounds: session.history().to_vec(),
            game_points: self.clicker.host().finished_rounds().to_vec(),
            tickets_left: self.clicker.host().tickets(),
            auto_play_on: session.settings().auto_click_play,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press_ok(game: &mut SimulatedGame, control: Control) {
        assert!(game.press(control), "{control} should be pressable");
    }

    #[test]
    fn round_runs_out_into_reward() {
        let rules = GameRules {
            round_length: Duration::from_secs(2),
            ..GameRules::default()
        };
        let mut game = SimulatedGame::new(rules, 1);
        assert!(game.is_actionable(Control::Play));
        press_ok(&mut game, Control::Play);
        assert_eq!(game.tickets(), 4);

        for _ in 0..19 {
            game.tick(Duration::from_millis(100));
        }
        assert!(matches!(game.screen(), Screen::Playing { .. }));
        assert!(game.tick(Duration::from_millis(100)));
        assert_eq!(game.screen(), Screen::Reward);
        assert!(game.round_over_visible());
        assert_eq!(game.finished_rounds().len(), 1);
    }

    #[test]
    fn reward_offers_play_again_while_tickets_last() {
        let rules = GameRules {
            round_length: Duration::from_millis(100),
            starting_tickets: 2,
            ..GameRules::default()
        };
        let mut game = SimulatedGame::new(rules, 2);
        press_ok(&mut game, Control::Play);
        game.tick(Duration::from_millis(100));
        assert_eq!(game.screen(), Screen::Reward);
        press_ok(&mut game, Control::Play);
        game.tick(Duration::from_millis(100));
        assert_eq!(game.tickets(), 0);
        assert!(game.round_over_visible());
        assert!(!game.is_actionable(Control::Play));
        assert!(!game.press(Control::Continue));
    }

    #[test]
    fn claim_refills_tickets() {
        let rules = GameRules {
            farm_period: Duration::from_secs(1),
            starting_tickets: 0,
            ..GameRules::default()
        };
        let mut game = SimulatedGame::new(rules, 3);
        assert!(!game.is_actionable(Control::Claim));
        for _ in 0..10 {
            game.tick(Duration::from_millis(100));
        }
        press_ok(&mut game, Control::Claim);
        assert_eq!(game.tickets(), 3);
        assert!(!game.is_actionable(Control::Claim));
    }

    #[test]
    fn old_elements_fall_off() {
        let rules = GameRules {
            element_lifetime: Duration::from_millis(300),
            ..GameRules::default()
        };
        let mut game = SimulatedGame::new(rules, 4);
        game.spawn(vec![SpawnedElement::new("CLOVER", || {})]);
        game.tick(Duration::from_millis(200));
        assert_eq!(game.stream().len(), 1);
        game.tick(Duration::from_millis(200));
        assert_eq!(game.stream().len(), 0);
    }
}
