use std::time::Duration;
use tracing::{debug, info};

use crate::error::SettingsError;
use crate::host::{Control, Host};
use crate::round::RoundParams;
use crate::runtime::{FixedTicker, Ticker, TimerId};
use crate::session::{RoundRecord, Session, HISTORY_LIMIT};
use crate::settings::{SettingField, SettingValue};

pub const PLAY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Band the claim-poll period is drawn from, once per session.
pub const CLAIM_POLL_BAND_MS: (i64, i64) = (5_000, 10_000);

/// Lifecycle phase outside of pause
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Idle,
    RoundActive,
    RoundOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    RoundActive,
    RoundOver,
    Paused { resume_to: Phase },
}

impl From<Phase> for LifecycleState {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Idle => LifecycleState::Idle,
            Phase::RoundActive => LifecycleState::RoundActive,
            Phase::RoundOver => LifecycleState::RoundOver,
        }
    }
}

impl LifecycleState {
    /// Phase the session is in, or will return to on resume
    pub fn phase(self) -> Phase {
        match self {
            LifecycleState::Idle => Phase::Idle,
            LifecycleState::RoundActive => Phase::RoundActive,
            LifecycleState::RoundOver => Phase::RoundOver,
            LifecycleState::Paused { resume_to } => resume_to,
        }
    }

    pub fn is_paused(self) -> bool {
        matches!(self, LifecycleState::Paused { .. })
    }
}

/// Work items the scheduler hands back to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    PlayPoll,
    ClaimPoll,
    DelayedPlay(Control),
    AutoPlayExpired,
}

impl Session {
    /// Arm both polling loops. Calling it again is a no-op.
    pub fn start_polling(&mut self) {
        if self.claim_ticker.is_some() {
            return;
        }
        let (lo, hi) = CLAIM_POLL_BAND_MS;
        let claim = FixedTicker::from_millis(self.dice.random_int(lo, hi) as u64);
        self.claim_ticker = Some(claim);
        self.scheduler.schedule_in(self.play_ticker.interval(), Task::PlayPoll);
        self.scheduler.schedule_in(claim.interval(), Task::ClaimPoll);
        debug!(claim_every = ?claim.interval(), "polling started");
    }

    pub fn dispatch<H: Host>(&mut self, id: TimerId, task: Task, host: &mut H) {
        match task {
            Task::PlayPoll => {
                self.poll_play(host);
                self.scheduler.schedule_in(self.play_ticker.interval(), Task::PlayPoll);
            }
            Task::ClaimPoll => {
                self.poll_claim(host);
                if let Some(ticker) = self.claim_ticker {
                    self.scheduler.schedule_in(ticker.interval(), Task::ClaimPoll);
                }
            }
            Task::DelayedPlay(control) => {
                if self.pending_play == Some(id) {
                    self.pending_play = None;
                }
                self.fire_delayed_play(control, host);
            }
            Task::AutoPlayExpired => {
                if self.autoplay_timer == Some(id) {
                    self.autoplay_timer = None;
                    self.expire_autoplay();
                }
            }
        }
    }

    /// One-second check for a play/continue control. Schedules at most one
    /// delayed press at a time.
    pub fn poll_play<H: Host>(&mut self, host: &H) {
        if self.is_paused() || !self.settings.auto_click_play || self.pending_play.is_some() {
            return;
        }
        let Some(control) = [Control::Play, Control::Continue]
            .into_iter()
            .find(|c| host.is_actionable(*c))
        else {
            return;
        };
        let delay = self.dice.random_delay(&self.settings);
        self.pending_play = Some(self.scheduler.schedule_in(delay, Task::DelayedPlay(control)));
        debug!(%control, ?delay, "play scheduled");
    }

    /// Press a previously scheduled play control. Pause and auto-play are
    /// checked now, not when the press was scheduled.
    pub fn fire_delayed_play<H: Host>(&mut self, control: Control, host: &mut H) {
        if self.is_paused() || !self.settings.auto_click_play {
            debug!(%control, "delayed play suppressed");
            return;
        }
        if !host.is_actionable(control) || !host.press(control) {
            debug!(%control, "control went away before the delayed press");
            return;
        }
        self.start_round();

        if self.settings.auto_click_play_duration > 0 && self.autoplay_timer.is_none() {
            info!("auto-play window already closed, disabling auto-play");
            self.settings.auto_click_play = false;
            self.persist_settings();
        }
    }

    /// Slow poll for claim, start and continue controls, in that order.
    pub fn poll_claim<H: Host>(&mut self, host: &mut H) {
        if self.is_paused() {
            return;
        }
        if host.is_actionable(Control::Claim) {
            if host.press(Control::Claim) {
                self.claim_reward();
            }
            return;
        }
        for control in [Control::Start, Control::Continue] {
            if host.is_actionable(control) {
                if host.press(control) {
                    self.start_round();
                }
                return;
            }
        }
    }

    /// Reset the counters and roll fresh round parameters. Ignored while
    /// paused, so stats stay frozen until resume.
    pub fn start_round(&mut self) {
        if self.is_paused() {
            debug!("paused, round start ignored");
            return;
        }
        self.stats.reset();
        self.round = RoundParams::roll(&self.settings, &self.tuning, &mut self.dice);
        self.rounds_started += 1;
        self.state = LifecycleState::RoundActive;
        info!(
            round = self.rounds_started,
            bad_game = self.round.is_bad_game,
            flower_skip = self.round.flower_skip_chance(&self.settings),
            "round started"
        );
    }

    /// Mutation callback: detect the reward view once per round.
    pub fn observe_mutation<H: Host>(&mut self, host: &H) {
        if self.state != LifecycleState::RoundActive {
            return;
        }
        if host.round_over_visible() {
            self.finish_round();
        }
    }

    fn finish_round(&mut self) {
        self.stats.is_game_over = true;
        self.state = LifecycleState::RoundOver;
        self.history.push(RoundRecord {
            stats: self.stats,
            params: self.round,
            finished_at: self.scheduler.now(),
        });
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
        info!(round = self.rounds_started, stats = %self.stats, "round over");
    }

    fn claim_reward(&mut self) {
        if self.state == LifecycleState::RoundOver {
            self.state = LifecycleState::Idle;
        }
        info!("reward claimed");
    }

    pub fn pause(&mut self) {
        if self.is_paused() {
            return;
        }
        self.state = LifecycleState::Paused {
            resume_to: self.state.phase(),
        };
        self.disarm_autoplay_timer();
        info!(stats = %self.stats, "paused");
    }

    pub fn resume(&mut self) {
        let LifecycleState::Paused { resume_to } = self.state else {
            return;
        };
        self.state = resume_to.into();
        if self.settings.auto_click_play {
            self.arm_autoplay_timer();
        }
        info!(phase = %resume_to, "resumed");
    }

    /// Returns whether the session is paused afterwards.
    pub fn toggle_pause(&mut self) -> bool {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
        self.is_paused()
    }

    /// Replace any running auto-play deadline with one for the current
    /// duration. A zero duration leaves auto-play unbounded.
    pub fn arm_autoplay_timer(&mut self) {
        self.disarm_autoplay_timer();
        let secs = self.settings.auto_click_play_duration;
        if secs == 0 {
            return;
        }
        let id = self
            .scheduler
            .schedule_in(Duration::from_secs(secs), Task::AutoPlayExpired);
        self.autoplay_timer = Some(id);
        debug!(secs, "auto-play timer armed");
    }

    pub fn disarm_autoplay_timer(&mut self) {
        if let Some(id) = self.autoplay_timer.take() {
            self.scheduler.cancel(id);
            debug!("auto-play timer cleared");
        }
    }

    fn expire_autoplay(&mut self) {
        self.settings.auto_click_play = false;
        self.persist_settings();
        info!("auto-play duration elapsed, auto-play disabled");
    }

    /// The one mutation path for settings edits, shared with the UI.
    pub fn update_setting(&mut self, field: SettingField, value: SettingValue) -> Result<(), SettingsError> {
        self.settings.apply(field, value)?;
        self.persist_settings();
        debug!(%field, %value, "setting updated");

        match field {
            SettingField::AutoClickPlay if self.settings.auto_click_play => {
                if !self.is_paused() {
                    self.arm_autoplay_timer();
                }
            }
            SettingField::AutoClickPlay => self.disarm_autoplay_timer(),
            SettingField::AutoClickPlayDuration if self.settings.auto_click_play => {
                if !self.is_paused() {
                    self.arm_autoplay_timer();
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Same as `update_setting`, from raw widget id and input text.
    pub fn update_setting_raw(&mut self, id: &str, raw: &str) -> Result<(), SettingsError> {
        let field: SettingField = id.parse()?;
        let value = SettingValue::parse_for(field, raw)?;
        self.update_setting(field, value)
    }
}
