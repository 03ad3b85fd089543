use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::SettingsError;
use crate::rng::Dice;

/// Key of the persisted settings slot.
pub const SETTINGS_KEY: &str = "BlumAutoclickerSettings";

/// Accepted band for `minDelayMs` and `maxDelayMs`.
pub const DELAY_BOUNDS_MS: (u64, u64) = (10, 10_000);

/// Longest auto-play window, one day.
pub const MAX_AUTO_PLAY_DURATION_SECS: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub min_bomb_hits: u32,
    pub min_ice_hits: u32,
    pub flower_skip_percentage: f64,
    pub bad_games_percentage: f64,
    pub bad_game_flower_skip_percentage_multiplier: f64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub auto_click_play: bool,
    /// Seconds of auto-play before it switches itself off, 0 = no limit.
    pub auto_click_play_duration: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_bomb_hits: 1,
            min_ice_hits: 2,
            flower_skip_percentage: 20.0,
            bad_games_percentage: 10.0,
            bad_game_flower_skip_percentage_multiplier: 5.0,
            min_delay_ms: 2000,
            max_delay_ms: 5000,
            auto_click_play: false,
            auto_click_play_duration: 1800,
        }
    }
}

impl Settings {
    /// First-run defaults with the bomb, ice and flower knobs sampled so
    /// fresh installs do not all play identically.
    pub fn jittered(dice: &mut Dice) -> Self {
        Self {
            min_bomb_hits: dice.random_int(0, 1) as u32,
            min_ice_hits: dice.random_int(2, 3) as u32,
            flower_skip_percentage: dice.random_int(15, 25) as f64,
            ..Self::default()
        }
    }

    /// Clamp every field back into its valid domain.
    pub fn normalized(mut self) -> Self {
        self.flower_skip_percentage = clamp_percent(self.flower_skip_percentage);
        self.bad_games_percentage = clamp_percent(self.bad_games_percentage);
        let m = self.bad_game_flower_skip_percentage_multiplier;
        self.bad_game_flower_skip_percentage_multiplier = if m.is_finite() { m.max(0.0) } else { 1.0 };
        self.min_delay_ms = clamp_delay(self.min_delay_ms);
        self.max_delay_ms = clamp_delay(self.max_delay_ms);
        self.auto_click_play_duration = self.auto_click_play_duration.min(MAX_AUTO_PLAY_DURATION_SECS);
        if self.max_delay_ms < self.min_delay_ms {
            self.max_delay_ms = self.min_delay_ms;
        }
        self
    }

    /// Apply one field edit coming from the settings UI.
    ///
    /// On error the record is left untouched.
    pub fn apply(&mut self, field: SettingField, value: SettingValue) -> Result<(), SettingsError> {
        use SettingField::*;

        let n = match (field, value) {
            (AutoClickPlay, SettingValue::Flag(on)) => {
                self.auto_click_play = on;
                return Ok(());
            }
            (AutoClickPlay, SettingValue::Number(_)) => {
                return Err(SettingsError::invalid(field, "expected a boolean"));
            }
            (_, SettingValue::Flag(_)) => {
                return Err(SettingsError::invalid(field, "expected a number"));
            }
            (_, SettingValue::Number(n)) => n,
        };
        if !n.is_finite() || n < 0.0 {
            return Err(SettingsError::invalid(field, format!("{n} is not a non-negative number")));
        }

        match field {
            MinBombHits => self.min_bomb_hits = n.round() as u32,
            MinIceHits => self.min_ice_hits = n.round() as u32,
            FlowerSkipPercentage => self.flower_skip_percentage = clamp_percent(n),
            BadGamesPercentage => self.bad_games_percentage = clamp_percent(n),
            BadGameFlowerSkipPercentageMultiplier => {
                self.bad_game_flower_skip_percentage_multiplier = n
            }
            MinDelayMs => {
                self.min_delay_ms = clamp_delay(n.round() as u64);
                if self.max_delay_ms < self.min_delay_ms {
                    self.max_delay_ms = self.min_delay_ms;
                }
            }
            MaxDelayMs => {
                self.max_delay_ms = clamp_delay(n.round() as u64);
                if self.min_delay_ms > self.max_delay_ms {
                    self.min_delay_ms = self.max_delay_ms;
                }
            }
            AutoClickPlayDuration => {
                self.auto_click_play_duration = (n.round() as u64).min(MAX_AUTO_PLAY_DURATION_SECS)
            }
            // flag, handled above
            AutoClickPlay => {}
        }
        Ok(())
    }
}

fn clamp_delay(ms: u64) -> u64 {
    let (lo, hi) = DELAY_BOUNDS_MS;
    ms.clamp(lo, hi)
}

fn clamp_percent(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 100.0)
    }
}

/// Identifiers the settings UI uses for each editable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "camelCase")]
pub enum SettingField {
    MinBombHits,
    MinIceHits,
    FlowerSkipPercentage,
    BadGamesPercentage,
    BadGameFlowerSkipPercentageMultiplier,
    MinDelayMs,
    MaxDelayMs,
    AutoClickPlay,
    AutoClickPlayDuration,
}

impl SettingField {
    pub const ALL: [SettingField; 9] = [
        SettingField::MinBombHits,
        SettingField::MinIceHits,
        SettingField::FlowerSkipPercentage,
        SettingField::BadGamesPercentage,
        SettingField::BadGameFlowerSkipPercentageMultiplier,
        SettingField::MinDelayMs,
        SettingField::MaxDelayMs,
        SettingField::AutoClickPlay,
        SettingField::AutoClickPlayDuration,
    ];

    pub fn is_flag(self) -> bool {
        matches!(self, SettingField::AutoClickPlay)
    }
}

impl FromStr for SettingField {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.to_string() == s)
            .ok_or_else(|| SettingsError::UnknownField(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingValue {
    Flag(bool),
    Number(f64),
}

impl SettingValue {
    /// Parse raw widget input (checkbox state or slider text) for `field`.
    pub fn parse_for(field: SettingField, raw: &str) -> Result<Self, SettingsError> {
        let raw = raw.trim();
        if field.is_flag() {
            return match raw {
                "true" | "on" | "1" => Ok(SettingValue::Flag(true)),
                "false" | "off" | "0" | "" => Ok(SettingValue::Flag(false)),
                other => Err(SettingsError::invalid(field, format!("`{other}` is not a boolean"))),
            };
        }
        raw.parse::<f64>()
            .map(SettingValue::Number)
            .map_err(|_| SettingsError::invalid(field, format!("`{raw}` is not a number")))
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Flag(b) => write!(f, "{b}"),
            SettingValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Overlay a saved (possibly partial) record onto `defaults`, key by key.
///
/// Keys whose value does not fit the field type are dropped with a warning;
/// the rest of the record still applies.
pub fn merge_saved(defaults: &Settings, raw: &str) -> Result<Settings, SettingsError> {
    let saved = match serde_json::from_str::<Value>(raw).map_err(SettingsError::Parse)? {
        Value::Object(map) => map,
        _ => {
            return Err(SettingsError::Parse(<serde_json::Error as serde::de::Error>::custom(
                "expected a json object",
            )))
        }
    };

    let mut base: Map<String, Value> = match serde_json::to_value(defaults).map_err(SettingsError::Serialize)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    for (key, value) in saved {
        let mut candidate = base.clone();
        candidate.insert(key.clone(), value);
        match serde_json::from_value::<Settings>(Value::Object(candidate.clone())) {
            Ok(_) => base = candidate,
            Err(err) => warn!(%key, %err, "ignoring unusable saved setting"),
        }
    }

    let merged = serde_json::from_value::<Settings>(Value::Object(base)).map_err(SettingsError::Parse)?;
    Ok(merged.normalized())
}

/// Persistent slot holding the serialized settings record.
pub trait SettingsStore {
    fn load_raw(&self) -> Option<String>;
    fn save_raw(&self, raw: &str) -> Result<(), SettingsError>;

    /// Saved record merged over `defaults`; `None` when nothing usable is stored.
    fn load_over(&self, defaults: &Settings) -> Option<Settings> {
        let raw = self.load_raw()?;
        match merge_saved(defaults, &raw) {
            Ok(settings) => Some(settings),
            Err(err) => {
                warn!(%err, "saved settings are corrupt, falling back to defaults");
                None
            }
        }
    }

    fn load(&self) -> Option<Settings> {
        self.load_over(&Settings::default())
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let data = serde_json::to_string_pretty(settings).map_err(SettingsError::Serialize)?;
        self.save_raw(&data)?;
        debug!("settings saved");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let file = format!("{SETTINGS_KEY}.json");
        let path = if let Some(pd) = ProjectDirs::from("", "", "blumclick") {
            pd.config_dir().join(file)
        } else {
            PathBuf::from(file)
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for FileSettingsStore {
    fn load_raw(&self) -> Option<String> {
        fs::read_to_string(&self.path).ok()
    }

    fn save_raw(&self, raw: &str) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// In-memory slot; clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    slot: Rc<RefCell<Option<String>>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(raw.into()))),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.slot.borrow().clone()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load_raw(&self) -> Option<String> {
        self.raw()
    }

    fn save_raw(&self, raw: &str) -> Result<(), SettingsError> {
        *self.slot.borrow_mut() = Some(raw.to_string());
        Ok(())
    }
}
