//! Translator configuration
//!
//! A [`Config`] is everything the engine needs for one session: the lever
//! layout, the per-notch keys for lever-keys mode, the auxiliary button
//! bindings, the output mode and its timings. It is stored as a TOML profile.

use crate::auxiliary::{AuxBindings, AuxFunction};
use crate::combo::{ButtonSet, POSITION_COUNT, Position};
use crate::keys::{KeyId, key_slots};
use crate::output::{OutputMode, OutputTiming};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Highest joystick button index accepted in a profile.
pub const MAX_BUTTON_INDEX: u16 = 127;

/// Profile validation failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Expected 15 lever positions, found {0}")]
    PositionCount(usize),
    #[error("Expected 15 lever keys, found {0}")]
    KeyCount(usize),
    #[error("Timing value '{0}' must be at least 1 ms")]
    ZeroTiming(&'static str),
    #[error("Button index {button} for {location} is out of range (max 127)")]
    ButtonOutOfRange { location: String, button: u16 },
}

/// A complete profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Profile name
    pub name: String,

    #[serde(default)]
    pub output_mode: OutputMode,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub lever: LeverConfig,

    #[serde(default)]
    pub auxiliary: AuxBindings,
}

/// Debounce and pacing, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    #[serde(default = "default_scroll_delay_ms")]
    pub scroll_delay_ms: u64,
    #[serde(default = "default_key_hold_ms")]
    pub key_hold_ms: u64,
    /// Pause between device polls. Zero polls back to back.
    #[serde(default)]
    pub poll_interval_ms: u64,
}

fn default_debounce_ms() -> u64 {
    30
}

fn default_step_delay_ms() -> u64 {
    25
}

fn default_scroll_delay_ms() -> u64 {
    20
}

fn default_key_hold_ms() -> u64 {
    10
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            step_delay_ms: default_step_delay_ms(),
            scroll_delay_ms: default_scroll_delay_ms(),
            key_hold_ms: default_key_hold_ms(),
            poll_interval_ms: 0,
        }
    }
}

/// One editable timing value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingField {
    Debounce,
    StepDelay,
    ScrollDelay,
    KeyHold,
    PollInterval,
}

impl TimingField {
    pub const ALL: [TimingField; 5] = [
        TimingField::Debounce,
        TimingField::StepDelay,
        TimingField::ScrollDelay,
        TimingField::KeyHold,
        TimingField::PollInterval,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TimingField::Debounce => "debounce",
            TimingField::StepDelay => "step-delay",
            TimingField::ScrollDelay => "scroll-delay",
            TimingField::KeyHold => "key-hold",
            TimingField::PollInterval => "poll-interval",
        }
    }

    /// Poll interval is the only timing allowed to be zero.
    pub fn min_ms(self) -> u64 {
        match self {
            TimingField::PollInterval => 0,
            _ => 1,
        }
    }
}

impl fmt::Display for TimingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TimingField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let normalized = normalized.strip_suffix("-ms").unwrap_or(&normalized);
        match normalized {
            "debounce" => Ok(TimingField::Debounce),
            "step-delay" | "arrow-delay" => Ok(TimingField::StepDelay),
            "scroll-delay" => Ok(TimingField::ScrollDelay),
            "key-hold" => Ok(TimingField::KeyHold),
            "poll-interval" | "poll" => Ok(TimingField::PollInterval),
            other => Err(format!("unknown timing: \"{other}\"")),
        }
    }
}

impl TimingConfig {
    pub fn get(&self, field: TimingField) -> u64 {
        match field {
            TimingField::Debounce => self.debounce_ms,
            TimingField::StepDelay => self.step_delay_ms,
            TimingField::ScrollDelay => self.scroll_delay_ms,
            TimingField::KeyHold => self.key_hold_ms,
            TimingField::PollInterval => self.poll_interval_ms,
        }
    }

    /// Store `ms`, raised to the field's minimum. Returns the value stored.
    pub fn set(&mut self, field: TimingField, ms: u64) -> u64 {
        let ms = ms.max(field.min_ms());
        let slot = match field {
            TimingField::Debounce => &mut self.debounce_ms,
            TimingField::StepDelay => &mut self.step_delay_ms,
            TimingField::ScrollDelay => &mut self.scroll_delay_ms,
            TimingField::KeyHold => &mut self.key_hold_ms,
            TimingField::PollInterval => &mut self.poll_interval_ms,
        };
        *slot = ms;
        ms
    }
}

/// Lever layout and lever-keys bindings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeverConfig {
    /// Button set per notch, in travel order (B9 first).
    #[serde(default = "default_positions")]
    pub positions: Vec<ButtonSet>,

    /// Key per notch for lever-keys mode; empty string means unbound.
    #[serde(default = "default_lever_keys", with = "key_slots")]
    pub keys: Vec<Option<KeyId>>,
}

/// Stock layout of the two-handle controller: buttons 6..=9 encode the notch.
pub fn default_positions() -> Vec<ButtonSet> {
    const LAYOUT: [&[u16]; POSITION_COUNT] = [
        &[9],
        &[8],
        &[8, 9],
        &[7],
        &[7, 9],
        &[7, 8],
        &[7, 8, 9],
        &[6],
        &[6, 9],
        &[6, 8],
        &[6, 8, 9],
        &[6, 7],
        &[6, 7, 9],
        &[6, 7, 8],
        &[6, 7, 8, 9],
    ];
    LAYOUT
        .iter()
        .map(|buttons| buttons.iter().copied().collect())
        .collect()
}

fn default_lever_keys() -> Vec<Option<KeyId>> {
    vec![None; POSITION_COUNT]
}

impl Default for LeverConfig {
    fn default() -> Self {
        Self {
            positions: default_positions(),
            keys: default_lever_keys(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            output_mode: OutputMode::default(),
            timing: TimingConfig::default(),
            lever: LeverConfig::default(),
            auxiliary: AuxBindings::default(),
        }
    }
}

impl Config {
    /// Create a default configuration with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Reject anything the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lever.positions.len() != POSITION_COUNT {
            return Err(ConfigError::PositionCount(self.lever.positions.len()));
        }
        if self.lever.keys.len() != POSITION_COUNT {
            return Err(ConfigError::KeyCount(self.lever.keys.len()));
        }

        let t = &self.timing;
        for (name, value) in [
            ("debounce_ms", t.debounce_ms),
            ("step_delay_ms", t.step_delay_ms),
            ("scroll_delay_ms", t.scroll_delay_ms),
            ("key_hold_ms", t.key_hold_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroTiming(name));
            }
        }

        for (position, buttons) in Position::all().zip(&self.lever.positions) {
            if let Some(&button) = buttons.iter().find(|&&b| b > MAX_BUTTON_INDEX) {
                return Err(ConfigError::ButtonOutOfRange {
                    location: format!("lever position {position}"),
                    button,
                });
            }
        }

        for (function, button) in self.auxiliary.mapped() {
            if button > MAX_BUTTON_INDEX {
                return Err(ConfigError::ButtonOutOfRange {
                    location: function.to_string(),
                    button,
                });
            }
        }

        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.timing.debounce_ms)
    }

    pub fn output_timing(&self) -> OutputTiming {
        OutputTiming {
            key_hold: Duration::from_millis(self.timing.key_hold_ms),
            step_delay: Duration::from_millis(self.timing.step_delay_ms),
            scroll_delay: Duration::from_millis(self.timing.scroll_delay_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.timing.poll_interval_ms)
    }

    /// Every button index the profile refers to, sorted.
    pub fn referenced_buttons(&self) -> Vec<u16> {
        let lever = self.lever.positions.iter().flatten().copied();
        let aux = self.auxiliary.mapped().map(|(_, button)| button);
        let mut buttons: Vec<u16> = lever.chain(aux).collect();
        buttons.sort_unstable();
        buttons.dedup();
        buttons
    }

    /// Every key the engine may emit with this profile, for the virtual device.
    pub fn used_keys(&self) -> Vec<KeyId> {
        let mut keys = vec![KeyId::UP, KeyId::DOWN];
        keys.extend(AuxFunction::ALL.iter().map(|f| f.key()));
        keys.extend(self.lever.keys.iter().flatten().copied());
        keys.sort();
        keys.dedup();
        keys
    }
}
