//! Stepwise output driver
//!
//! Turns lever movement into synthetic input one notch at a time. A jump of
//! several notches is walked one step per opportunity, so the receiving game
//! sees every intermediate detent.

use crate::clock::Clock;
use crate::combo::{POSITION_COUNT, Position};
use crate::keys::KeyId;
use crate::sink::{InputSink, pulse_key};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Wheel detents per lever step.
pub const SCROLL_STEP: i32 = 1;

/// Hold time for a lever-keys pulse.
pub const LEVER_KEY_HOLD: Duration = Duration::from_millis(10);

/// Pause after a lever-keys pulse before polling resumes.
pub const LEVER_KEY_PAUSE: Duration = Duration::from_millis(200);

/// How lever movement is presented to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Down arrow per notch toward P5, Up arrow per notch toward B9.
    #[default]
    ArrowKeys,
    /// One wheel detent per notch.
    MouseScroll,
    /// Each notch has its own key, pulsed when the notch is reached.
    LeverKeys,
}

impl OutputMode {
    pub fn label(self) -> &'static str {
        match self {
            OutputMode::ArrowKeys => "arrow-keys",
            OutputMode::MouseScroll => "mouse-scroll",
            OutputMode::LeverKeys => "lever-keys",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arrow-keys" | "arrows" | "keys" | "0" => Ok(OutputMode::ArrowKeys),
            "mouse-scroll" | "scroll" | "wheel" | "1" => Ok(OutputMode::MouseScroll),
            "lever-keys" | "lever-to-key" | "direct" | "2" => Ok(OutputMode::LeverKeys),
            other => Err(format!("unknown output mode: \"{other}\"")),
        }
    }
}

/// Timing knobs for the output side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputTiming {
    /// How long an arrow key is held down.
    pub key_hold: Duration,
    /// Pause after an arrow-key step.
    pub step_delay: Duration,
    /// Pause after a wheel step.
    pub scroll_delay: Duration,
}

impl Default for OutputTiming {
    fn default() -> Self {
        Self {
            key_hold: Duration::from_millis(10),
            step_delay: Duration::from_millis(25),
            scroll_delay: Duration::from_millis(20),
        }
    }
}

/// One emitted notch of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub from: Position,
    pub to: Position,
}

impl Step {
    /// Travel toward P5 (higher index).
    pub fn is_forward(&self) -> bool {
        self.to > self.from
    }
}

/// Result of asking the driver to catch up with the lever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Nothing to do.
    Idle,
    /// First reading; recorded without output.
    Baseline(Position),
    Stepped(Step),
}

pub struct OutputDriver {
    mode: OutputMode,
    timing: OutputTiming,
    lever_keys: [Option<KeyId>; POSITION_COUNT],
    last_emitted: Option<Position>,
}

impl OutputDriver {
    pub fn new(mode: OutputMode, timing: OutputTiming, lever_keys: &[Option<KeyId>]) -> Self {
        let mut keys = [None; POSITION_COUNT];
        for (slot, key) in keys.iter_mut().zip(lever_keys) {
            *slot = *key;
        }
        Self {
            mode,
            timing,
            lever_keys: keys,
            last_emitted: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// The notch the game was last told about.
    pub fn last_emitted(&self) -> Option<Position> {
        self.last_emitted
    }

    /// Whether the game still lags behind `target`.
    pub fn is_behind(&self, target: Position) -> bool {
        self.last_emitted != Some(target)
    }

    /// Emit at most one step toward `target`, then pace.
    pub fn advance(
        &mut self,
        target: Position,
        sink: &mut dyn InputSink,
        clock: &mut dyn Clock,
    ) -> Advance {
        let Some(from) = self.last_emitted else {
            if target.is_neutral() {
                info!("Neutral position!");
            } else {
                info!("Baseline position: {}", target);
            }
            self.last_emitted = Some(target);
            return Advance::Baseline(target);
        };

        let Some(to) = from.step_toward(target) else {
            return Advance::Idle;
        };

        let step = Step { from, to };
        match self.mode {
            OutputMode::ArrowKeys => {
                let key = if step.is_forward() { KeyId::DOWN } else { KeyId::UP };
                pulse_key(sink, clock, key, self.timing.key_hold);
                clock.sleep(self.timing.step_delay);
            }
            OutputMode::MouseScroll => {
                let amount = if step.is_forward() { -SCROLL_STEP } else { SCROLL_STEP };
                sink.scroll(amount);
                clock.sleep(self.timing.scroll_delay);
            }
            OutputMode::LeverKeys => {
                // Lever-keys mode addresses notches directly; see `fire_direct`.
                warn!("Stepwise output requested in lever-keys mode, ignoring");
                return Advance::Idle;
            }
        }

        info!("{} -> {} : {}", from, to, if step.is_forward() { "v" } else { "^" });
        self.last_emitted = Some(to);
        Advance::Stepped(step)
    }

    /// Lever-keys mode: pulse the key bound to `position`, if any, then pause.
    ///
    /// Returns the key that was pulsed.
    pub fn fire_direct(
        &mut self,
        position: Position,
        sink: &mut dyn InputSink,
        clock: &mut dyn Clock,
    ) -> Option<KeyId> {
        self.last_emitted = Some(position);
        let key = self.lever_keys[position.index()]?;

        pulse_key(sink, clock, key, LEVER_KEY_HOLD);
        info!("[Lever-to-Key] {} -> {}", position, key);
        clock.sleep(LEVER_KEY_PAUSE);
        Some(key)
    }
}
