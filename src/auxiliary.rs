//! Auxiliary controls (horns, credit, test/debug overrides)
//!
//! Each auxiliary function is a single controller button mapped to a fixed
//! key. They are tracked independently of the lever, every tick, from the
//! raw pressed-button set.

use crate::clock::Clock;
use crate::keys::KeyId;
use crate::sink::{InputSink, pulse_key};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Minimum time between credit pulses while the button is held.
pub const CREDIT_REPEAT_INTERVAL: Duration = Duration::from_millis(50);

/// Hold time of a single credit pulse.
pub const CREDIT_PULSE_HOLD: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuxFunction {
    BigHorn,
    SmallHorn,
    Credit,
    TestMenu,
    DebugMission,
}

/// How a function reacts to its button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxKind {
    /// Key held exactly as long as the pedal.
    Pedal,
    /// Same mechanics as a pedal, for menu overrides.
    Override,
    /// Key pulsed immediately and then at a capped rate while held.
    Repeat,
}

impl AuxFunction {
    pub const ALL: [AuxFunction; 5] = [
        AuxFunction::BigHorn,
        AuxFunction::SmallHorn,
        AuxFunction::Credit,
        AuxFunction::TestMenu,
        AuxFunction::DebugMission,
    ];

    /// The key this function always emits.
    pub fn key(self) -> KeyId {
        match self {
            AuxFunction::BigHorn => KeyId::ENTER,
            AuxFunction::SmallHorn => KeyId::SPACE,
            AuxFunction::Credit => KeyId::LEFT_BRACE,
            AuxFunction::TestMenu => KeyId::RIGHT_SHIFT,
            AuxFunction::DebugMission => KeyId::LEFT_SHIFT,
        }
    }

    pub fn kind(self) -> AuxKind {
        match self {
            AuxFunction::BigHorn | AuxFunction::SmallHorn => AuxKind::Pedal,
            AuxFunction::TestMenu | AuxFunction::DebugMission => AuxKind::Override,
            AuxFunction::Credit => AuxKind::Repeat,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AuxFunction::BigHorn => "big-horn",
            AuxFunction::SmallHorn => "small-horn",
            AuxFunction::Credit => "credit",
            AuxFunction::TestMenu => "test-menu",
            AuxFunction::DebugMission => "debug-mission",
        }
    }

    fn slot(self) -> usize {
        match self {
            AuxFunction::BigHorn => 0,
            AuxFunction::SmallHorn => 1,
            AuxFunction::Credit => 2,
            AuxFunction::TestMenu => 3,
            AuxFunction::DebugMission => 4,
        }
    }
}

impl fmt::Display for AuxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AuxFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        AuxFunction::ALL
            .into_iter()
            .find(|f| f.label() == normalized)
            .ok_or_else(|| format!("unknown auxiliary function: \"{s}\""))
    }
}

/// Controller button assigned to each auxiliary function. Unset = unmapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxBindings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub big_horn: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small_horn: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_menu: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_mission: Option<u16>,
}

impl AuxBindings {
    pub fn button(&self, function: AuxFunction) -> Option<u16> {
        match function {
            AuxFunction::BigHorn => self.big_horn,
            AuxFunction::SmallHorn => self.small_horn,
            AuxFunction::Credit => self.credit,
            AuxFunction::TestMenu => self.test_menu,
            AuxFunction::DebugMission => self.debug_mission,
        }
    }

    pub fn set_button(&mut self, function: AuxFunction, button: Option<u16>) {
        let slot = match function {
            AuxFunction::BigHorn => &mut self.big_horn,
            AuxFunction::SmallHorn => &mut self.small_horn,
            AuxFunction::Credit => &mut self.credit,
            AuxFunction::TestMenu => &mut self.test_menu,
            AuxFunction::DebugMission => &mut self.debug_mission,
        };
        *slot = button;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Mapped functions with their buttons.
    pub fn mapped(&self) -> impl Iterator<Item = (AuxFunction, u16)> + '_ {
        AuxFunction::ALL
            .into_iter()
            .filter_map(|f| self.button(f).map(|b| (f, b)))
    }
}

/// Held flags from the previous tick, one per function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuxLatchState {
    held: [bool; 5],
}

impl AuxLatchState {
    pub fn is_held(&self, function: AuxFunction) -> bool {
        self.held[function.slot()]
    }

    fn set(&mut self, function: AuxFunction, held: bool) {
        self.held[function.slot()] = held;
    }
}

/// Credit auto-repeat bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CreditRepeatState {
    prev_pressed: bool,
    last_fire: Option<Instant>,
}

impl CreditRepeatState {
    /// Whether a held credit button should fire at `now`.
    fn should_fire(&self, now: Instant, interval: Duration) -> bool {
        match self.last_fire {
            _ if !self.prev_pressed => true,
            None => true,
            Some(last) => now.duration_since(last) >= interval,
        }
    }
}

pub struct AuxiliaryTracker {
    bindings: AuxBindings,
    latches: AuxLatchState,
    credit: CreditRepeatState,
    repeat_interval: Duration,
}

impl AuxiliaryTracker {
    pub fn new(bindings: AuxBindings) -> Self {
        Self {
            bindings,
            latches: AuxLatchState::default(),
            credit: CreditRepeatState::default(),
            repeat_interval: CREDIT_REPEAT_INTERVAL,
        }
    }

    pub fn latches(&self) -> &AuxLatchState {
        &self.latches
    }

    /// Evaluate every mapped function against this tick's buttons.
    ///
    /// Edges are emitted in the fixed function order.
    pub fn update(&mut self, pressed: &BTreeSet<u16>, sink: &mut dyn InputSink, clock: &mut dyn Clock) {
        for (function, button) in self.bindings.mapped().collect::<Vec<_>>() {
            let now_held = pressed.contains(&button);
            match function.kind() {
                AuxKind::Pedal | AuxKind::Override => self.update_latch(function, now_held, sink),
                AuxKind::Repeat => self.update_credit(now_held, sink, clock),
            }
        }
    }

    fn update_latch(&mut self, function: AuxFunction, now_held: bool, sink: &mut dyn InputSink) {
        let was_held = self.latches.is_held(function);
        if now_held && !was_held {
            info!("{} pressed -> {} down", function, function.key());
            sink.press_key(function.key());
        } else if !now_held && was_held {
            info!("{} released -> {} up", function, function.key());
            sink.release_key(function.key());
        }
        self.latches.set(function, now_held);
    }

    fn update_credit(&mut self, now_held: bool, sink: &mut dyn InputSink, clock: &mut dyn Clock) {
        if !now_held {
            self.credit.prev_pressed = false;
            self.latches.set(AuxFunction::Credit, false);
            return;
        }

        let now = clock.now();
        if self.credit.should_fire(now, self.repeat_interval) {
            debug!("credit -> {} pulse", AuxFunction::Credit.key());
            self.credit.last_fire = Some(now);
            pulse_key(sink, clock, AuxFunction::Credit.key(), CREDIT_PULSE_HOLD);
        }
        self.credit.prev_pressed = true;
        self.latches.set(AuxFunction::Credit, true);
    }

    /// Release every key currently held down on behalf of a pedal or override.
    pub fn release_all(&mut self, sink: &mut dyn InputSink) {
        for function in AuxFunction::ALL {
            if function.kind() == AuxKind::Repeat {
                continue;
            }
            if self.latches.is_held(function) {
                info!("Releasing held {} ({})", function.key(), function);
                sink.release_key(function.key());
                self.latches.set(function, false);
            }
        }
        self.credit = CreditRepeatState::default();
        self.latches.set(AuxFunction::Credit, false);
    }
}
