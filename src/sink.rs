//! Synthetic input output (uinput virtual device)
//!
//! Everything the translator "types" goes through an [`InputSink`]. Emission is
//! fire-and-forget: a failed write is logged and the loop carries on.

use crate::clock::{Clock, ManualClock};
use crate::keys::KeyId;
use evdev::{
    AttributeSet, EventType, InputEvent, Key, RelativeAxisType,
    uinput::{VirtualDevice, VirtualDeviceBuilder},
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Name of the virtual device as shown by `evtest` and `libinput list-devices`.
pub const VIRTUAL_DEVICE_NAME: &str = "Mascon Translator Virtual Device";

/// REL_WHEEL axis code
const REL_WHEEL: u16 = 8;

/// Errors creating the virtual output device
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to create virtual device: {0}")]
    CreateDevice(#[source] std::io::Error),
}

/// Receiver of synthetic key and wheel events.
pub trait InputSink {
    fn press_key(&mut self, key: KeyId);
    fn release_key(&mut self, key: KeyId);
    /// Positive scrolls up, negative scrolls down, in wheel detents.
    fn scroll(&mut self, amount: i32);
}

/// Press `key`, hold it for `hold`, release it.
///
/// The hold always completes before this returns.
pub fn pulse_key(sink: &mut dyn InputSink, clock: &mut dyn Clock, key: KeyId, hold: Duration) {
    sink.press_key(key);
    clock.sleep(hold);
    sink.release_key(key);
}

/// uinput keyboard + wheel device
pub struct UinputSink {
    device: VirtualDevice,
}

impl UinputSink {
    /// Create the virtual device, declaring every key it may ever emit.
    pub fn new(keys: impl IntoIterator<Item = KeyId>) -> Result<Self, SinkError> {
        let mut key_set = AttributeSet::<Key>::new();
        for key in keys {
            key_set.insert(Key::new(key.code()));
        }

        let mut rel_axes = AttributeSet::<RelativeAxisType>::new();
        rel_axes.insert(RelativeAxisType::REL_WHEEL);

        let device = VirtualDeviceBuilder::new()
            .map_err(SinkError::CreateDevice)?
            .name(VIRTUAL_DEVICE_NAME)
            .with_keys(&key_set)
            .map_err(SinkError::CreateDevice)?
            .with_relative_axes(&rel_axes)
            .map_err(SinkError::CreateDevice)?
            .build()
            .map_err(SinkError::CreateDevice)?;

        info!("Virtual device created: {}", VIRTUAL_DEVICE_NAME);
        Ok(Self { device })
    }

    fn emit_key(&mut self, key: KeyId, value: i32) {
        let events = [
            InputEvent::new(EventType::KEY, key.code(), value),
            InputEvent::new(EventType::SYNCHRONIZATION, 0, 0),
        ];
        if let Err(e) = self.device.emit(&events) {
            warn!("Failed to emit {} (value={}): {}", key, value, e);
        }
    }
}

impl InputSink for UinputSink {
    fn press_key(&mut self, key: KeyId) {
        debug!("KEY down: {}", key);
        self.emit_key(key, 1);
    }

    fn release_key(&mut self, key: KeyId) {
        debug!("KEY up: {}", key);
        self.emit_key(key, 0);
    }

    fn scroll(&mut self, amount: i32) {
        debug!("SCROLL: REL_WHEEL value={}", amount);
        let events = [
            InputEvent::new(EventType::RELATIVE, REL_WHEEL, amount),
            InputEvent::new(EventType::SYNCHRONIZATION, 0, 0),
        ];
        if let Err(e) = self.device.emit(&events) {
            warn!("Failed to emit wheel: {}", e);
        }
    }
}

/// A single emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Press(KeyId),
    Release(KeyId),
    Scroll(i32),
}

/// An event plus the virtual time it was emitted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    pub at: Duration,
    pub event: SinkEvent,
}

/// Sink that keeps everything it receives, for dry runs and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    clock: Option<ManualClock>,
    events: Vec<Recorded>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp events with the given clock's virtual time.
    pub fn with_clock(clock: ManualClock) -> Self {
        Self {
            clock: Some(clock),
            events: Vec::new(),
        }
    }

    pub fn recorded(&self) -> &[Recorded] {
        &self.events
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.iter().map(|r| r.event).collect()
    }

    /// Number of completed press+release pairs of `key`.
    pub fn pulses_of(&self, key: KeyId) -> usize {
        self.events
            .iter()
            .filter(|r| r.event == SinkEvent::Release(key))
            .count()
    }

    /// Keys pressed and not yet released.
    pub fn held_keys(&self) -> Vec<KeyId> {
        let mut held: Vec<KeyId> = Vec::new();
        for r in &self.events {
            match r.event {
                SinkEvent::Press(key) if !held.contains(&key) => held.push(key),
                SinkEvent::Release(key) => held.retain(|k| *k != key),
                _ => {}
            }
        }
        held
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn push(&mut self, event: SinkEvent) {
        let at = self.clock.as_ref().map(ManualClock::elapsed).unwrap_or_default();
        self.events.push(Recorded { at, event });
    }
}

impl InputSink for RecordingSink {
    fn press_key(&mut self, key: KeyId) {
        self.push(SinkEvent::Press(key));
    }

    fn release_key(&mut self, key: KeyId) {
        self.push(SinkEvent::Release(key));
    }

    fn scroll(&mut self, amount: i32) {
        self.push(SinkEvent::Scroll(amount));
    }
}
