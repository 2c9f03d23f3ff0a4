//! Lever translation engine
//!
//! One tick: auxiliary controls, combo match, debounce, then at most one
//! output step. All pacing happens inside the tick through the [`Clock`], so
//! the device is not polled while a step is being paced.

use crate::auxiliary::AuxiliaryTracker;
use crate::clock::Clock;
use crate::combo::{ButtonSet, Position, match_combo};
use crate::config::Config;
use crate::device::{ButtonSource, DeviceError, PressedSet};
use crate::keys::KeyId;
use crate::output::{Advance, OutputDriver, OutputMode, Step};
use crate::sink::InputSink;
use crate::stabilizer::Stabilizer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a tick did on the lever side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    /// First settled position recorded, nothing emitted.
    Baseline(Position),
    Stepped(Step),
    /// Lever-keys mode: newly settled position and the key pulsed for it.
    Fired(Position, Option<KeyId>),
}

pub struct Engine {
    definitions: Vec<ButtonSet>,
    stabilizer: Stabilizer,
    driver: OutputDriver,
    auxiliary: AuxiliaryTracker,
    poll_interval: Duration,
}

impl Engine {
    /// Build an engine for one session. The config is expected to be validated.
    pub fn new(config: &Config) -> Self {
        Self {
            definitions: config.lever.positions.clone(),
            stabilizer: Stabilizer::new(config.debounce()),
            driver: OutputDriver::new(config.output_mode, config.output_timing(), &config.lever.keys),
            auxiliary: AuxiliaryTracker::new(config.auxiliary.clone()),
            poll_interval: config.poll_interval(),
        }
    }

    /// Debounced lever position.
    pub fn settled(&self) -> Option<Position> {
        self.stabilizer.settled()
    }

    /// Position the game was last told about.
    pub fn last_emitted(&self) -> Option<Position> {
        self.driver.last_emitted()
    }

    /// Process one poll of the device.
    pub fn tick(
        &mut self,
        pressed: &PressedSet,
        sink: &mut dyn InputSink,
        clock: &mut dyn Clock,
    ) -> TickOutcome {
        self.auxiliary.update(pressed, sink, clock);

        let raw = match_combo(pressed, &self.definitions);
        let now = clock.now();
        let newly_settled = self.stabilizer.update(raw, now);
        if let Some(position) = newly_settled {
            debug!("Settled at {} (pressed {:?})", position, pressed);
        }

        if self.driver.mode() == OutputMode::LeverKeys {
            return match newly_settled {
                Some(position) => {
                    let key = self.driver.fire_direct(position, sink, clock);
                    TickOutcome::Fired(position, key)
                }
                None => TickOutcome::Idle,
            };
        }

        let Some(target) = self.stabilizer.settled() else {
            return TickOutcome::Idle;
        };
        // Every emitted step needs its own full debounce window.
        if !self.driver.is_behind(target) || !self.stabilizer.is_dwelling(now) {
            return TickOutcome::Idle;
        }

        match self.driver.advance(target, sink, clock) {
            Advance::Idle => TickOutcome::Idle,
            Advance::Baseline(position) => TickOutcome::Baseline(position),
            Advance::Stepped(step) => {
                self.stabilizer.rearm(clock.now());
                TickOutcome::Stepped(step)
            }
        }
    }

    /// Poll and tick until `stop` is set or the device fails.
    ///
    /// Held synthetic keys are released on either exit path.
    pub fn run(
        &mut self,
        source: &mut dyn ButtonSource,
        sink: &mut dyn InputSink,
        clock: &mut dyn Clock,
        stop: &AtomicBool,
    ) -> Result<(), DeviceError> {
        info!(
            "Translation active ({} mode, {} buttons)",
            self.driver.mode(),
            source.button_count()
        );

        while !stop.load(Ordering::SeqCst) {
            let pressed = match source.poll() {
                Ok(pressed) => pressed,
                Err(e) => {
                    warn!("Device read failed: {}", e);
                    self.shutdown(sink);
                    return Err(e);
                }
            };

            self.tick(&pressed, sink, clock);
            clock.sleep(self.poll_interval);
        }

        self.shutdown(sink);
        info!("Translation stopped");
        Ok(())
    }

    /// Release every synthetic key the engine is holding down.
    pub fn shutdown(&mut self, sink: &mut dyn InputSink) {
        self.auxiliary.release_all(sink);
    }
}
