//! Button learning
//!
//! Recording which buttons make up each lever notch, and waiting for the
//! button to bind to an auxiliary function.

use crate::clock::Clock;
use crate::combo::{ButtonSet, POSITION_COUNT, Position};
use crate::device::{ButtonSource, PressedSet};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Poll interval while waiting for a new button.
pub const CAPTURE_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long `learn-aux` waits for a press.
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

/// Buttons held right now.
pub fn capture_pressed(source: &mut dyn ButtonSource) -> Result<PressedSet> {
    source.poll().context("Failed to read controller buttons")
}

/// Wait for a button that was not already held when the capture started.
///
/// Buttons held at the start (the lever's own notch buttons, usually) are
/// ignored for the whole capture. The lowest new index wins if several
/// appear in the same poll.
pub fn capture_new_button(
    source: &mut dyn ButtonSource,
    clock: &mut dyn Clock,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<u16> {
    let initially_pressed = capture_pressed(source)?;
    let deadline = clock.now() + timeout;

    while clock.now() < deadline {
        let pressed = capture_pressed(source)?;
        if let Some(&button) = pressed.difference(&initially_pressed).next() {
            info!("Captured button {}", button);
            return Ok(button);
        }
        clock.sleep(poll_interval);
    }

    anyhow::bail!("Timed out waiting for button press.");
}

/// Step-by-step recorder for the 15 lever notches, B9 first.
#[derive(Debug, Default)]
pub struct LeverRecorder {
    recorded: Vec<ButtonSet>,
}

impl LeverRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The notch to record next, `None` once all are done.
    pub fn next_position(&self) -> Option<Position> {
        Position::new(self.recorded.len())
    }

    /// Store `pressed` for the current notch. An empty set leaves the notch
    /// reachable only when nothing else matches.
    pub fn record(&mut self, pressed: PressedSet) -> Option<Position> {
        let position = self.next_position()?;
        if pressed.is_empty() {
            warn!("No buttons held for {}", position);
        }
        info!("{}: recorded buttons {:?}", position, pressed);
        self.recorded.push(pressed);
        Some(position)
    }

    /// Drop the last recording. Returns the notch to redo.
    pub fn back(&mut self) -> Option<Position> {
        self.recorded.pop()?;
        self.next_position()
    }

    pub fn is_complete(&self) -> bool {
        self.recorded.len() == POSITION_COUNT
    }

    pub fn recorded(&self) -> &[ButtonSet] {
        &self.recorded
    }

    pub fn finish(self) -> Result<Vec<ButtonSet>> {
        if !self.is_complete() {
            anyhow::bail!(
                "Only {} of {} lever positions recorded",
                self.recorded.len(),
                POSITION_COUNT
            );
        }
        Ok(self.recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::device::DeviceError;
    use std::collections::VecDeque;

    /// Replays frames, one per poll, repeating the last one forever.
    struct Frames(VecDeque<PressedSet>);

    impl Frames {
        fn new(frames: &[&[u16]]) -> Self {
            Self(frames.iter().map(|f| f.iter().copied().collect()).collect())
        }
    }

    impl ButtonSource for Frames {
        fn poll(&mut self) -> Result<PressedSet, DeviceError> {
            if self.0.len() > 1 {
                Ok(self.0.pop_front().unwrap_or_default())
            } else {
                Ok(self.0.front().cloned().unwrap_or_default())
            }
        }

        fn button_count(&self) -> usize {
            16
        }
    }

    #[test]
    fn test_capture_ignores_initially_held() {
        let mut source = Frames::new(&[&[6, 8], &[6, 8], &[6, 8], &[3, 6, 8]]);
        let mut clock = ManualClock::new();

        let button =
            capture_new_button(&mut source, &mut clock, CAPTURE_TIMEOUT, CAPTURE_POLL_INTERVAL)
                .unwrap();
        assert_eq!(button, 3);
        assert_eq!(clock.elapsed(), CAPTURE_POLL_INTERVAL * 2);
    }

    #[test]
    fn test_capture_times_out() {
        let mut source = Frames::new(&[&[6]]);
        let mut clock = ManualClock::new();

        let err = capture_new_button(
            &mut source,
            &mut clock,
            Duration::from_millis(100),
            CAPTURE_POLL_INTERVAL,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Timed out"));
        assert_eq!(clock.elapsed(), Duration::from_millis(100));
    }

    #[test]
    fn test_capture_pressed() {
        let mut source = Frames::new(&[&[7, 9]]);
        assert_eq!(capture_pressed(&mut source).unwrap(), [7, 9].into_iter().collect());
    }

    #[test]
    fn test_lever_recorder_with_back() {
        let mut recorder = LeverRecorder::new();
        assert_eq!(recorder.next_position(), Position::new(0));

        recorder.record([9].into_iter().collect());
        recorder.record([1].into_iter().collect());
        assert_eq!(recorder.back(), Position::new(1));
        recorder.record([8].into_iter().collect());
        assert_eq!(recorder.recorded().len(), 2);
        assert_eq!(recorder.recorded()[1], [8].into_iter().collect());

        for _ in 2..POSITION_COUNT {
            assert!(recorder.record(PressedSet::new()).is_some());
        }
        assert!(recorder.is_complete());
        assert_eq!(recorder.next_position(), None);
        assert_eq!(recorder.record([5].into_iter().collect()), None);

        let positions = recorder.finish().unwrap();
        assert_eq!(positions.len(), POSITION_COUNT);
    }

    #[test]
    fn test_lever_recorder_back_at_start() {
        let mut recorder = LeverRecorder::new();
        assert_eq!(recorder.back(), None);
        assert!(recorder.finish().is_err());
    }
}
