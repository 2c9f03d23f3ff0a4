//! Position debouncing
//!
//! A raw match only becomes the settled lever position once it has been seen
//! unchanged for the debounce interval. Any change of the raw match, including
//! passing through "no match" between notches, restarts the dwell timer.

use crate::combo::Position;
use std::time::{Duration, Instant};

/// Default dwell time before a reading is trusted.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(30);

#[derive(Debug, Clone)]
pub struct Stabilizer {
    debounce: Duration,
    /// Last raw match; `None` is "no match".
    candidate: Option<Position>,
    /// When the candidate was first observed. `None` before the first update.
    candidate_since: Option<Instant>,
    settled: Option<Position>,
}

impl Stabilizer {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            candidate: None,
            candidate_since: None,
            settled: None,
        }
    }

    /// Feed one raw reading. Returns the position on the tick it settles.
    pub fn update(&mut self, raw: Option<Position>, now: Instant) -> Option<Position> {
        let since = match self.candidate_since {
            Some(since) if raw == self.candidate => since,
            _ => {
                self.candidate = raw;
                self.candidate_since = Some(now);
                return None;
            }
        };

        let position = raw?;
        if now.duration_since(since) < self.debounce || Some(position) == self.settled {
            return None;
        }

        self.settled = Some(position);
        Some(position)
    }

    /// The position the lever is believed to rest in.
    pub fn settled(&self) -> Option<Position> {
        self.settled
    }

    /// The raw reading still agrees with the settled position and has held for
    /// a full debounce window.
    pub fn is_dwelling(&self, now: Instant) -> bool {
        match (self.settled, self.candidate_since) {
            (Some(settled), Some(since)) => {
                self.candidate == Some(settled) && now.duration_since(since) >= self.debounce
            }
            _ => false,
        }
    }

    /// Start a fresh dwell window for the current candidate.
    pub fn rearm(&mut self, now: Instant) {
        if self.candidate_since.is_some() {
            self.candidate_since = Some(now);
        }
    }
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(i: usize) -> Option<Position> {
        Position::new(i)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_settles_after_debounce() {
        let t0 = Instant::now();
        let mut s = Stabilizer::new(ms(30));

        assert_eq!(s.update(pos(7), t0), None);
        assert_eq!(s.update(pos(7), t0 + ms(10)), None);
        assert_eq!(s.update(pos(7), t0 + ms(29)), None);
        assert_eq!(s.update(pos(7), t0 + ms(30)), pos(7));
        assert_eq!(s.settled(), pos(7));
        // Only reported once.
        assert_eq!(s.update(pos(7), t0 + ms(40)), None);
    }

    #[test]
    fn test_first_update_never_settles() {
        let t0 = Instant::now();
        let mut s = Stabilizer::new(Duration::ZERO);
        assert_eq!(s.update(pos(3), t0), None);
        assert_eq!(s.update(pos(3), t0), pos(3));
    }

    #[test]
    fn test_no_match_never_settles() {
        let t0 = Instant::now();
        let mut s = Stabilizer::new(ms(30));
        s.update(pos(2), t0);
        s.update(pos(2), t0 + ms(30));

        assert_eq!(s.update(None, t0 + ms(31)), None);
        assert_eq!(s.update(None, t0 + ms(500)), None);
        assert_eq!(s.settled(), pos(2));
    }

    #[test]
    fn test_change_restarts_dwell() {
        let t0 = Instant::now();
        let mut s = Stabilizer::new(ms(30));
        s.update(pos(4), t0);
        s.update(pos(4), t0 + ms(20));
        // Bounce through "no match" and back.
        s.update(None, t0 + ms(25));
        s.update(pos(4), t0 + ms(26));
        assert_eq!(s.update(pos(4), t0 + ms(40)), None);
        assert_eq!(s.update(pos(4), t0 + ms(56)), pos(4));
    }

    #[test]
    fn test_chatter_never_settles() {
        let t0 = Instant::now();
        let mut s = Stabilizer::new(ms(30));
        for i in 0..100u64 {
            let raw = if i % 2 == 0 { pos(5) } else { pos(6) };
            assert_eq!(s.update(raw, t0 + ms(i * 5)), None);
        }
        assert_eq!(s.settled(), None);
    }

    #[test]
    fn test_dwelling_and_rearm() {
        let t0 = Instant::now();
        let mut s = Stabilizer::new(ms(30));
        s.update(pos(9), t0);
        assert!(!s.is_dwelling(t0 + ms(30)));
        s.update(pos(9), t0 + ms(30));
        assert!(s.is_dwelling(t0 + ms(30)));

        s.rearm(t0 + ms(50));
        assert!(!s.is_dwelling(t0 + ms(60)));
        assert!(s.is_dwelling(t0 + ms(80)));

        s.update(None, t0 + ms(90));
        assert!(!s.is_dwelling(t0 + ms(200)));
    }
}
