//! Lever positions and combo matching
//!
//! The controller reports its lever as a combination of digital buttons. Each
//! of the 15 notches is defined by the set of buttons that must all be held.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Number of lever notches.
pub const POSITION_COUNT: usize = 15;

/// Buttons that make up one lever notch.
pub type ButtonSet = BTreeSet<u16>;

/// Display names, in travel order.
const POSITION_NAMES: [&str; POSITION_COUNT] = [
    "B9", "B8", "B7", "B6", "B5", "B4", "B3", "B2", "B1", "Neutral", "P1", "P2", "P3", "P4", "P5",
];

/// One of the 15 lever notches. Index order is physical travel order:
/// 0..=8 brake B9..B1, 9 Neutral, 10..=14 power P1..P5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position(u8);

impl Position {
    pub const NEUTRAL: Position = Position(9);

    pub fn new(index: usize) -> Option<Position> {
        (index < POSITION_COUNT).then(|| Position(index as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn name(self) -> &'static str {
        POSITION_NAMES[self.index()]
    }

    pub fn is_neutral(self) -> bool {
        self == Position::NEUTRAL
    }

    /// The neighbouring notch one step toward `target`, or `None` when already there.
    pub fn step_toward(self, target: Position) -> Option<Position> {
        match self.0.cmp(&target.0) {
            std::cmp::Ordering::Less => Some(Position(self.0 + 1)),
            std::cmp::Ordering::Greater => Some(Position(self.0 - 1)),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// All notches in travel order.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..POSITION_COUNT as u8).map(Position)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Position {
    type Err = String;

    /// Accepts a notch name (`B9`, `neutral`, `N`, `P3`) or an index `0..=14`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(index) = s.parse::<usize>() {
            return Position::new(index).ok_or_else(|| format!("position index out of range: {index}"));
        }
        if s.eq_ignore_ascii_case("n") {
            return Ok(Position::NEUTRAL);
        }
        POSITION_NAMES
            .iter()
            .position(|name| name.eq_ignore_ascii_case(s))
            .map(|i| Position(i as u8))
            .ok_or_else(|| format!("unknown lever position: \"{s}\""))
    }
}

/// Find the notch whose button set best explains `pressed`.
///
/// Among all definitions that are a subset of `pressed`, the largest one wins,
/// so `{7, 8, 9}` beats `{7}` when all three buttons are held. Equal sizes keep
/// the earliest definition. Returns `None` when no definition is satisfied.
pub fn match_combo(pressed: &BTreeSet<u16>, definitions: &[ButtonSet]) -> Option<Position> {
    let mut best: Option<(Position, usize)> = None;

    for (index, combo) in definitions.iter().take(POSITION_COUNT).enumerate() {
        if !combo.is_subset(pressed) {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, best_len)) => combo.len() > best_len,
        };
        if better {
            best = Some((Position(index as u8), combo.len()));
        }
    }

    best.map(|(position, _)| position)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(buttons: &[u16]) -> ButtonSet {
        buttons.iter().copied().collect()
    }

    fn default_layout() -> Vec<ButtonSet> {
        vec![
            set(&[9]),
            set(&[8]),
            set(&[8, 9]),
            set(&[7]),
            set(&[7, 9]),
            set(&[7, 8]),
            set(&[7, 8, 9]),
            set(&[6]),
            set(&[6, 9]),
            set(&[6, 8]),
            set(&[6, 8, 9]),
            set(&[6, 7]),
            set(&[6, 7, 9]),
            set(&[6, 7, 8]),
            set(&[6, 7, 8, 9]),
        ]
    }

    #[test]
    fn test_largest_subset_wins() {
        let layout = default_layout();
        assert_eq!(match_combo(&set(&[7, 8, 9]), &layout), Position::new(6));
        assert_eq!(match_combo(&set(&[7]), &layout), Position::new(3));
        assert_eq!(match_combo(&set(&[6, 7, 8, 9]), &layout), Position::new(14));
    }

    #[test]
    fn test_extra_buttons_ignored() {
        let layout = default_layout();
        // Button 2 is not part of any notch.
        assert_eq!(match_combo(&set(&[2, 6, 8]), &layout), Some(Position::NEUTRAL));
    }

    #[test]
    fn test_no_match() {
        let layout = default_layout();
        assert_eq!(match_combo(&set(&[]), &layout), None);
        assert_eq!(match_combo(&set(&[1, 2]), &layout), None);
    }

    #[test]
    fn test_tie_goes_to_earliest() {
        let layout = vec![set(&[1, 2]), set(&[2, 3]), set(&[1])];
        assert_eq!(match_combo(&set(&[1, 2, 3]), &layout), Position::new(0));
    }

    #[test]
    fn test_empty_definition_matches_anything() {
        let layout = vec![set(&[4]), set(&[])];
        assert_eq!(match_combo(&set(&[]), &layout), Position::new(1));
        assert_eq!(match_combo(&set(&[4]), &layout), Position::new(0));
    }

    #[test]
    fn test_matches_brute_force_reference() {
        let layout = default_layout();
        // Every pressed set over buttons 5..=10.
        for mask in 0u32..64 {
            let pressed: ButtonSet = (0..6).filter(|b| mask & (1 << b) != 0).map(|b| b + 5).collect();
            let expected = layout
                .iter()
                .enumerate()
                .filter(|(_, c)| c.is_subset(&pressed))
                .map(|(i, c)| (c.len(), std::cmp::Reverse(i)))
                .max()
                .map(|(_, std::cmp::Reverse(i))| Position::new(i).unwrap());
            assert_eq!(match_combo(&pressed, &layout), expected, "pressed {:?}", pressed);
        }
    }

    #[test]
    fn test_position_names_and_parse() {
        assert_eq!(Position::NEUTRAL.name(), "Neutral");
        assert_eq!("b9".parse::<Position>(), Ok(Position::new(0).unwrap()));
        assert_eq!("N".parse::<Position>(), Ok(Position::NEUTRAL));
        assert_eq!("14".parse::<Position>().map(Position::name), Ok("P5"));
        assert!("15".parse::<Position>().is_err());
        assert!("P6".parse::<Position>().is_err());
    }

    #[test]
    fn test_step_toward() {
        let b6 = Position::new(3).unwrap();
        assert_eq!(b6.step_toward(Position::NEUTRAL), Position::new(4));
        assert_eq!(Position::NEUTRAL.step_toward(b6), Position::new(8));
        assert_eq!(b6.step_toward(b6), None);
    }
}
