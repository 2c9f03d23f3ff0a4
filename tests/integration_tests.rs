//! Integration tests for Mascon Translator
//!
//! These drive the full engine loop with a scripted controller, a recording
//! sink and a virtual clock. Tests that require hardware live in
//! `hardware_tests.rs`.

use mascon_translator::auxiliary::AuxFunction;
use mascon_translator::clock::ManualClock;
use mascon_translator::combo::{ButtonSet, POSITION_COUNT, Position};
use mascon_translator::config::Config;
use mascon_translator::device::{ButtonSource, DeviceError, PressedSet};
use mascon_translator::engine::Engine;
use mascon_translator::keys::KeyId;
use mascon_translator::output::OutputMode;
use mascon_translator::profile::ProfileManager;
use mascon_translator::sink::{RecordingSink, SinkEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Controller that plays back (buttons, duration) segments in virtual time.
///
/// Each poll costs 1 ms. Once the script is exhausted it raises `stop`.
struct ScriptedLever<'a> {
    clock: ManualClock,
    /// Buttons and the virtual time their segment ends.
    script: Vec<(PressedSet, Duration)>,
    stop: &'a AtomicBool,
}

impl<'a> ScriptedLever<'a> {
    fn new(clock: &ManualClock, stop: &'a AtomicBool, segments: &[(&[u16], u64)]) -> Self {
        let mut end = clock.elapsed();
        let script = segments
            .iter()
            .map(|(buttons, ms)| {
                end += Duration::from_millis(*ms);
                (buttons.iter().copied().collect(), end)
            })
            .collect();
        Self {
            clock: clock.clone(),
            script,
            stop,
        }
    }
}

impl ButtonSource for ScriptedLever<'_> {
    fn poll(&mut self) -> Result<PressedSet, DeviceError> {
        self.clock.advance(Duration::from_millis(1));
        let now = self.clock.elapsed();
        match self.script.iter().find(|(_, end)| now < *end) {
            Some((pressed, _)) => Ok(pressed.clone()),
            None => {
                // Buttons stay where the script left them.
                self.stop.store(true, Ordering::SeqCst);
                Ok(self.script.last().map(|(p, _)| p.clone()).unwrap_or_default())
            }
        }
    }

    fn button_count(&self) -> usize {
        13
    }
}

/// Run `config` against the script and return what was typed.
fn run_script(config: &Config, segments: &[(&[u16], u64)]) -> RecordingSink {
    let mut clock = ManualClock::new();
    let mut sink = RecordingSink::with_clock(clock.clone());
    let stop = AtomicBool::new(false);
    let mut lever = ScriptedLever::new(&clock, &stop, segments);

    let mut engine = Engine::new(config);
    engine
        .run(&mut lever, &mut sink, &mut clock, &stop)
        .expect("scripted source never fails");
    sink
}

/// Buttons of notch `index` in the stock layout.
fn notch(index: usize) -> Vec<u16> {
    Config::default().lever.positions[index].iter().copied().collect()
}

fn press_times(sink: &RecordingSink, key: KeyId) -> Vec<Duration> {
    sink.recorded()
        .iter()
        .filter(|r| r.event == SinkEvent::Press(key))
        .map(|r| r.at)
        .collect()
}

/// Neutral on no buttons, notch 7 on button 7, nothing else reachable.
#[test]
fn test_single_notch_settles_after_debounce() {
    let mut config = Config::default();
    config.lever.positions = (0..POSITION_COUNT as u16)
        .map(|i| ButtonSet::from([100 + i]))
        .collect();
    config.lever.positions[9] = ButtonSet::new();
    config.lever.positions[7] = ButtonSet::from([7]);
    config.validate().unwrap();

    let sink = run_script(&config, &[(&[], 50), (&[7], 40)]);

    // Neutral is only a baseline; the 40 ms hold yields exactly one step toward 7.
    assert_eq!(
        sink.events(),
        vec![SinkEvent::Press(KeyId::UP), SinkEvent::Release(KeyId::UP)]
    );
    let pressed_at = press_times(&sink, KeyId::UP)[0];
    assert_eq!(pressed_at, Duration::from_millis(80));
}

#[test]
fn test_jump_to_neutral_walks_six_notches() {
    let config = Config::default();
    let sink = run_script(&config, &[(&notch(3), 100), (&notch(9), 1000)]);

    assert_eq!(sink.pulses_of(KeyId::DOWN), 6);
    assert_eq!(sink.pulses_of(KeyId::UP), 0);

    let presses = press_times(&sink, KeyId::DOWN);
    for pair in presses.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(10 + 25));
    }
}

#[test]
fn test_full_sweep_in_scroll_mode() {
    let mut config = Config::default();
    config.output_mode = OutputMode::MouseScroll;

    let sink = run_script(&config, &[(&notch(0), 100), (&notch(14), 2000)]);
    let events = sink.events();
    assert_eq!(events.len(), 14);
    assert!(events.iter().all(|e| *e == SinkEvent::Scroll(-1)));

    let sink = run_script(&config, &[(&notch(14), 100), (&notch(12), 500)]);
    assert_eq!(sink.events(), vec![SinkEvent::Scroll(1), SinkEvent::Scroll(1)]);
}

#[test]
fn test_credit_repeats_while_held() {
    let mut config = Config::default();
    config.auxiliary.set_button(AuxFunction::Credit, Some(2));

    let sink = run_script(&config, &[(&[2], 500)]);

    let pulses = sink.pulses_of(KeyId::LEFT_BRACE);
    assert!((9..=11).contains(&pulses), "got {pulses} credit pulses");

    let presses = press_times(&sink, KeyId::LEFT_BRACE);
    assert_eq!(presses[0], Duration::from_millis(1));
    for pair in presses.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(50));
    }
}

#[test]
fn test_horn_tap_is_one_down_one_up() {
    let mut config = Config::default();
    config.auxiliary.set_button(AuxFunction::BigHorn, Some(0));

    let sink = run_script(&config, &[(&[], 10), (&[0], 1), (&[], 10)]);
    assert_eq!(
        sink.events(),
        vec![SinkEvent::Press(KeyId::ENTER), SinkEvent::Release(KeyId::ENTER)]
    );
}

#[test]
fn test_stop_releases_held_pedal() {
    let mut config = Config::default();
    config.auxiliary.set_button(AuxFunction::SmallHorn, Some(1));
    config.auxiliary.set_button(AuxFunction::DebugMission, Some(4));

    // Still held when the script runs out and the loop is told to stop.
    let sink = run_script(&config, &[(&[1, 4], 100)]);
    assert!(sink.held_keys().is_empty());
    assert_eq!(sink.pulses_of(KeyId::SPACE), 1);
    assert_eq!(sink.pulses_of(KeyId::LEFT_SHIFT), 1);
}

#[test]
fn test_saved_profile_drives_lever_keys() {
    let dir = tempfile::TempDir::new().unwrap();
    let manager = ProfileManager::with_directory(dir.path()).unwrap();

    let mut config = Config::new("Direct");
    config.output_mode = OutputMode::LeverKeys;
    config.lever.keys[Position::NEUTRAL.index()] = KeyId::from_name("N");
    config.lever.keys[14] = KeyId::from_name("5");
    manager.save_profile(&config).unwrap();

    let loaded = manager.load_profile("Direct").unwrap();
    assert_eq!(loaded, config);

    let sink = run_script(&loaded, &[(&notch(9), 300), (&notch(14), 300)]);
    assert_eq!(
        sink.events(),
        vec![
            SinkEvent::Press(KeyId::from_name("N").unwrap()),
            SinkEvent::Release(KeyId::from_name("N").unwrap()),
            SinkEvent::Press(KeyId::from_name("5").unwrap()),
            SinkEvent::Release(KeyId::from_name("5").unwrap()),
        ]
    );
}

#[test]
fn test_profile_file_format() {
    let profile_toml = r#"
name = "Handwritten"
output_mode = "arrow-keys"

[timing]
debounce_ms = 40
step_delay_ms = 30

[lever]
positions = [[9], [8], [8, 9], [7], [7, 9], [7, 8], [7, 8, 9], [6], [6, 9], [6, 8], [6, 8, 9], [6, 7], [6, 7, 9], [6, 7, 8], [6, 7, 8, 9]]
keys = ["", "", "", "", "", "", "", "", "", "SPACE", "", "", "", "", ""]

[auxiliary]
big_horn = 0
credit = 3
"#;

    let config: Config = toml::from_str(profile_toml).expect("Should parse TOML");
    config.validate().expect("Should be valid");
    assert_eq!(config.timing.debounce_ms, 40);
    assert_eq!(config.timing.scroll_delay_ms, 20);
    assert_eq!(config.lever.keys[9], Some(KeyId::SPACE));
    assert_eq!(config.auxiliary.button(AuxFunction::Credit), Some(3));

    let reserialized = toml::to_string_pretty(&config).expect("Should serialize");
    let reparsed: Config = toml::from_str(&reserialized).expect("Should parse again");
    assert_eq!(reparsed, config);
}
