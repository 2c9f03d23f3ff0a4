//! Mascon Translator - train controller lever to keyboard/mouse input
//!
//! Reads a mascon controller through evdev and types into the focused game
//! through a uinput virtual device.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ProfileCommands};
use mascon_translator::auxiliary::AuxFunction;
use mascon_translator::clock::SystemClock;
use mascon_translator::combo::Position;
use mascon_translator::config::{Config, TimingField};
use mascon_translator::device::{self, ButtonSource, EvdevJoystick};
use mascon_translator::engine::Engine;
use mascon_translator::keys::KeyId;
use mascon_translator::learn::{self, LeverRecorder};
use mascon_translator::output::OutputMode;
use mascon_translator::profile::ProfileManager;
use mascon_translator::settings::AppSettings;
use mascon_translator::sink::UinputSink;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// Wait before trying to reconnect a lost controller.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Mascon Translator starting...");

    let command = cli.command.unwrap_or(Commands::Run {
        profile: None,
        device: None,
        mode: None,
    });

    match command {
        Commands::Run { profile, device, mode } => run(profile, device, mode),
        Commands::Devices => list_devices(),
        Commands::LearnLever { profile, device } => learn_lever(profile, device),
        Commands::LearnAux { function, profile, device } => learn_aux(function, profile, device),
        Commands::ClearAux { profile } => edit_profile(profile, |config| {
            config.auxiliary.clear();
            println!("All auxiliary mappings cleared.");
            Ok(())
        }),
        Commands::SetKey { position, key, profile } => {
            let key = parse_lever_key(&key)?;
            edit_profile(profile, |config| {
                config.lever.keys[position.index()] = key;
                match key {
                    Some(key) => println!("{} -> {}", position, key),
                    None => println!("{} unbound", position),
                }
                Ok(())
            })
        }
        Commands::SetTiming { timing, ms, profile } => edit_profile(profile, |config| {
            let stored = config.timing.set(timing, ms);
            if stored != ms {
                println!("{} raised to the minimum of {} ms", timing, stored);
            }
            println!("{} = {} ms", timing, stored);
            Ok(())
        }),
        Commands::SetMode { mode, profile } => edit_profile(profile, |config| {
            config.output_mode = mode;
            println!("Output mode: {}", mode);
            Ok(())
        }),
        Commands::Profile(cmd) => profile_command(cmd),
        Commands::Settings => {
            let settings = AppSettings::load()?;
            print!("{}", toml::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

/// Profile named on the command line, or the configured default.
fn resolve_profile_name(profile: Option<String>) -> Result<String> {
    match profile {
        Some(name) => Ok(name),
        None => Ok(AppSettings::load()?.default_profile),
    }
}

/// Load a profile, apply `edit`, save it back.
fn edit_profile(profile: Option<String>, edit: impl FnOnce(&mut Config) -> Result<()>) -> Result<()> {
    let name = resolve_profile_name(profile)?;
    let manager = ProfileManager::new()?;
    let mut config = manager.load_profile(&name)?;
    edit(&mut config)?;
    config.validate()?;
    manager.save_profile(&config)?;
    Ok(())
}

/// `0` and `none` unbind; anything else must be a known key.
fn parse_lever_key(text: &str) -> Result<Option<KeyId>> {
    let trimmed = text.trim();
    if trimmed == "0" || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    text.parse::<KeyId>()
        .map(Some)
        .map_err(|e| anyhow::anyhow!(e))
}

fn run(profile: Option<String>, device_path: Option<PathBuf>, mode: Option<OutputMode>) -> Result<()> {
    let mut settings = AppSettings::load()?;
    let profile_name = profile.unwrap_or_else(|| settings.default_profile.clone());
    let mut config = ProfileManager::new()?.load_profile(&profile_name)?;
    if let Some(mode) = mode {
        config.output_mode = mode;
    }
    config.validate()?;

    info!("Profile '{}', output mode: {}", config.name, config.output_mode);

    let mut sink = UinputSink::new(config.used_keys()).context("Is /dev/uinput writable?")?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    let preferred = device_path.or_else(|| settings.last_device.clone());
    let mut clock = SystemClock;

    println!("Input translation active. Press Ctrl-C to exit.");

    while !stop.load(Ordering::SeqCst) {
        let mut joystick = match device::select_joystick(preferred.as_deref()) {
            Ok(joystick) => joystick,
            Err(e) => {
                warn!("{}; retrying", e);
                wait_for_retry(&stop);
                continue;
            }
        };

        if let Err(e) = settings.remember_device(joystick.path()) {
            warn!("Failed to save last device: {:#}", e);
        }
        check_button_range(&config, &joystick);

        let mut engine = Engine::new(&config);
        match engine.run(&mut joystick, &mut sink, &mut clock, &stop) {
            Ok(()) => break,
            Err(e) if e.is_disconnected() => {
                warn!("Controller '{}' disconnected, waiting for it to return", joystick.name());
            }
            Err(e) => {
                error!("Controller error: {}", e);
            }
        }
        wait_for_retry(&stop);
    }

    info!("Mascon Translator shutting down");
    Ok(())
}

/// Sleep up to `RECONNECT_DELAY`, waking early on Ctrl-C.
fn wait_for_retry(stop: &AtomicBool) {
    let slice = Duration::from_millis(100);
    let mut waited = Duration::ZERO;
    while waited < RECONNECT_DELAY && !stop.load(Ordering::SeqCst) {
        thread::sleep(slice);
        waited += slice;
    }
}

fn check_button_range(config: &Config, joystick: &EvdevJoystick) {
    let missing = device::out_of_range(&config.referenced_buttons(), joystick.button_count());
    if !missing.is_empty() {
        warn!(
            "'{}' has {} buttons; profile uses {:?} which it cannot report",
            joystick.name(),
            joystick.button_count(),
            missing
        );
    }
}

fn list_devices() -> Result<()> {
    let joysticks = device::list_joysticks();
    if joysticks.is_empty() {
        println!("No joysticks found (check permissions on /dev/input/event*)");
        return Ok(());
    }

    let last = AppSettings::load()?.last_device;
    for j in &joysticks {
        let marker = if last.as_deref() == Some(j.path.as_path()) { "*" } else { " " };
        println!("{} {}  {}  [{} buttons]", marker, j.path.display(), j.name, j.num_buttons);
    }
    Ok(())
}

fn open_joystick(device_path: Option<PathBuf>) -> Result<EvdevJoystick> {
    let settings = AppSettings::load()?;
    let preferred = device_path.or(settings.last_device);
    let joystick = device::select_joystick(preferred.as_deref())?;
    println!("Using {} ({})", joystick.name(), joystick.path().display());
    Ok(joystick)
}

fn learn_lever(profile: Option<String>, device_path: Option<PathBuf>) -> Result<()> {
    let mut joystick = open_joystick(device_path)?;
    let mut recorder = LeverRecorder::new();

    println!("Move the lever to each position as prompted, then press Enter.");
    println!("Press Enter without moving to leave a position empty; type b and Enter to go back.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    while let Some(position) = recorder.next_position() {
        print!("Position {}: ", position);
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            anyhow::bail!("Input closed before all positions were recorded");
        };
        if line?.trim().eq_ignore_ascii_case("b") {
            match recorder.back() {
                Some(redo) => println!("Went back to {}.", redo),
                None => println!("Already at the first position."),
            }
            continue;
        }

        let pressed = learn::capture_pressed(&mut joystick)?;
        recorder.record(pressed.clone());
        if pressed.is_empty() {
            println!("  Recorded buttons: (none)");
        } else {
            println!("  Recorded buttons: {:?}", pressed);
        }
    }

    let positions = recorder.finish()?;
    edit_profile(profile, |config| {
        config.lever.positions = positions;
        Ok(())
    })?;
    println!("Remapping complete!");
    Ok(())
}

fn learn_aux(function: AuxFunction, profile: Option<String>, device_path: Option<PathBuf>) -> Result<()> {
    let mut joystick = open_joystick(device_path)?;

    println!(
        "Press the button for {} ({}) within {} s...",
        function,
        function.key(),
        learn::CAPTURE_TIMEOUT.as_secs()
    );
    let button = learn::capture_new_button(
        &mut joystick,
        &mut SystemClock,
        learn::CAPTURE_TIMEOUT,
        learn::CAPTURE_POLL_INTERVAL,
    )?;

    edit_profile(profile, |config| {
        config.auxiliary.set_button(function, Some(button));
        Ok(())
    })?;
    println!("{} mapped to button {}", function, button);
    Ok(())
}

fn profile_command(cmd: ProfileCommands) -> Result<()> {
    let manager = ProfileManager::new()?;

    match cmd {
        ProfileCommands::List => {
            let default = AppSettings::load()?.default_profile;
            for name in manager.list_profiles()? {
                let marker = if name == default { "*" } else { " " };
                println!("{} {}", marker, name);
            }
        }
        ProfileCommands::Show { name } => {
            let config = manager.load_profile(&resolve_profile_name(name)?)?;
            print!("{}", toml::to_string_pretty(&config)?);
            print_lever_summary(&config);
        }
        ProfileCommands::Copy { name } => {
            let copy = manager.duplicate_profile(&name)?;
            println!("Copied '{}' to '{}'", name, copy);
        }
        ProfileCommands::Rename { from, to } => {
            manager.rename_profile(&from, &to)?;
            let mut settings = AppSettings::load()?;
            if settings.default_profile == from {
                settings.set_default_profile(&ProfileManager::sanitize_filename(to.trim()))?;
            }
            println!("Renamed '{}'", from);
        }
        ProfileCommands::Delete { name } => {
            manager.delete_profile(&name)?;
            let mut settings = AppSettings::load()?;
            if settings.default_profile == name {
                settings.set_default_profile(mascon_translator::profile::DEFAULT_PROFILE)?;
            }
            println!("Deleted '{}'", name);
        }
        ProfileCommands::Reset { name } => {
            manager.save_profile(&Config::new(name.as_str()))?;
            println!("Profile '{}' reset to defaults", name);
        }
        ProfileCommands::Use { name } => {
            if !manager.profile_exists(&name) {
                // Materialize so later edits have a file to work on.
                manager.save_profile(&manager.load_profile(&name)?)?;
            }
            AppSettings::load()?.set_default_profile(&name)?;
            println!("Default profile: {}", name);
        }
    }
    Ok(())
}

fn print_lever_summary(config: &Config) {
    println!();
    for field in TimingField::ALL {
        println!("{:>14}  {} ms", field.name(), config.timing.get(field));
    }
    println!();
    for position in Position::all() {
        let buttons = &config.lever.positions[position.index()];
        let key = config.lever.keys[position.index()]
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:>8}  buttons {:<16}  key {}", position.name(), format!("{:?}", buttons), key);
    }
}

