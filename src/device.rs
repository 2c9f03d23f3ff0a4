//! Controller detection and button polling
//!
//! Mascon controllers show up as ordinary joysticks. Buttons are numbered the
//! way SDL numbers them on Linux, so button indices learned with other tools
//! carry over: codes from `BTN_JOYSTICK` upward first, then the `BTN_MISC`
//! range below it.

use evdev::{Device, Key};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Raw set of pressed button indices for one poll.
pub type PressedSet = BTreeSet<u16>;

const BTN_MISC: u16 = 0x100;
const BTN_JOYSTICK: u16 = 0x120;
const BTN_DIGI: u16 = 0x140;
const BTN_TRIGGER_HAPPY: u16 = 0x2c0;
const KEY_MAX: u16 = 0x2ff;

/// Errors from the controller side
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read button state: {0}")]
    Read(#[source] std::io::Error),
    #[error("Device {0:?} has no joystick buttons")]
    NoButtons(PathBuf),
    #[error("No joystick found")]
    NotFound,
}

impl DeviceError {
    /// The controller went away (unplugged), as opposed to a transient failure.
    pub fn is_disconnected(&self) -> bool {
        match self {
            DeviceError::Read(e) | DeviceError::Open { source: e, .. } => {
                e.raw_os_error() == Some(libc::ENODEV) || e.kind() == std::io::ErrorKind::NotFound
            }
            DeviceError::NotFound => true,
            DeviceError::NoButtons(_) => false,
        }
    }
}

/// Anything that can report which buttons are held right now.
pub trait ButtonSource {
    /// Current pressed buttons. Called once per tick, as fast as the loop runs.
    fn poll(&mut self) -> Result<PressedSet, DeviceError>;

    fn button_count(&self) -> usize;
}

/// Information about a detected joystick
#[derive(Debug, Clone)]
pub struct JoystickInfo {
    pub path: PathBuf,
    pub name: String,
    pub num_buttons: usize,
}

/// Order joystick button codes the way SDL indexes them.
pub fn sdl_button_order(codes: impl IntoIterator<Item = u16>) -> Vec<u16> {
    let codes: BTreeSet<u16> = codes.into_iter().collect();
    let high = codes.iter().copied().filter(|&c| (BTN_JOYSTICK..=KEY_MAX).contains(&c));
    let low = codes.iter().copied().filter(|&c| (BTN_MISC..BTN_JOYSTICK).contains(&c));
    high.chain(low).collect()
}

/// Button codes a device exposes, in index order.
fn button_codes(dev: &Device) -> Vec<u16> {
    let Some(keys) = dev.supported_keys() else {
        return Vec::new();
    };
    sdl_button_order(keys.iter().map(|k| k.code()))
}

/// Joystick or gamepad buttons, as opposed to mouse buttons or keyboard keys.
fn is_joystick_codes(codes: impl IntoIterator<Item = u16>) -> bool {
    codes
        .into_iter()
        .any(|code| (BTN_JOYSTICK..BTN_DIGI).contains(&code) || code >= BTN_TRIGGER_HAPPY)
}

fn looks_like_joystick(dev: &Device) -> bool {
    dev.supported_keys()
        .map(|keys| is_joystick_codes(keys.iter().map(|k| k.code())))
        .unwrap_or(false)
}

/// evdev joystick opened for polling
pub struct EvdevJoystick {
    device: Device,
    path: PathBuf,
    name: String,
    /// Button codes indexed by button number.
    buttons: Vec<u16>,
}

impl EvdevJoystick {
    pub fn open(path: &Path) -> Result<Self, DeviceError> {
        let device = Device::open(path).map_err(|source| DeviceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let name = device.name().unwrap_or("Unknown").to_string();
        let buttons = button_codes(&device);
        if buttons.is_empty() {
            return Err(DeviceError::NoButtons(path.to_path_buf()));
        }

        info!("Opened joystick {:?} '{}' with {} buttons", path, name, buttons.len());
        debug!("Button codes: {:04x?}", buttons);

        Ok(Self {
            device,
            path: path.to_path_buf(),
            name,
            buttons,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_joystick(&self) -> bool {
        is_joystick_codes(self.buttons.iter().copied())
    }
}

impl ButtonSource for EvdevJoystick {
    fn poll(&mut self) -> Result<PressedSet, DeviceError> {
        // EVIOCGKEY: the state at call time, independent of queued events.
        let state = self.device.get_key_state().map_err(DeviceError::Read)?;
        Ok(self
            .buttons
            .iter()
            .enumerate()
            .filter(|&(_, &code)| state.contains(Key::new(code)))
            .map(|(index, _)| index as u16)
            .collect())
    }

    fn button_count(&self) -> usize {
        self.buttons.len()
    }
}

/// List joysticks, via udev when available and evdev enumeration otherwise.
pub fn list_joysticks() -> Vec<JoystickInfo> {
    let mut paths = match udev_joystick_nodes() {
        Ok(paths) => paths,
        Err(e) => {
            warn!("udev enumeration failed ({}), scanning /dev/input directly", e);
            Vec::new()
        }
    };

    if paths.is_empty() {
        paths = evdev::enumerate()
            .filter(|(_, dev)| looks_like_joystick(dev))
            .map(|(path, _)| path)
            .collect();
    }

    paths.sort();
    paths.dedup();

    let mut joysticks = Vec::new();
    for path in paths {
        match Device::open(&path) {
            Ok(dev) => {
                let num_buttons = button_codes(&dev).len();
                if num_buttons == 0 {
                    continue;
                }
                joysticks.push(JoystickInfo {
                    name: dev.name().unwrap_or("Unknown").to_string(),
                    path,
                    num_buttons,
                });
            }
            Err(e) => {
                warn!("Failed to open candidate joystick {:?}: {}", path, e);
            }
        }
    }
    joysticks
}

/// event* nodes udev tags as joysticks
fn udev_joystick_nodes() -> std::io::Result<Vec<PathBuf>> {
    let mut enumerator = udev::Enumerator::new()?;
    enumerator.match_subsystem("input")?;
    enumerator.match_property("ID_INPUT_JOYSTICK", "1")?;

    let mut paths = Vec::new();
    for device in enumerator.scan_devices()? {
        if let Some(node) = device.devnode() {
            let is_event = node
                .file_name()
                .map(|n| n.to_string_lossy().starts_with("event"))
                .unwrap_or(false);
            if is_event {
                paths.push(node.to_path_buf());
            }
        }
    }
    Ok(paths)
}

/// Open the preferred joystick if it is still one, otherwise the first one found.
///
/// Event node numbers change across reboots, so a remembered path may now
/// belong to a mouse or keyboard.
pub fn select_joystick(preferred: Option<&Path>) -> Result<EvdevJoystick, DeviceError> {
    if let Some(path) = preferred {
        if path.exists() {
            match EvdevJoystick::open(path) {
                Ok(joystick) if joystick.is_joystick() => return Ok(joystick),
                Ok(other) => {
                    warn!("{:?} is now '{}', not a joystick, searching", path, other.name());
                }
                Err(e) => warn!("{}, searching", e),
            }
        } else {
            warn!("Preferred joystick {:?} not present, searching", path);
        }
    }

    let joysticks = list_joysticks();
    let first = joysticks.first().ok_or(DeviceError::NotFound)?;
    EvdevJoystick::open(&first.path)
}

/// Whether any joystick button index in `buttons` is beyond what the device has.
pub fn out_of_range<'a>(buttons: impl IntoIterator<Item = &'a u16>, button_count: usize) -> Vec<u16> {
    let mut missing: Vec<u16> = buttons
        .into_iter()
        .copied()
        .filter(|&b| b as usize >= button_count)
        .collect();
    missing.sort_unstable();
    missing.dedup();
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    const BTN_GAMEPAD: u16 = 0x130;

    #[test]
    fn test_sdl_button_order() {
        // BTN_TRIGGER, BTN_THUMB, BTN_A, a BTN_MISC-range code, a trigger-happy code
        let order = sdl_button_order([0x130, 0x100, 0x2c0, 0x121, 0x120]);
        assert_eq!(order, vec![0x120, 0x121, 0x130, 0x2c0, 0x100]);
    }

    #[test]
    fn test_sdl_button_order_ignores_keyboard_keys() {
        let order = sdl_button_order([28, 57, 0x120, BTN_GAMEPAD]);
        assert_eq!(order, vec![0x120, BTN_GAMEPAD]);
    }

    #[test]
    fn test_is_joystick_codes() {
        // BTN_LEFT..BTN_EXTRA
        assert!(!is_joystick_codes(0x110..=0x114));
        // Keyboard with a few BTN_MISC-range keys
        assert!(!is_joystick_codes([28, 57, 0x100, 0x101]));
        assert!(!is_joystick_codes(std::iter::empty()));

        assert!(is_joystick_codes(0x120..=0x12b));
        assert!(is_joystick_codes([0x110, BTN_GAMEPAD]));
        assert!(is_joystick_codes([0x2c0]));
    }

    #[test]
    fn test_out_of_range() {
        let buttons = [3u16, 12, 12, 20];
        assert_eq!(out_of_range(&buttons, 13), vec![20]);
        assert!(out_of_range(&buttons, 32).is_empty());
    }

    #[test]
    fn test_is_disconnected() {
        let unplugged = DeviceError::Read(std::io::Error::from_raw_os_error(libc::ENODEV));
        assert!(unplugged.is_disconnected());
        let busy = DeviceError::Read(std::io::Error::from_raw_os_error(libc::EBUSY));
        assert!(!busy.is_disconnected());
        assert!(DeviceError::NotFound.is_disconnected());
    }

    #[test]
    #[ignore] // Requires a connected controller
    fn test_list_joysticks() {
        let joysticks = list_joysticks();
        println!("Found {} joysticks", joysticks.len());
        for j in &joysticks {
            println!("  {:?} '{}' [{} buttons]", j.path, j.name, j.num_buttons);
        }
    }
}
