//! Synthetic key identities
//!
//! The engine never deals in raw platform key codes. Every key it emits is a
//! [`KeyId`], resolved from a human-readable name through the table below.
//! The table uses Linux input event codes, which only the uinput sink turns
//! into `evdev::Key` values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque identity of a key the translator can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "KeyRepr", into = "String")]
pub struct KeyId(u16);

/// Key names accepted in profiles: either a name string or a raw code.
#[derive(Deserialize)]
#[serde(untagged)]
enum KeyRepr {
    Name(String),
    Code(u16),
}

/// Name table: (canonical name, event code).
const KEY_TABLE: &[(&str, u16)] = &[
    ("ESC", 1),
    ("1", 2),
    ("2", 3),
    ("3", 4),
    ("4", 5),
    ("5", 6),
    ("6", 7),
    ("7", 8),
    ("8", 9),
    ("9", 10),
    ("0", 11),
    ("MINUS", 12),
    ("EQUAL", 13),
    ("BACKSPACE", 14),
    ("TAB", 15),
    ("Q", 16),
    ("W", 17),
    ("E", 18),
    ("R", 19),
    ("T", 20),
    ("Y", 21),
    ("U", 22),
    ("I", 23),
    ("O", 24),
    ("P", 25),
    ("LEFTBRACE", 26),
    ("RIGHTBRACE", 27),
    ("ENTER", 28),
    ("LEFTCTRL", 29),
    ("A", 30),
    ("S", 31),
    ("D", 32),
    ("F", 33),
    ("G", 34),
    ("H", 35),
    ("J", 36),
    ("K", 37),
    ("L", 38),
    ("SEMICOLON", 39),
    ("APOSTROPHE", 40),
    ("GRAVE", 41),
    ("LEFTSHIFT", 42),
    ("BACKSLASH", 43),
    ("Z", 44),
    ("X", 45),
    ("C", 46),
    ("V", 47),
    ("B", 48),
    ("N", 49),
    ("M", 50),
    ("COMMA", 51),
    ("DOT", 52),
    ("SLASH", 53),
    ("RIGHTSHIFT", 54),
    ("KPASTERISK", 55),
    ("LEFTALT", 56),
    ("SPACE", 57),
    ("CAPSLOCK", 58),
    ("F1", 59),
    ("F2", 60),
    ("F3", 61),
    ("F4", 62),
    ("F5", 63),
    ("F6", 64),
    ("F7", 65),
    ("F8", 66),
    ("F9", 67),
    ("F10", 68),
    ("NUMLOCK", 69),
    ("SCROLLLOCK", 70),
    ("KP7", 71),
    ("KP8", 72),
    ("KP9", 73),
    ("KPMINUS", 74),
    ("KP4", 75),
    ("KP5", 76),
    ("KP6", 77),
    ("KPPLUS", 78),
    ("KP1", 79),
    ("KP2", 80),
    ("KP3", 81),
    ("KP0", 82),
    ("KPDOT", 83),
    ("F11", 87),
    ("F12", 88),
    ("KPENTER", 96),
    ("RIGHTCTRL", 97),
    ("KPSLASH", 98),
    ("RIGHTALT", 100),
    ("HOME", 102),
    ("UP", 103),
    ("PAGEUP", 104),
    ("LEFT", 105),
    ("RIGHT", 106),
    ("END", 107),
    ("DOWN", 108),
    ("PAGEDOWN", 109),
    ("INSERT", 110),
    ("DELETE", 111),
    ("PAUSE", 119),
    ("LEFTMETA", 125),
    ("RIGHTMETA", 126),
    ("F13", 183),
    ("F14", 184),
    ("F15", 185),
    ("F16", 186),
    ("F17", 187),
    ("F18", 188),
    ("F19", 189),
    ("F20", 190),
    ("F21", 191),
    ("F22", 192),
    ("F23", 193),
    ("F24", 194),
];

/// Single-character and common aliases for table entries.
const KEY_ALIASES: &[(&str, &str)] = &[
    ("[", "LEFTBRACE"),
    ("]", "RIGHTBRACE"),
    ("-", "MINUS"),
    ("=", "EQUAL"),
    (";", "SEMICOLON"),
    ("'", "APOSTROPHE"),
    ("`", "GRAVE"),
    ("\\", "BACKSLASH"),
    (",", "COMMA"),
    (".", "DOT"),
    ("/", "SLASH"),
    (" ", "SPACE"),
    ("RETURN", "ENTER"),
    ("ESCAPE", "ESC"),
    ("SHIFT", "LEFTSHIFT"),
    ("LSHIFT", "LEFTSHIFT"),
    ("RSHIFT", "RIGHTSHIFT"),
    ("CTRL", "LEFTCTRL"),
    ("LCTRL", "LEFTCTRL"),
    ("RCTRL", "RIGHTCTRL"),
    ("ALT", "LEFTALT"),
    ("LALT", "LEFTALT"),
    ("RALT", "RIGHTALT"),
    ("PGUP", "PAGEUP"),
    ("PGDN", "PAGEDOWN"),
    ("DEL", "DELETE"),
    ("INS", "INSERT"),
];

impl KeyId {
    pub const ENTER: KeyId = KeyId(28);
    pub const SPACE: KeyId = KeyId(57);
    pub const LEFT_BRACE: KeyId = KeyId(26);
    pub const LEFT_SHIFT: KeyId = KeyId(42);
    pub const RIGHT_SHIFT: KeyId = KeyId(54);
    pub const UP: KeyId = KeyId(103);
    pub const DOWN: KeyId = KeyId(108);

    /// Resolve a key by name (`"ENTER"`, `"key_space"`, `"["`, `"F13"`) or by
    /// numeric code (`"28"`, `"0x1c"`).
    ///
    /// Returns `None` for unknown names and for code 0, which means "no key".
    pub fn from_name(name: &str) -> Option<KeyId> {
        // A lone space is a valid alias, so only trim when there is something else.
        let trimmed = if name.trim().is_empty() { name } else { name.trim() };
        if trimmed.is_empty() {
            return None;
        }

        if let Some(code) = parse_code(trimmed) {
            return KeyId::from_code(code);
        }

        let upper = trimmed.to_ascii_uppercase();
        let upper = upper.strip_prefix("KEY_").unwrap_or(&upper);
        let canonical = KEY_ALIASES
            .iter()
            .find(|(alias, _)| *alias == upper)
            .map(|(_, target)| *target)
            .unwrap_or(upper);

        KEY_TABLE
            .iter()
            .find(|(n, _)| *n == canonical)
            .map(|&(_, code)| KeyId(code))
    }

    /// Wrap a raw event code. Code 0 is reserved and yields `None`.
    pub fn from_code(code: u16) -> Option<KeyId> {
        if code == 0 { None } else { Some(KeyId(code)) }
    }

    /// Raw Linux input event code.
    pub fn code(self) -> u16 {
        self.0
    }

    /// Canonical display name, or `KEY_<code>` for codes outside the table.
    pub fn name(self) -> String {
        KEY_TABLE
            .iter()
            .find(|&&(_, code)| code == self.0)
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| format!("KEY_{}", self.0))
    }
}

fn parse_code(text: &str) -> Option<u16> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u16::from_str_radix(hex, 16).ok();
    }
    // Single digits are key names ("1" is KEY_1), not codes.
    if text.len() > 1 && text.chars().all(|c| c.is_ascii_digit()) {
        return text.parse().ok();
    }
    None
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for KeyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyId::from_name(s).ok_or_else(|| format!("unknown key: \"{s}\""))
    }
}

impl From<KeyId> for String {
    fn from(key: KeyId) -> String {
        key.name()
    }
}

impl TryFrom<KeyRepr> for KeyId {
    type Error = String;

    fn try_from(repr: KeyRepr) -> Result<Self, Self::Error> {
        match repr {
            KeyRepr::Name(name) => name.parse(),
            KeyRepr::Code(code) => {
                KeyId::from_code(code).ok_or_else(|| "key code 0 is not a key".to_string())
            }
        }
    }
}

/// Serde helpers for a list of optional key bindings.
///
/// TOML has no null, so an unbound slot is written as an empty string and
/// `""`, `"none"` or `0` all read back as unbound.
pub mod key_slots {
    use super::KeyId;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SlotRepr {
        Name(String),
        Code(u16),
    }

    pub fn serialize<S: Serializer>(slots: &[Option<KeyId>], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(slots.iter().map(|slot| match slot {
            Some(key) => key.name(),
            None => String::new(),
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Option<KeyId>>, D::Error> {
        let raw = Vec::<SlotRepr>::deserialize(d)?;
        raw.into_iter()
            .map(|slot| match slot {
                SlotRepr::Code(code) => Ok(KeyId::from_code(code)),
                SlotRepr::Name(name) => {
                    let trimmed = name.trim();
                    if name.is_empty() || trimmed.eq_ignore_ascii_case("none") || trimmed == "0" {
                        Ok(None)
                    } else {
                        KeyId::from_name(&name).map(Some).ok_or_else(|| {
                            serde::de::Error::custom(format!("unknown key name: \"{name}\""))
                        })
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_canonical_and_aliases() {
        assert_eq!(KeyId::from_name("ENTER"), Some(KeyId::ENTER));
        assert_eq!(KeyId::from_name("key_enter"), Some(KeyId::ENTER));
        assert_eq!(KeyId::from_name("return"), Some(KeyId::ENTER));
        assert_eq!(KeyId::from_name("["), Some(KeyId::LEFT_BRACE));
        assert_eq!(KeyId::from_name("rshift"), Some(KeyId::RIGHT_SHIFT));
        assert_eq!(KeyId::from_name(" "), Some(KeyId::SPACE));
        assert_eq!(KeyId::from_name("bogus"), None);
        assert_eq!(KeyId::from_name(""), None);
    }

    #[test]
    fn test_digits_are_keys_not_codes() {
        assert_eq!(KeyId::from_name("1").map(KeyId::code), Some(2));
        assert_eq!(KeyId::from_name("28"), Some(KeyId::ENTER));
        assert_eq!(KeyId::from_name("0x1c"), Some(KeyId::ENTER));
        assert_eq!(KeyId::from_name("0x0"), None);
    }

    #[test]
    fn test_name() {
        assert_eq!(KeyId::UP.name(), "UP");
        assert_eq!(KeyId::DOWN.to_string(), "DOWN");
        assert_eq!(KeyId::from_code(999).unwrap().name(), "KEY_999");
    }

    #[test]
    fn test_key_slots_toml() {
        #[derive(Serialize, Deserialize)]
        struct Slots {
            #[serde(with = "key_slots")]
            keys: Vec<Option<KeyId>>,
        }

        let parsed: Slots = toml::from_str(r#"keys = ["A", "", "none", 28, 0]"#).unwrap();
        assert_eq!(
            parsed.keys,
            vec![KeyId::from_name("A"), None, None, Some(KeyId::ENTER), None]
        );

        let text = toml::to_string(&parsed).unwrap();
        assert!(text.contains(r#"keys = ["A", "", "", "ENTER", ""]"#));
    }
}
