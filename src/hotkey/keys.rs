//! Key identities, modifier state and semantic keyboard events
//!
//! Key identities are Windows virtual-key codes. The generic modifier codes
//! (Shift, Ctrl, Alt) and their left/right variants are kept distinct so a
//! descriptor can choose whether to alias them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Virtual-key codes used by the hook and matcher
pub mod vk {
    pub const SPACE: u32 = 0x20;
    pub const SHIFT: u32 = 0x10;
    pub const CONTROL: u32 = 0x11;
    pub const MENU: u32 = 0x12;
    pub const LWIN: u32 = 0x5B;
    pub const RWIN: u32 = 0x5C;
    pub const F1: u32 = 0x70;
    pub const F24: u32 = 0x87;
    pub const LSHIFT: u32 = 0xA0;
    pub const RSHIFT: u32 = 0xA1;
    pub const LCONTROL: u32 = 0xA2;
    pub const RCONTROL: u32 = 0xA3;
    pub const LMENU: u32 = 0xA4;
    pub const RMENU: u32 = 0xA5;
}

/// A physical or generic key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Shift,
    LeftShift,
    RightShift,
    Ctrl,
    LeftCtrl,
    RightCtrl,
    Alt,
    LeftAlt,
    RightAlt,
    LeftWin,
    RightWin,
    /// Any other key, by virtual-key code
    Other(u32),
}

impl Key {
    pub fn from_vk(code: u32) -> Self {
        match code {
            vk::SHIFT => Key::Shift,
            vk::LSHIFT => Key::LeftShift,
            vk::RSHIFT => Key::RightShift,
            vk::CONTROL => Key::Ctrl,
            vk::LCONTROL => Key::LeftCtrl,
            vk::RCONTROL => Key::RightCtrl,
            vk::MENU => Key::Alt,
            vk::LMENU => Key::LeftAlt,
            vk::RMENU => Key::RightAlt,
            vk::LWIN => Key::LeftWin,
            vk::RWIN => Key::RightWin,
            other => Key::Other(other),
        }
    }

    pub fn vk(&self) -> u32 {
        match self {
            Key::Shift => vk::SHIFT,
            Key::LeftShift => vk::LSHIFT,
            Key::RightShift => vk::RSHIFT,
            Key::Ctrl => vk::CONTROL,
            Key::LeftCtrl => vk::LCONTROL,
            Key::RightCtrl => vk::RCONTROL,
            Key::Alt => vk::MENU,
            Key::LeftAlt => vk::LMENU,
            Key::RightAlt => vk::RMENU,
            Key::LeftWin => vk::LWIN,
            Key::RightWin => vk::RWIN,
            Key::Other(code) => *code,
        }
    }

    /// Whether a descriptor configured with `self` accepts a raw `pressed` key.
    ///
    /// Generic Shift, Ctrl and Alt accept either side. Win has no generic
    /// form: each side only matches itself.
    pub fn accepts(&self, pressed: Key) -> bool {
        let pressed = Key::from_vk(pressed.vk());
        match Key::from_vk(self.vk()) {
            Key::Shift => matches!(pressed, Key::Shift | Key::LeftShift | Key::RightShift),
            Key::Ctrl => matches!(pressed, Key::Ctrl | Key::LeftCtrl | Key::RightCtrl),
            Key::Alt => matches!(pressed, Key::Alt | Key::LeftAlt | Key::RightAlt),
            configured => configured == pressed,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Key::from_vk(self.vk()) {
            Key::Shift => write!(f, "Shift"),
            Key::LeftShift => write!(f, "Left Shift"),
            Key::RightShift => write!(f, "Right Shift"),
            Key::Ctrl => write!(f, "Ctrl"),
            Key::LeftCtrl => write!(f, "Left Ctrl"),
            Key::RightCtrl => write!(f, "Right Ctrl"),
            Key::Alt => write!(f, "Alt"),
            Key::LeftAlt => write!(f, "Left Alt"),
            Key::RightAlt => write!(f, "Right Alt"),
            Key::LeftWin => write!(f, "Left Win"),
            Key::RightWin => write!(f, "Right Win"),
            Key::Other(vk::SPACE) => write!(f, "Space"),
            Key::Other(code @ vk::F1..=vk::F24) => write!(f, "F{}", code - vk::F1 + 1),
            Key::Other(code @ (0x30..=0x39 | 0x41..=0x5A)) => {
                write!(f, "{}", char::from(code as u8))
            }
            Key::Other(code) => write!(f, "0x{code:02X}"),
        }
    }
}

/// Error for key names that cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key name: {0:?}")]
pub struct UnknownKey(pub String);

impl FromStr for Key {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();

        let key = match normalized.as_str() {
            "shift" | "shiftkey" => Key::Shift,
            "leftshift" | "lshift" | "lshiftkey" => Key::LeftShift,
            "rightshift" | "rshift" | "rshiftkey" => Key::RightShift,
            "ctrl" | "control" | "controlkey" => Key::Ctrl,
            "leftctrl" | "lctrl" | "leftcontrol" | "lcontrolkey" => Key::LeftCtrl,
            "rightctrl" | "rctrl" | "rightcontrol" | "rcontrolkey" => Key::RightCtrl,
            "alt" | "menu" => Key::Alt,
            "leftalt" | "lalt" | "lmenu" => Key::LeftAlt,
            "rightalt" | "ralt" | "rmenu" | "altgr" => Key::RightAlt,
            "leftwin" | "lwin" => Key::LeftWin,
            "rightwin" | "rwin" => Key::RightWin,
            "space" => Key::Other(vk::SPACE),
            _ => return parse_plain_key(&normalized).ok_or_else(|| UnknownKey(s.to_string())),
        };
        Ok(key)
    }
}

fn parse_plain_key(name: &str) -> Option<Key> {
    if let Some(hex) = name.strip_prefix("0x") {
        return u32::from_str_radix(hex, 16).ok().map(Key::from_vk);
    }
    if let Some(number) = name.strip_prefix('f') {
        if let Ok(n @ 1..=24) = number.parse::<u32>() {
            return Some(Key::Other(vk::F1 + n - 1));
        }
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => {
            Some(Key::Other(c.to_ascii_uppercase() as u32))
        }
        _ => None,
    }
}

impl TryFrom<String> for Key {
    type Error = UnknownKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

/// Modifier keys held (or required)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub win: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
        win: false,
    };

    pub fn is_empty(&self) -> bool {
        !self.ctrl && !self.shift && !self.alt && !self.win
    }

    /// First required modifier missing from `held`, if any
    pub fn first_missing(&self, held: &Modifiers) -> Option<&'static str> {
        [
            (self.ctrl, held.ctrl, "Ctrl"),
            (self.shift, held.shift, "Shift"),
            (self.alt, held.alt, "Alt"),
            (self.win, held.win, "Win"),
        ]
        .into_iter()
        .find(|(required, present, _)| *required && !*present)
        .map(|(_, _, name)| name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.ctrl, "Ctrl"),
            (self.shift, "Shift"),
            (self.alt, "Alt"),
            (self.win, "Win"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }
}

/// One key transition with modifier state sampled at the instant it happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardEvent {
    pub key: Key,
    pub is_down: bool,
    pub modifiers: Modifiers,
}

impl KeyboardEvent {
    pub fn down(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            is_down: true,
            modifiers,
        }
    }

    pub fn up(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            is_down: false,
            modifiers,
        }
    }
}
