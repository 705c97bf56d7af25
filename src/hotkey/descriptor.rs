//! Hotkey descriptor and matcher

use serde::{Deserialize, Serialize};
use std::fmt;

use super::keys::{Key, KeyboardEvent, Modifiers};

/// A configured key plus the modifiers that must be held with it.
///
/// Extra held modifiers never block a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyDescriptor {
    pub key: Key,
    #[serde(flatten)]
    pub modifiers: Modifiers,
}

impl Default for HotkeyDescriptor {
    fn default() -> Self {
        Self {
            key: Key::Alt,
            modifiers: Modifiers::NONE,
        }
    }
}

impl HotkeyDescriptor {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Whether `event` is a transition of this hotkey.
    ///
    /// Down and up transitions both match; deciding what they mean is the
    /// routing controller's job.
    pub fn matches(&self, event: &KeyboardEvent) -> bool {
        if !self.key.accepts(event.key) {
            tracing::trace!(hotkey = %self, key = %event.key, "no match: key mismatch");
            return false;
        }

        if let Some(missing) = self.modifiers.first_missing(&event.modifiers) {
            tracing::trace!(hotkey = %self, missing, "no match: modifier required");
            return false;
        }

        true
    }
}

impl fmt::Display for HotkeyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in self.modifiers.names() {
            write!(f, "{name}+")?;
        }
        write!(f, "{}", self.key)
    }
}
