//! Hotkey and mode, replaceable by the host application at any time

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::controller::RoutingMode;
use crate::hotkey::HotkeyDescriptor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeySettings {
    #[serde(default)]
    pub hotkey: HotkeyDescriptor,
    #[serde(default)]
    pub mode: RoutingMode,
}

impl fmt::Display for HotkeySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.hotkey, self.mode)
    }
}

/// Settings handle shared with a running session.
///
/// The session reads a fresh copy for every key event, so changes apply
/// from the next key transition on.
#[derive(Debug, Clone, Default)]
pub struct SharedHotkeySettings {
    inner: Arc<RwLock<HotkeySettings>>,
}

impl SharedHotkeySettings {
    pub fn new(settings: HotkeySettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub fn get(&self) -> HotkeySettings {
        *self.inner.read()
    }

    pub fn set(&self, settings: HotkeySettings) {
        *self.inner.write() = settings;
    }

    pub fn set_hotkey(&self, hotkey: HotkeyDescriptor) {
        self.inner.write().hotkey = hotkey;
    }

    pub fn set_mode(&self, mode: RoutingMode) {
        self.inner.write().mode = mode;
    }
}
