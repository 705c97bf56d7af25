//! # Mic Route Switch
//!
//! Live-switch one microphone between two output devices with a global
//! hotkey, without an audible gap at the switch.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         KEYBOARD (any app)                           │
//! │   WH_KEYBOARD_LL hook thread (hotkey::KeyboardHook)                  │
//! │        │  KeyboardEvent { key, is_down, modifiers }                  │
//! │        ▼                                                             │
//! │   KeyEventDispatcher ──▶ HotkeyDescriptor::matches                   │
//! │        │                                                             │
//! │        ▼                                                             │
//! │   RoutingController (hold / toggle) ──writes──▶ RoutingState (atomic)│
//! └───────────────────────────────────────────────────────┬──────────────┘
//!                                                         │ read once
//! ┌───────────────────────────────────────────────────────┼──────────────┐
//! │                          ROUTING SESSION              │              │
//! │   ┌──────────────┐  AudioChunk   ┌────────────────────▼───────────┐  │
//! │   │ Capture      ├──────────────▶│ DualRouter                     │  │
//! │   │ (cpal input) │               │  whole chunk → sink A or B     │  │
//! │   └──────────────┘               └───────┬────────────────┬───────┘  │
//! │                                          ▼                ▼          │
//! │                                  ┌──────────────┐ ┌──────────────┐   │
//! │                                  │ BufferedSink │ │ BufferedSink │   │
//! │                                  │   A (200ms)  │ │   B (200ms)  │   │
//! │                                  └──────┬───────┘ └──────┬───────┘   │
//! │                                         ▼                ▼           │
//! │                                  ┌──────────────┐ ┌──────────────┐   │
//! │                                  │ Playback A   │ │ Playback B   │   │
//! │                                  │ (cpal output)│ │ (cpal output)│   │
//! │                                  └──────────────┘ └──────────────┘   │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod callback;
pub mod config;
pub mod error;
pub mod hotkey;
pub mod routing;
pub mod session;

pub use config::AppConfig;
pub use error::{AudioError, CallbackFault, Error, HookError, Result};
pub use routing::{HotkeySettings, Route, RoutingMode, SharedHotkeySettings};
pub use session::{
    RoutingSession, SessionDevices, SessionOptions, SessionStats, SessionStatus, StatusCallback,
};

/// Application-wide constants
pub mod constants {
    /// Name used for the config directory
    pub const APP_NAME: &str = "mic-route-switch";

    pub const CONFIG_FILE_NAME: &str = "config.toml";

    /// Default maximum audio held by each output sink, in milliseconds
    pub const DEFAULT_BUFFER_MS: u64 = 200;

    /// Runtime device faults queued for the session supervisor
    pub const FAULT_CHANNEL_CAPACITY: usize = 16;
}
