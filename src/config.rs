//! Application configuration
//!
//! Stored as TOML in the platform config directory:
//!
//! ```toml
//! mode = "hold"
//!
//! [audio]
//! input_device = "Microphone"
//! output_a = "CABLE Input"
//! output_b = "CABLE-B Input"
//! buffer_ms = 200
//!
//! [hotkey]
//! key = "Alt"
//! ctrl = false
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants;
use crate::error::{Error, Result};
use crate::hotkey::HotkeyDescriptor;
use crate::routing::{HotkeySettings, RoutingMode};
use crate::session::SessionOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture device name; `None` uses the system default input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_a: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_b: Option<String>,
    /// Maximum audio buffered per output, in milliseconds
    pub buffer_ms: u64,
    /// Fixed device period in frames; `None` keeps the backend default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_buffer_frames: Option<u32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_a: None,
            output_b: None,
            buffer_ms: constants::DEFAULT_BUFFER_MS,
            output_buffer_frames: None,
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    // Plain values must precede tables in TOML output
    pub mode: RoutingMode,
    pub audio: AudioConfig,
    pub hotkey: HotkeyDescriptor,
}

impl AppConfig {
    /// Default location: `<config_dir>/config.toml`
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", constants::APP_NAME)
            .map(|dirs| dirs.config_dir().join(constants::CONFIG_FILE_NAME))
    }

    /// Load from the default location, falling back to defaults when no
    /// file exists yet
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            Some(path) => {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            None => {
                tracing::warn!("no home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&text)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), "config saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.audio.buffer_ms == 0 {
            return Err(Error::Config("audio.buffer_ms must be greater than zero".into()));
        }
        if self.audio.output_buffer_frames == Some(0) {
            return Err(Error::Config(
                "audio.output_buffer_frames must be greater than zero".into(),
            ));
        }
        if let (Some(a), Some(b)) = (&self.audio.output_a, &self.audio.output_b) {
            if a.eq_ignore_ascii_case(b) {
                return Err(Error::Config(format!(
                    "output_a and output_b both name \"{a}\""
                )));
            }
        }
        Ok(())
    }

    pub fn hotkey_settings(&self) -> HotkeySettings {
        HotkeySettings {
            hotkey: self.hotkey,
            mode: self.mode,
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            buffer_duration: Duration::from_millis(self.audio.buffer_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::{Key, Modifiers};

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.mode, RoutingMode::Hold);
        assert_eq!(config.hotkey.key, Key::Alt);
        assert!(config.hotkey.modifiers.is_empty());
        assert_eq!(config.audio.buffer_ms, 200);
        assert_eq!(
            config.session_options().buffer_duration,
            Duration::from_millis(200)
        );
    }

    #[test]
    fn test_parse_partial_file() {
        let config: AppConfig = toml::from_str(
            r#"
            mode = "toggle"

            [audio]
            output_a = "CABLE Input"

            [hotkey]
            key = "F12"
            ctrl = true
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, RoutingMode::Toggle);
        assert_eq!(config.audio.output_a.as_deref(), Some("CABLE Input"));
        assert_eq!(config.audio.buffer_ms, 200);
        assert_eq!(config.hotkey.key, Key::Other(0x7B));
        assert!(config.hotkey.modifiers.ctrl);
        assert!(!config.hotkey.modifiers.shift);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = AppConfig {
            mode: RoutingMode::Toggle,
            audio: AudioConfig {
                input_device: Some("USB Mic".into()),
                output_a: Some("Speakers".into()),
                output_b: Some("Virtual Cable".into()),
                buffer_ms: 120,
                output_buffer_frames: Some(480),
            },
            hotkey: HotkeyDescriptor::new(
                Key::LeftWin,
                Modifiers {
                    shift: true,
                    ..Modifiers::NONE
                },
            ),
        };
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_rejects_zero_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[audio]\nbuffer_ms = 0\n").unwrap();

        assert!(matches!(AppConfig::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_same_output_twice() {
        let mut config = AppConfig::default();
        config.audio.output_a = Some("Speakers".into());
        config.audio.output_b = Some("speakers".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_key_name_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[hotkey]\nkey = \"NoSuchKey\"\n").unwrap();

        assert!(matches!(AppConfig::load_from(&path), Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load_from(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
