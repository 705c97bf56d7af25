//! Error types for the mic route switcher

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Hook error: {0}")]
    Hook(#[from] HookError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio subsystem errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// The device could not be opened: disconnected, exclusively locked,
    /// or unable to honor the session format.
    #[error("Device unavailable: {device}: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    /// A running stream reported a fault.
    #[error("Stream error: {0}")]
    StreamError(String),
}

impl AudioError {
    pub fn unavailable(device: impl Into<String>, reason: impl ToString) -> Self {
        Self::DeviceUnavailable {
            device: device.into(),
            reason: reason.to_string(),
        }
    }

    /// A device that cannot play or record the session format is treated
    /// as unavailable.
    pub fn format_mismatch(
        device: impl Into<String>,
        wanted: &crate::audio::AudioFormat,
        detail: impl std::fmt::Display,
    ) -> Self {
        Self::DeviceUnavailable {
            device: device.into(),
            reason: format!("cannot honor format {wanted}: {detail}"),
        }
    }

    pub fn is_device_unavailable(&self) -> bool {
        matches!(self, Self::DeviceUnavailable { .. })
    }
}

/// Keyboard hook errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("Keyboard hook installation failed: {0}")]
    InstallationFailed(String),

    #[error("A keyboard hook is already installed in this process")]
    AlreadyInstalled,
}

/// Failure caught at a platform callback boundary.
///
/// Never propagated back into the audio or input layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallbackFault {
    #[error("{context} callback panicked: {message}")]
    Panicked {
        context: &'static str,
        message: String,
    },

    #[error("{context} callback failed: {reason}")]
    Failed {
        context: &'static str,
        reason: String,
    },
}

impl CallbackFault {
    pub fn failed(context: &'static str, reason: impl ToString) -> Self {
        Self::Failed {
            context,
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_unavailable_display() {
        let err = AudioError::unavailable("CABLE Input", "device disconnected");
        assert_eq!(
            err.to_string(),
            "Device unavailable: CABLE Input: device disconnected"
        );
        assert!(err.is_device_unavailable());
    }

    #[test]
    fn test_format_mismatch_is_unavailable() {
        let format = crate::audio::AudioFormat::new(48_000, 2, cpal::SampleFormat::F32);
        let err = AudioError::format_mismatch("CABLE-B Input", &format, "no matching config");
        assert!(err.is_device_unavailable());
        assert!(err.to_string().contains("48000 Hz"));
    }

    #[test]
    fn test_hook_error_converts() {
        let err: Error = HookError::AlreadyInstalled.into();
        assert!(matches!(err, Error::Hook(HookError::AlreadyInstalled)));
    }
}
