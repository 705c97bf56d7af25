//! Audio device enumeration and handles
//!
//! The routing core only ever sees [`AudioDevice`] handles. Looking devices
//! up by name is a convenience for the binary and settings layer.

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::AudioError;

/// Opaque handle to an input or output endpoint
#[derive(Clone)]
pub struct AudioDevice {
    inner: cpal::Device,
    pub name: String,
}

impl AudioDevice {
    pub fn from_cpal(device: cpal::Device) -> Self {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        Self {
            inner: device,
            name,
        }
    }

    pub fn inner(&self) -> &cpal::Device {
        &self.inner
    }

    /// Get supported output configurations
    pub fn supported_output_configs(
        &self,
    ) -> Result<Vec<cpal::SupportedStreamConfigRange>, AudioError> {
        self.inner
            .supported_output_configs()
            .map(|iter| iter.collect())
            .map_err(|e| AudioError::unavailable(&self.name, e))
    }

    /// Get default input config
    pub fn default_input_config(&self) -> Result<cpal::SupportedStreamConfig, AudioError> {
        self.inner
            .default_input_config()
            .map_err(|e| AudioError::unavailable(&self.name, e))
    }
}

impl std::fmt::Debug for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDevice").field("name", &self.name).finish()
    }
}

/// Summary of an endpoint for listing
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub is_input: bool,
    pub is_output: bool,
    pub is_default: bool,
    pub sample_rates: Vec<u32>,
    pub channels: Vec<u16>,
}

/// List all available audio devices
pub fn list_devices() -> Vec<DeviceInfo> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    let default_input_name = host.default_input_device().and_then(|d| d.name().ok());
    let default_output_name = host.default_output_device().and_then(|d| d.name().ok());

    if let Ok(input_devices) = host.input_devices() {
        for device in input_devices {
            if let Ok(name) = device.name() {
                let is_default = default_input_name.as_ref() == Some(&name);
                let (sample_rates, channels) = get_device_capabilities(&device, true);

                devices.push(DeviceInfo {
                    name,
                    is_input: true,
                    is_output: false,
                    is_default,
                    sample_rates,
                    channels,
                });
            }
        }
    }

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let Ok(name) = device.name() {
                let is_default = default_output_name.as_ref() == Some(&name);
                let (sample_rates, channels) = get_device_capabilities(&device, false);

                devices.push(DeviceInfo {
                    name,
                    is_input: false,
                    is_output: true,
                    is_default,
                    sample_rates,
                    channels,
                });
            }
        }
    }

    devices
}

/// Get device capabilities
fn get_device_capabilities(device: &cpal::Device, is_input: bool) -> (Vec<u32>, Vec<u16>) {
    let configs: Vec<cpal::SupportedStreamConfigRange> = if is_input {
        device
            .supported_input_configs()
            .map(|iter| iter.collect())
            .unwrap_or_default()
    } else {
        device
            .supported_output_configs()
            .map(|iter| iter.collect())
            .unwrap_or_default()
    };

    let mut sample_rates = Vec::new();
    let mut channels = Vec::new();
    for config in &configs {
        for rate_val in [44100u32, 48000, 88200, 96000, 176400, 192000] {
            let rate = cpal::SampleRate(rate_val);
            if rate >= config.min_sample_rate()
                && rate <= config.max_sample_rate()
                && !sample_rates.contains(&rate_val)
            {
                sample_rates.push(rate_val);
            }
        }
        if !channels.contains(&config.channels()) {
            channels.push(config.channels());
        }
    }

    sample_rates.sort_unstable();
    channels.sort_unstable();
    (sample_rates, channels)
}

/// Find an input device whose name contains `pattern` (case-insensitive)
pub fn find_input_device(pattern: &str) -> Result<AudioDevice, AudioError> {
    let devices = cpal::default_host()
        .input_devices()
        .map_err(|e| AudioError::unavailable(pattern, e))?;
    find_by_name(devices, pattern)
}

/// Find an output device whose name contains `pattern` (case-insensitive)
pub fn find_output_device(pattern: &str) -> Result<AudioDevice, AudioError> {
    let devices = cpal::default_host()
        .output_devices()
        .map_err(|e| AudioError::unavailable(pattern, e))?;
    find_by_name(devices, pattern)
}

fn find_by_name(
    devices: impl Iterator<Item = cpal::Device>,
    pattern: &str,
) -> Result<AudioDevice, AudioError> {
    let needle = pattern.to_lowercase();
    let mut fallback = None;

    for device in devices {
        let Ok(name) = device.name() else { continue };
        if name == pattern {
            return Ok(AudioDevice::from_cpal(device));
        }
        if fallback.is_none() && name.to_lowercase().contains(&needle) {
            fallback = Some(device);
        }
    }

    fallback
        .map(AudioDevice::from_cpal)
        .ok_or_else(|| AudioError::unavailable(pattern, "no device with a matching name"))
}

/// Shown when no virtual cable playback endpoint exists
pub const CABLE_INSTALL_HINT: &str =
    "VB-CABLE not found. Install from https://vb-audio.com/Cable/ (need CABLE Input/Output A/B)";

/// Whether `name` looks like a virtual cable's playback side
pub fn is_cable_input(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("cable") && name.contains("input")
}

/// Output devices that look like virtual cable inputs, in host order
pub fn find_cable_inputs() -> Vec<AudioDevice> {
    let Ok(devices) = cpal::default_host().output_devices() else {
        return Vec::new();
    };
    devices
        .filter_map(|device| {
            let name = device.name().ok()?;
            is_cable_input(&name).then(|| AudioDevice::from_cpal(device))
        })
        .collect()
}

/// Default output pair from detected cables: A takes the first, B the
/// second, or the first again when only one exists
pub fn pair_cable_outputs<T: Clone>(cables: &[T]) -> Option<(T, T)> {
    let a = cables.first()?;
    let b = cables.get(1).unwrap_or(a);
    Some((a.clone(), b.clone()))
}

/// Get default input device
pub fn default_input_device() -> Result<AudioDevice, AudioError> {
    cpal::default_host()
        .default_input_device()
        .map(AudioDevice::from_cpal)
        .ok_or_else(|| AudioError::unavailable("default input", "no default input device"))
}
