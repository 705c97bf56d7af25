//! Session audio format
//!
//! Derived once from the capture device and reused verbatim for both
//! playback paths. Nothing in the routing path resamples or converts.

use std::fmt;
use std::time::Duration;

use cpal::SampleFormat;

use crate::error::AudioError;

/// PCM format shared by capture and both outputs for a whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format,
        }
    }

    /// Derive the session format from a device's default stream config
    pub fn from_supported(config: &cpal::SupportedStreamConfig) -> Self {
        Self::new(
            config.sample_rate().0,
            config.channels(),
            config.sample_format(),
        )
    }

    pub fn bits_per_sample(&self) -> u16 {
        (self.sample_format.sample_size() * 8) as u16
    }

    /// Bytes per interleaved frame
    pub fn block_align(&self) -> usize {
        self.sample_format.sample_size() * self.channels as usize
    }

    pub fn bytes_per_second(&self) -> usize {
        self.block_align() * self.sample_rate as usize
    }

    /// Byte count holding `duration` of audio, rounded down to whole frames
    pub fn bytes_for(&self, duration: Duration) -> usize {
        let frames = (self.sample_rate as u128 * duration.as_micros()) / 1_000_000;
        frames as usize * self.block_align()
    }

    /// Duration of `bytes` of audio in this format
    pub fn duration_of(&self, bytes: usize) -> Duration {
        let bps = self.bytes_per_second();
        if bps == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros((bytes as u64 * 1_000_000) / bps as u64)
    }

    pub fn stream_config(&self, buffer_frames: Option<u32>) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels: self.channels,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: match buffer_frames {
                Some(frames) => cpal::BufferSize::Fixed(frames),
                None => cpal::BufferSize::Default,
            },
        }
    }

    /// Whether a device config range can carry this format unchanged
    pub fn fits(&self, range: &cpal::SupportedStreamConfigRange) -> bool {
        let rate = cpal::SampleRate(self.sample_rate);
        range.channels() == self.channels
            && range.sample_format() == self.sample_format
            && range.min_sample_rate() <= rate
            && rate <= range.max_sample_rate()
    }

    /// Ensure one of `supported` carries this format unchanged.
    ///
    /// A device that cannot is reported as unavailable; nothing is
    /// resampled or converted to make it fit.
    pub fn require_supported(
        &self,
        device: &str,
        supported: &[cpal::SupportedStreamConfigRange],
    ) -> Result<(), AudioError> {
        if supported.iter().any(|range| self.fits(range)) {
            return Ok(());
        }
        Err(AudioError::format_mismatch(
            device,
            self,
            "no matching output configuration",
        ))
    }

    /// Fill `out` with the format's equilibrium value.
    ///
    /// Zero bytes for signed and float samples; unsigned samples sit at
    /// mid-scale, which in little-endian is a set top bit on the last byte.
    pub fn fill_silence(&self, out: &mut [u8]) {
        out.fill(0);
        if self.sample_format.is_uint() {
            let size = self.sample_format.sample_size();
            for sample in out.chunks_exact_mut(size) {
                sample[size - 1] = 0x80;
            }
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {:?} ({} bit)",
            self.sample_rate,
            self.channels,
            self.sample_format,
            self.bits_per_sample()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_align() {
        let format = AudioFormat::new(48_000, 2, SampleFormat::F32);
        assert_eq!(format.block_align(), 8);
        assert_eq!(format.bits_per_sample(), 32);
        assert_eq!(format.bytes_per_second(), 384_000);
    }

    #[test]
    fn test_bytes_for_duration_is_frame_aligned() {
        let format = AudioFormat::new(44_100, 2, SampleFormat::I16);
        let bytes = format.bytes_for(Duration::from_millis(200));
        assert_eq!(bytes, 8820 * 4);
        assert_eq!(bytes % format.block_align(), 0);

        let odd = AudioFormat::new(44_100, 1, SampleFormat::I16);
        assert_eq!(odd.bytes_for(Duration::from_millis(1)) % odd.block_align(), 0);
    }

    #[test]
    fn test_duration_of() {
        let format = AudioFormat::new(48_000, 1, SampleFormat::I16);
        assert_eq!(format.duration_of(9600), Duration::from_millis(100));
    }

    #[test]
    fn test_silence_signed_is_zero() {
        let format = AudioFormat::new(48_000, 2, SampleFormat::I16);
        let mut out = [0xAAu8; 8];
        format.fill_silence(&mut out);
        assert_eq!(out, [0u8; 8]);
    }

    #[test]
    fn test_silence_unsigned_is_midscale() {
        let format = AudioFormat::new(48_000, 1, SampleFormat::U16);
        let mut out = [0u8; 4];
        format.fill_silence(&mut out);
        assert_eq!(out, [0x00, 0x80, 0x00, 0x80]);

        let format = AudioFormat::new(8_000, 1, SampleFormat::U8);
        let mut out = [0u8; 3];
        format.fill_silence(&mut out);
        assert_eq!(out, [0x80; 3]);
    }

    #[test]
    fn test_display() {
        let format = AudioFormat::new(48_000, 2, SampleFormat::F32);
        assert_eq!(format.to_string(), "48000 Hz, 2 ch, F32 (32 bit)");
    }

    fn range(
        channels: u16,
        min: u32,
        max: u32,
        sample_format: SampleFormat,
    ) -> cpal::SupportedStreamConfigRange {
        cpal::SupportedStreamConfigRange::new(
            channels,
            cpal::SampleRate(min),
            cpal::SampleRate(max),
            cpal::SupportedBufferSize::Unknown,
            sample_format,
        )
    }

    #[test]
    fn test_fits_exact_match() {
        let format = AudioFormat::new(48_000, 2, SampleFormat::F32);
        assert!(format.fits(&range(2, 48_000, 48_000, SampleFormat::F32)));
        assert!(format.fits(&range(2, 8_000, 192_000, SampleFormat::F32)));
    }

    #[test]
    fn test_fits_rate_bounds_are_inclusive() {
        let format = AudioFormat::new(44_100, 2, SampleFormat::I16);
        assert!(format.fits(&range(2, 44_100, 96_000, SampleFormat::I16)));
        assert!(format.fits(&range(2, 8_000, 44_100, SampleFormat::I16)));
        assert!(!format.fits(&range(2, 44_101, 96_000, SampleFormat::I16)));
        assert!(!format.fits(&range(2, 8_000, 44_099, SampleFormat::I16)));
    }

    #[test]
    fn test_fits_rejects_channel_and_sample_format_mismatch() {
        let format = AudioFormat::new(48_000, 2, SampleFormat::F32);
        assert!(!format.fits(&range(1, 8_000, 192_000, SampleFormat::F32)));
        assert!(!format.fits(&range(8, 8_000, 192_000, SampleFormat::F32)));
        assert!(!format.fits(&range(2, 8_000, 192_000, SampleFormat::I16)));
        assert!(!format.fits(&range(2, 8_000, 192_000, SampleFormat::U8)));
    }

    #[test]
    fn test_unsupported_output_is_device_unavailable() {
        let format = AudioFormat::new(48_000, 2, SampleFormat::F32);
        let supported = [
            range(2, 8_000, 44_100, SampleFormat::F32),
            range(1, 48_000, 48_000, SampleFormat::F32),
            range(2, 48_000, 48_000, SampleFormat::I16),
        ];

        let err = format.require_supported("CABLE Input", &supported).unwrap_err();
        assert!(err.is_device_unavailable());
        assert_eq!(
            err,
            AudioError::format_mismatch("CABLE Input", &format, "no matching output configuration")
        );
        match err {
            AudioError::DeviceUnavailable { device, reason } => {
                assert_eq!(device, "CABLE Input");
                assert!(reason.contains("cannot honor format 48000 Hz, 2 ch, F32"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let mut supported = supported.to_vec();
        supported.push(range(2, 48_000, 48_000, SampleFormat::F32));
        assert!(format.require_supported("CABLE Input", &supported).is_ok());
    }

    #[test]
    fn test_no_supported_configs_is_device_unavailable() {
        let format = AudioFormat::new(48_000, 2, SampleFormat::F32);
        assert!(format
            .require_supported("Speakers", &[])
            .unwrap_err()
            .is_device_unavailable());
    }
}
