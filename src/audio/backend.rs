//! Backend seam between the routing session and the platform audio layer

use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::audio::buffer::SharedSink;
use crate::audio::capture::AudioCapture;
use crate::audio::chunk::ChunkHandler;
use crate::audio::device::AudioDevice;
use crate::audio::format::AudioFormat;
use crate::audio::playback::AudioPlayback;
use crate::error::AudioError;

/// A running capture or playback stream
pub trait AudioStream: Send {
    /// Halt the stream and release its device. Idempotent.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// Opens the streams a routing session needs
pub trait AudioBackend {
    type Device;

    fn device_name(&self, device: &Self::Device) -> String;

    /// Native shared-mode format of a capture device
    fn input_format(&self, device: &Self::Device) -> Result<AudioFormat, AudioError>;

    /// Start capturing; `on_chunk` runs once per capture period
    fn open_input(
        &self,
        device: &Self::Device,
        format: &AudioFormat,
        on_chunk: ChunkHandler,
        monitor: StreamMonitor,
    ) -> Result<Box<dyn AudioStream>, AudioError>;

    /// Start a playback stream continuously draining `sink`
    fn open_output(
        &self,
        device: &Self::Device,
        format: &AudioFormat,
        sink: SharedSink,
        monitor: StreamMonitor,
    ) -> Result<Box<dyn AudioStream>, AudioError>;
}

/// Channel from stream callbacks back to whoever supervises them
#[derive(Clone)]
pub struct StreamMonitor {
    faults: Sender<AudioError>,
    callback_faults: Arc<AtomicU64>,
}

impl StreamMonitor {
    pub fn new(faults: Sender<AudioError>) -> Self {
        Self {
            faults,
            callback_faults: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A monitor nobody listens to
    pub fn detached() -> Self {
        let (tx, _rx) = crossbeam_channel::bounded(1);
        Self::new(tx)
    }

    /// Forward a device fault. Never blocks.
    pub fn report(&self, error: AudioError) {
        let _ = self.faults.try_send(error);
    }

    pub fn record_callback_fault(&self) {
        self.callback_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn callback_faults(&self) -> u64 {
        self.callback_faults.load(Ordering::Relaxed)
    }
}

/// Production backend on top of cpal
#[derive(Debug, Clone, Default)]
pub struct CpalBackend {
    /// Fixed period size in frames; `None` keeps the host default
    pub buffer_frames: Option<u32>,
}

impl CpalBackend {
    pub fn new(buffer_frames: Option<u32>) -> Self {
        Self { buffer_frames }
    }
}

impl AudioBackend for CpalBackend {
    type Device = AudioDevice;

    fn device_name(&self, device: &AudioDevice) -> String {
        device.name.clone()
    }

    fn input_format(&self, device: &AudioDevice) -> Result<AudioFormat, AudioError> {
        let config = device.default_input_config()?;
        Ok(AudioFormat::from_supported(&config))
    }

    fn open_input(
        &self,
        device: &AudioDevice,
        format: &AudioFormat,
        on_chunk: ChunkHandler,
        monitor: StreamMonitor,
    ) -> Result<Box<dyn AudioStream>, AudioError> {
        let capture = AudioCapture::start(device, format, self.buffer_frames, on_chunk, monitor)?;
        Ok(Box::new(capture))
    }

    fn open_output(
        &self,
        device: &AudioDevice,
        format: &AudioFormat,
        sink: SharedSink,
        monitor: StreamMonitor,
    ) -> Result<Box<dyn AudioStream>, AudioError> {
        let playback = AudioPlayback::start(device, format, self.buffer_frames, sink, monitor)?;
        Ok(Box::new(playback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_forwards_faults() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        let monitor = StreamMonitor::new(tx);
        monitor.report(AudioError::StreamError("device removed".into()));
        assert_eq!(
            rx.try_recv().unwrap(),
            AudioError::StreamError("device removed".into())
        );
    }

    #[test]
    fn test_monitor_never_blocks_when_full() {
        let (tx, _rx) = crossbeam_channel::bounded(1);
        let monitor = StreamMonitor::new(tx);
        monitor.report(AudioError::StreamError("first".into()));
        monitor.report(AudioError::StreamError("second".into()));
    }

    #[test]
    fn test_callback_faults_shared_between_clones() {
        let monitor = StreamMonitor::detached();
        let clone = monitor.clone();
        clone.record_callback_fault();
        monitor.record_callback_fault();
        assert_eq!(monitor.callback_faults(), 2);
    }
}
