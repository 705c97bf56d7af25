//! Audio subsystem module

pub mod backend;
pub mod buffer;
pub mod capture;
pub mod chunk;
pub mod device;
pub mod format;
pub mod playback;

pub use backend::{AudioBackend, AudioStream, CpalBackend, StreamMonitor};
pub use buffer::{create_shared_sink, BufferedSink, SharedSink};
pub use capture::AudioCapture;
pub use chunk::{AudioChunk, ChunkHandler};
pub use device::{list_devices, AudioDevice, DeviceInfo};
pub use format::AudioFormat;
pub use playback::AudioPlayback;
