//! Audio capture from the input device
//!
//! The cpal stream is built and owned by a dedicated thread for its whole
//! life. Build errors are handed back before [`AudioCapture::start`]
//! returns, so a device that cannot be opened never yields a capture.

use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{bounded, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::audio::backend::{AudioStream, StreamMonitor};
use crate::audio::chunk::{AudioChunk, ChunkHandler};
use crate::audio::device::AudioDevice;
use crate::audio::format::AudioFormat;
use crate::callback::shield;
use crate::error::AudioError;

/// Shared-mode capture producing one [`AudioChunk`] per capture period
pub struct AudioCapture {
    device_name: String,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    /// Dropping this releases the stream thread
    stop_tx: Option<Sender<()>>,
    sequence: Arc<AtomicU64>,
    bytes_captured: Arc<AtomicU64>,
}

impl AudioCapture {
    /// Open `device` at `format` and start delivering chunks to `on_chunk`
    pub fn start(
        device: &AudioDevice,
        format: &AudioFormat,
        buffer_frames: Option<u32>,
        on_chunk: ChunkHandler,
        monitor: StreamMonitor,
    ) -> Result<Self, AudioError> {
        let device_name = device.name.clone();
        let cpal_device = device.inner().clone();
        let config = format.stream_config(buffer_frames);
        let sample_format = format.sample_format;

        let running = Arc::new(AtomicBool::new(true));
        let sequence = Arc::new(AtomicU64::new(0));
        let bytes_captured = Arc::new(AtomicU64::new(0));

        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let name = device_name.clone();
        let running_cb = running.clone();
        let sequence_cb = sequence.clone();
        let bytes_cb = bytes_captured.clone();
        let error_monitor = monitor.clone();

        let handle = thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || {
                let stream = cpal_device.build_input_stream_raw(
                    &config,
                    sample_format,
                    move |data: &cpal::Data, _: &cpal::InputCallbackInfo| {
                        let delivered = shield("capture", || {
                            if !running_cb.load(Ordering::Relaxed) {
                                return Ok(());
                            }
                            let bytes = data.bytes();
                            let seq = sequence_cb.fetch_add(1, Ordering::Relaxed);
                            bytes_cb.fetch_add(bytes.len() as u64, Ordering::Relaxed);
                            on_chunk(AudioChunk::copy_from(bytes, seq));
                            Ok(())
                        });
                        if delivered.is_err() {
                            monitor.record_callback_fault();
                        }
                    },
                    move |err| {
                        error_monitor.report(AudioError::StreamError(err.to_string()));
                    },
                    None,
                );

                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::unavailable(&name, e)));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(AudioError::unavailable(&name, e)));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Park until stop() drops the sender; the stream drops with us
                let _ = stop_rx.recv();
                tracing::debug!(device = %name, "capture stream released");
            })
            .map_err(|e| AudioError::unavailable(&device_name, e))?;

        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(AudioError::unavailable(&device_name, "capture thread exited")));
        if let Err(e) = ready {
            let _ = handle.join();
            return Err(e);
        }

        tracing::info!(device = %device_name, %format, "capture started");

        Ok(Self {
            device_name,
            running,
            thread_handle: Some(handle),
            stop_tx: Some(stop_tx),
            sequence,
            bytes_captured,
        })
    }
}

impl AudioStream for AudioCapture {
    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop_tx.take();

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
            tracing::info!(
                device = %self.device_name,
                chunks = self.sequence.load(Ordering::Relaxed),
                bytes = self.bytes_captured.load(Ordering::Relaxed),
                "capture stopped"
            );
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
