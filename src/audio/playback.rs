//! Playback stream draining one sink buffer to an output device

use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{bounded, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::audio::backend::{AudioStream, StreamMonitor};
use crate::audio::buffer::SharedSink;
use crate::audio::device::AudioDevice;
use crate::audio::format::AudioFormat;
use crate::callback::shield;
use crate::error::AudioError;

/// Output stream clocked by its device, pulling from a [`SharedSink`]
pub struct AudioPlayback {
    device_name: String,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    stop_tx: Option<Sender<()>>,
    sink: SharedSink,
}

impl AudioPlayback {
    /// Open `device` at exactly `format` and start draining `sink`.
    ///
    /// A device that cannot carry the format unchanged is reported as
    /// unavailable; nothing is resampled.
    pub fn start(
        device: &AudioDevice,
        format: &AudioFormat,
        buffer_frames: Option<u32>,
        sink: SharedSink,
        monitor: StreamMonitor,
    ) -> Result<Self, AudioError> {
        let device_name = device.name.clone();
        let supported = device.supported_output_configs()?;
        format.require_supported(&device_name, &supported)?;

        let cpal_device = device.inner().clone();
        let config = format.stream_config(buffer_frames);
        let sample_format = format.sample_format;
        let format = *format;

        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let name = device_name.clone();
        let running_cb = running.clone();
        let sink_cb = sink.clone();
        let error_monitor = monitor.clone();

        let handle = thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || {
                let stream = cpal_device.build_output_stream_raw(
                    &config,
                    sample_format,
                    move |data: &mut cpal::Data, _: &cpal::OutputCallbackInfo| {
                        if !running_cb.load(Ordering::Relaxed) {
                            format.fill_silence(data.bytes_mut());
                            return;
                        }
                        let drained = shield("playback", || {
                            sink_cb.drain_into(data.bytes_mut());
                            Ok(())
                        });
                        if drained.is_err() {
                            monitor.record_callback_fault();
                            format.fill_silence(data.bytes_mut());
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

                let _ = stop_rx.recv();
                tracing::debug!(device = %name, "playback stream released");
            })
            .map_err(|e| AudioError::unavailable(&device_name, e))?;

        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(AudioError::unavailable(&device_name, "playback thread exited")));
        if let Err(e) = ready {
            let _ = handle.join();
            return Err(e);
        }

        tracing::info!(device = %device_name, %format, "playback started");

        Ok(Self {
            device_name,
            running,
            thread_handle: Some(handle),
            stop_tx: Some(stop_tx),
            sink,
        })
    }

}

impl AudioStream for AudioPlayback {
    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop_tx.take();

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
            tracing::info!(
                device = %self.device_name,
                underruns = self.sink.underrun_count(),
                "playback stopped"
            );
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for AudioPlayback {
    fn drop(&mut self) {
        self.stop();
    }
}
