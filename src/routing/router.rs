//! Dual buffered router
//!
//! Every captured chunk goes whole to exactly one of two sink buffers,
//! chosen by a single read of the routing flag when the chunk arrives.
//! Each sink is drained by its own playback stream.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::state::{Route, RoutingState};
use crate::audio::{
    create_shared_sink, AudioBackend, AudioChunk, AudioFormat, AudioStream, ChunkHandler,
    SharedSink, StreamMonitor,
};
use crate::error::AudioError;

/// Outcome of delivering one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub route: Route,
    /// False when the chunk was discarded because its sink was full
    pub accepted: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub routed_a: u64,
    pub routed_b: u64,
    pub dropped_a: u64,
    pub dropped_b: u64,
    pub underruns_a: u64,
    pub underruns_b: u64,
}

pub struct DualRouter {
    state: RoutingState,
    sink_a: SharedSink,
    sink_b: SharedSink,
    attached: AtomicBool,
    routed_a: AtomicU64,
    routed_b: AtomicU64,
}

impl DualRouter {
    pub fn new(state: RoutingState, sink_a: SharedSink, sink_b: SharedSink) -> Self {
        Self {
            state,
            sink_a,
            sink_b,
            attached: AtomicBool::new(true),
            routed_a: AtomicU64::new(0),
            routed_b: AtomicU64::new(0),
        }
    }

    /// Route one chunk. Returns `None` once detached.
    pub fn deliver(&self, chunk: AudioChunk) -> Option<Delivery> {
        if !self.attached.load(Ordering::Acquire) {
            return None;
        }

        let route = self.state.load();
        let (sink, counter) = match route {
            Route::A => (&self.sink_a, &self.routed_a),
            Route::B => (&self.sink_b, &self.routed_b),
        };
        counter.fetch_add(1, Ordering::Relaxed);
        let accepted = sink.push_chunk(&chunk);

        Some(Delivery { route, accepted })
    }

    /// Stop accepting chunks
    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    pub fn sink(&self, route: Route) -> &SharedSink {
        match route {
            Route::A => &self.sink_a,
            Route::B => &self.sink_b,
        }
    }

    pub fn stats(&self) -> RouterStats {
        RouterStats {
            routed_a: self.routed_a.load(Ordering::Relaxed),
            routed_b: self.routed_b.load(Ordering::Relaxed),
            dropped_a: self.sink_a.overflow_count() as u64,
            dropped_b: self.sink_b.overflow_count() as u64,
            underruns_a: self.sink_a.underrun_count() as u64,
            underruns_b: self.sink_b.underrun_count() as u64,
        }
    }
}

/// A router with both playback streams running
pub struct RunningRoute {
    router: Arc<DualRouter>,
    output_a: Option<Box<dyn AudioStream>>,
    output_b: Option<Box<dyn AudioStream>>,
}

impl RunningRoute {
    /// Open both outputs at `format`, each behind a sink holding
    /// `buffer_duration` of audio.
    ///
    /// If B fails, A is stopped again before the error is returned.
    pub fn start<B: AudioBackend>(
        backend: &B,
        output_a: &B::Device,
        output_b: &B::Device,
        format: &AudioFormat,
        state: RoutingState,
        buffer_duration: Duration,
        monitor: &StreamMonitor,
    ) -> Result<Self, AudioError> {
        let sink_a = create_shared_sink(*format, buffer_duration);
        let sink_b = create_shared_sink(*format, buffer_duration);

        let mut stream_a = backend.open_output(output_a, format, sink_a.clone(), monitor.clone())?;
        let stream_b = match backend.open_output(output_b, format, sink_b.clone(), monitor.clone()) {
            Ok(stream) => stream,
            Err(e) => {
                stream_a.stop();
                return Err(e);
            }
        };

        Ok(Self {
            router: Arc::new(DualRouter::new(state, sink_a, sink_b)),
            output_a: Some(stream_a),
            output_b: Some(stream_b),
        })
    }

    /// Chunk callback to attach to the capture stream
    pub fn handler(&self) -> ChunkHandler {
        let router = self.router.clone();
        Arc::new(move |chunk| {
            router.deliver(chunk);
        })
    }

    pub fn router(&self) -> &Arc<DualRouter> {
        &self.router
    }

    /// Halt both outputs, then detach from the chunk stream. Idempotent.
    pub fn stop(&mut self) {
        if let Some(mut stream) = self.output_a.take() {
            stream.stop();
        }
        if let Some(mut stream) = self.output_b.take() {
            stream.stop();
        }
        self.router.detach();
    }
}

impl Drop for RunningRoute {
    fn drop(&mut self) {
        self.stop();
    }
}
