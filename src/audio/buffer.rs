//! Lock-free chunk buffer feeding one playback stream
//!
//! Single producer (the capture callback) and single consumer (that sink's
//! playback callback). Whole chunks are queued and a byte counter tracks
//! how much audio they hold. Capacity is expressed as a duration of audio
//! and converted to bytes with the session format, so it holds the same
//! amount of time regardless of the input device's format.

use crossbeam::queue::ArrayQueue;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::audio::chunk::AudioChunk;
use crate::audio::format::AudioFormat;

/// Upper bound on queued chunks, whatever their size
const MAX_QUEUED_CHUNKS: usize = 1024;

/// Bounded FIFO of PCM chunks with a discard-newest overflow policy
pub struct BufferedSink {
    chunks: ArrayQueue<AudioChunk>,
    /// Chunk being drained and the read offset into it. Consumer side only.
    head: Mutex<Option<(AudioChunk, usize)>>,
    buffered: AtomicUsize,
    capacity: usize,
    format: AudioFormat,
    overflow_count: AtomicUsize,
    underrun_count: AtomicUsize,
}

impl BufferedSink {
    /// Create a buffer holding at most `max_duration` of audio
    pub fn new(format: AudioFormat, max_duration: Duration) -> Self {
        let align = format.block_align().max(1);
        let capacity = format.bytes_for(max_duration).max(align);
        let slots = (capacity / align).clamp(1, MAX_QUEUED_CHUNKS);
        Self {
            chunks: ArrayQueue::new(slots),
            head: Mutex::new(None),
            buffered: AtomicUsize::new(0),
            capacity,
            format,
            overflow_count: AtomicUsize::new(0),
            underrun_count: AtomicUsize::new(0),
        }
    }

    /// Append a whole chunk.
    ///
    /// Returns false and leaves the buffer untouched when the chunk does not
    /// fit entirely; already buffered audio keeps draining.
    pub fn push_chunk(&self, chunk: &AudioChunk) -> bool {
        let len = chunk.len();
        if len == 0 {
            return true;
        }

        // Only the consumer runs concurrently and it can only free space
        if self.buffered.load(Ordering::Acquire) + len > self.capacity {
            self.overflow_count.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // Count before publishing so the consumer never subtracts bytes
        // that were not added yet
        self.buffered.fetch_add(len, Ordering::AcqRel);
        if self.chunks.push(chunk.clone()).is_err() {
            self.buffered.fetch_sub(len, Ordering::AcqRel);
            self.overflow_count.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Fill `out` from the buffer, padding with silence on underflow.
    ///
    /// Only whole frames are taken so the stream never slips out of channel
    /// alignment. Returns the number of buffered bytes copied.
    pub fn drain_into(&self, out: &mut [u8]) -> usize {
        let align = self.format.block_align().max(1);
        let available = self.buffered.load(Ordering::Acquire);
        let available = available - available % align;
        let wanted = out.len() - out.len() % align;
        let take = available.min(wanted);

        let mut copied = 0;
        let mut head = self.head.lock();
        while copied < take {
            if head.is_none() {
                *head = self.chunks.pop().map(|chunk| (chunk, 0));
            }
            let Some((chunk, offset)) = head.as_mut() else {
                break;
            };

            let bytes = &chunk.as_bytes()[*offset..];
            let n = bytes.len().min(take - copied);
            out[copied..copied + n].copy_from_slice(&bytes[..n]);
            *offset += n;
            copied += n;

            let finished = *offset == chunk.len();
            if finished {
                *head = None;
            }
        }
        drop(head);
        self.buffered.fetch_sub(copied, Ordering::AcqRel);

        if copied < out.len() {
            self.underrun_count.fetch_add(1, Ordering::Relaxed);
            self.format.fill_silence(&mut out[copied..]);
        }
        copied
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buffered bytes
    pub fn len(&self) -> usize {
        self.buffered.load(Ordering::Acquire)
    }

    /// Capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn buffered_duration(&self) -> Duration {
        self.format.duration_of(self.len())
    }

    pub fn max_duration(&self) -> Duration {
        self.format.duration_of(self.capacity())
    }

    /// Chunks discarded because they did not fit
    pub fn overflow_count(&self) -> usize {
        self.overflow_count.load(Ordering::Relaxed)
    }

    /// Drain calls that had to pad with silence
    pub fn underrun_count(&self) -> usize {
        self.underrun_count.load(Ordering::Relaxed)
    }
}

/// Thread-safe handle to a sink buffer
pub type SharedSink = Arc<BufferedSink>;

/// Create a new shared sink buffer
pub fn create_shared_sink(format: AudioFormat, max_duration: Duration) -> SharedSink {
    Arc::new(BufferedSink::new(format, max_duration))
}
