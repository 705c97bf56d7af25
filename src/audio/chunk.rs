//! Captured PCM chunks

use bytes::Bytes;

/// One capture period's worth of interleaved PCM bytes.
///
/// Immutable once produced; the router hands it to exactly one sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioChunk {
    /// Raw sample bytes in the session format
    pub data: Bytes,
    /// Capture callback sequence number
    pub sequence: u64,
}

impl AudioChunk {
    pub fn new(data: impl Into<Bytes>, sequence: u64) -> Self {
        Self {
            data: data.into(),
            sequence,
        }
    }

    /// Copy bytes handed to a capture callback
    pub fn copy_from(data: &[u8], sequence: u64) -> Self {
        Self::new(Bytes::copy_from_slice(data), sequence)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Receiver of captured chunks, called on the capture thread
pub type ChunkHandler = std::sync::Arc<dyn Fn(AudioChunk) + Send + Sync>;
