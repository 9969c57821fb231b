use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::codec::{decode_frame_with_limit, Frame, FrameConfig};
use crate::error::Result;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Reassembles frames from arbitrarily split deliveries.
///
/// Bytes are appended as they arrive; every complete frame is returned in
/// order and an incomplete tail stays buffered until more data comes in.
#[derive(Debug)]
pub struct FrameAssembler {
    buf: BytesMut,
    config: FrameConfig,
}

impl FrameAssembler {
    /// Create an assembler with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create an assembler with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Append a delivery and return every frame it completes.
    ///
    /// On a decode error the buffered bytes are left as they were; the
    /// caller is expected to drop the link and [`clear`](Self::clear).
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buf.extend_from_slice(data);

        let mut frames = Vec::new();
        let mut offset = 0;
        while let Some((frame, next)) =
            decode_frame_with_limit(&self.buf, offset, self.config.max_remaining_length)?
        {
            frames.push(frame);
            offset = next;
        }
        self.buf.advance(offset);

        if !self.buf.is_empty() {
            trace!(pending = self.buf.len(), "holding partial frame");
        }
        Ok(frames)
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partially received frame.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Current configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}
