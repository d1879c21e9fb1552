//! Accumulator for partial reads.

use bytes::BytesMut;

use crate::error::ProtocolError;
use crate::frame::{Decoded, Frame, frame_extent};
use crate::message::Message;
use crate::wire_format::{FrameLimits, HEADER_SIZE};

/// Collects arbitrarily split chunks of a byte stream and yields whole frames.
///
/// However the stream is chunked, the same sequence of frames comes out.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buffer: BytesMut,
    limits: FrameLimits,
}

impl FrameBuffer {
    /// Creates an empty buffer enforcing `limits`.
    #[must_use]
    pub fn new(limits: FrameLimits) -> Self {
        Self {
            buffer: BytesMut::new(),
            limits,
        }
    }

    /// Appends received bytes.
    pub fn extend_from_slice(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Number of buffered bytes not yet returned as frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true when no partial frame is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Limits enforced by this buffer.
    #[must_use]
    pub const fn limits(&self) -> &FrameLimits {
        &self.limits
    }

    /// Pops the next complete frame.
    ///
    /// Returns `Ok(None)` while the next frame is incomplete; the missing
    /// capacity is reserved so the following reads append without
    /// reallocating.
    ///
    /// # Errors
    ///
    /// Fails on oversized frames or unknown tags. The buffer is left as it was,
    /// so callers should drop the connection.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        match frame_extent(&self.buffer, &self.limits)? {
            Decoded::Complete { value, consumed } => {
                let mut frame = self.buffer.split_to(consumed).freeze();
                let payload = frame.split_off(HEADER_SIZE);
                Ok(Some(Frame::new(value, payload)))
            }
            Decoded::NeedMoreData { required } => {
                self.buffer
                    .reserve(required.saturating_sub(self.buffer.len()));
                Ok(None)
            }
        }
    }

    /// Pops and interprets the next complete frame.
    ///
    /// # Errors
    ///
    /// Fails on framing violations or malformed payloads.
    pub fn next_message(&mut self) -> Result<Option<Message>, ProtocolError> {
        self.next_frame()?
            .map(|frame| Message::from_frame(&frame))
            .transpose()
    }
}
