//! Blocking frame IO over `Read`/`Write` streams.

use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use crate::error::{FrameReadError, ProtocolError};
use crate::frame::Frame;
use crate::frame_buffer::FrameBuffer;
use crate::message::Message;
use crate::wire_format::FrameLimits;

const READ_CHUNK: usize = 64 * 1024;

/// Streams whose blocking reads can be bounded.
pub trait TimedRead: Read {
    /// Limits the next `read` to `timeout`.
    ///
    /// # Errors
    ///
    /// Fails when the stream rejects the timeout.
    fn bound_next_read(&self, timeout: Duration) -> io::Result<()>;
}

impl TimedRead for TcpStream {
    fn bound_next_read(&self, timeout: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(timeout))
    }
}

/// Reads whole frames from a blocking stream.
///
/// Bytes past the end of a frame stay buffered for the next call, so a peer
/// may coalesce or split writes freely.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    buffer: FrameBuffer,
    chunk: Vec<u8>,
}

impl<R: Read> FrameReader<R> {
    /// Wraps `inner`, enforcing `limits` on every frame.
    pub fn new(inner: R, limits: FrameLimits) -> Self {
        Self {
            inner,
            buffer: FrameBuffer::new(limits),
            chunk: vec![0; READ_CHUNK],
        }
    }

    /// Blocks until a whole frame is available.
    ///
    /// Returns `Ok(None)` when the peer closes cleanly between frames.
    ///
    /// # Errors
    ///
    /// Fails on IO errors (including read timeouts), protocol violations, or
    /// a close in the middle of a frame.
    pub fn read_frame(&mut self) -> Result<Option<Frame>, FrameReadError> {
        loop {
            if let Some(frame) = self.buffer.next_frame()? {
                return Ok(Some(frame));
            }
            if self.fill()? {
                return self.closed();
            }
        }
    }

    /// Reads once into the buffer; returns true at end of stream.
    fn fill(&mut self) -> Result<bool, FrameReadError> {
        loop {
            match self.inner.read(&mut self.chunk) {
                Ok(0) => return Ok(true),
                Ok(read) => {
                    self.buffer
                        .extend_from_slice(self.chunk.get(..read).unwrap_or_default());
                    return Ok(false);
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => return Err(FrameReadError::Io(error)),
            }
        }
    }

    fn closed(&self) -> Result<Option<Frame>, FrameReadError> {
        if self.buffer.is_empty() {
            Ok(None)
        } else {
            Err(FrameReadError::Truncated {
                buffered: self.buffer.len(),
            })
        }
    }

    /// Blocks until a whole message is available.
    ///
    /// # Errors
    ///
    /// As [`FrameReader::read_frame`], plus malformed payloads.
    pub fn read_message(&mut self) -> Result<Option<Message>, FrameReadError> {
        self.read_frame()?
            .map(|frame| Message::from_frame(&frame).map_err(FrameReadError::from))
            .transpose()
    }
}

impl<R: TimedRead> FrameReader<R> {
    /// Like [`FrameReader::read_frame`], but gives up at `deadline`.
    ///
    /// The deadline covers the whole frame: a peer that keeps sending a few
    /// bytes at a time cannot extend it.
    ///
    /// # Errors
    ///
    /// As [`FrameReader::read_frame`]. A passed deadline is an
    /// [`io::ErrorKind::TimedOut`] IO error, so
    /// [`FrameReadError::is_timeout`] holds for it.
    pub fn read_frame_before(&mut self, deadline: Instant) -> Result<Option<Frame>, FrameReadError> {
        loop {
            if let Some(frame) = self.buffer.next_frame()? {
                return Ok(Some(frame));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(FrameReadError::Io(io::Error::from(ErrorKind::TimedOut)));
            }
            self.inner.bound_next_read(remaining)?;
            if self.fill()? {
                return self.closed();
            }
        }
    }

    /// Like [`FrameReader::read_message`], but gives up at `deadline`.
    ///
    /// # Errors
    ///
    /// As [`FrameReader::read_frame_before`], plus malformed payloads.
    pub fn read_message_before(
        &mut self,
        deadline: Instant,
    ) -> Result<Option<Message>, FrameReadError> {
        self.read_frame_before(deadline)?
            .map(|frame| Message::from_frame(&frame).map_err(FrameReadError::from))
            .transpose()
    }
}

/// Writes one frame and flushes.
///
/// # Errors
///
/// Fails when the frame cannot be encoded or the stream rejects the write.
pub fn write_frame<W: Write>(writer: &mut W, frame: &Frame) -> io::Result<()> {
    let bytes = frame.to_bytes().map_err(protocol_to_io)?;
    writer.write_all(&bytes)?;
    writer.flush()
}

/// Encodes and writes one message, then flushes.
///
/// # Errors
///
/// Fails when the message cannot be encoded or the stream rejects the write.
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> io::Result<()> {
    let frame = message.to_frame().map_err(protocol_to_io)?;
    write_frame(writer, &frame)
}

fn protocol_to_io(error: ProtocolError) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, error)
}
