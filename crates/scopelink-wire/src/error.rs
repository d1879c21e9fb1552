//! Codec error types.

use std::io;

use thiserror::Error;

/// Failures raised while building or interpreting an array payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArrayError {
    /// The element type byte did not match a known type.
    #[error("unknown array element type {0}")]
    UnknownElementType(u8),
    /// The array body ended before its header was complete.
    #[error("array header truncated: need {required} bytes, have {available}")]
    TruncatedHeader {
        /// Bytes needed for the header.
        required: usize,
        /// Bytes present.
        available: usize,
    },
    /// Element data length disagrees with the declared shape.
    #[error("array data holds {actual} bytes but shape requires {expected}")]
    LengthMismatch {
        /// Bytes implied by shape and element type.
        expected: usize,
        /// Bytes present.
        actual: usize,
    },
    /// The shape's element count overflows the address space.
    #[error("array shape {0:?} is too large")]
    ShapeOverflow(Vec<usize>),
    /// More dimensions than the rank byte can express.
    #[error("array rank {0} exceeds 255")]
    RankTooLarge(usize),
    /// A dimension does not fit the 32-bit wire field.
    #[error("array dimension {0} exceeds the wire limit")]
    DimensionTooLarge(usize),
}

/// Violations of the framing protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The type tag byte is not part of the protocol.
    #[error("unknown frame type tag 0x{0:02X}")]
    UnknownTag(u8),
    /// The declared payload exceeds the configured limit.
    #[error("frame payload of {length} bytes exceeds the {limit} byte limit")]
    FrameTooLarge {
        /// Declared payload length.
        length: usize,
        /// Configured maximum.
        limit: usize,
    },
    /// A text payload was not valid UTF-8.
    #[error("text payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    /// A JSON payload failed to encode or decode.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    /// An array payload was malformed.
    #[error(transparent)]
    Array(#[from] ArrayError),
    /// A destination name was blank or contained whitespace.
    #[error("invalid destination name '{0}'")]
    InvalidDestination(String),
}

/// Failures while reading frames from a blocking stream.
#[derive(Debug, Error)]
pub enum FrameReadError {
    /// The underlying stream failed, including read timeouts.
    #[error("failed to read frame: {0}")]
    Io(#[from] io::Error),
    /// The bytes received violate the protocol.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The peer closed the stream part way through a frame.
    #[error("stream closed with {buffered} bytes of an incomplete frame buffered")]
    Truncated {
        /// Bytes of the partial frame left unread.
        buffered: usize,
    },
}

impl FrameReadError {
    /// Returns true when the read gave up because its deadline passed.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Io(error)
                if matches!(error.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
        )
    }
}
