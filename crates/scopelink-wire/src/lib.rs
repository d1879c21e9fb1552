//! Wire protocol shared by scopelink servers, the router, and clients.
//!
//! Every request and response travels as one frame: a four byte big-endian
//! payload length, a one byte type tag, and the payload. Requests, structured
//! responses, and errors carry JSON; text carries raw UTF-8; arrays carry a
//! compact binary header followed by little-endian elements.
//!
//! [`decode`] never blocks and never parses a partial frame: it reports
//! [`Decoded::NeedMoreData`] until the whole frame is present. [`FrameBuffer`]
//! and [`FrameReader`] build incremental and blocking readers on top of it.

mod array;
mod destination;
mod error;
mod frame;
mod frame_buffer;
mod io;
mod message;
mod wire_format;

pub use array::{ArrayPayload, ElementType};
pub use destination::{CENTRAL, Destination};
pub use error::{ArrayError, FrameReadError, ProtocolError};
pub use frame::{Decoded, Frame, decode, decode_frame, encode};
pub use frame_buffer::FrameBuffer;
pub use io::{FrameReader, TimedRead, write_frame, write_message};
pub use message::{Args, CommandRequest, CommandResponse, ErrorKind, Message};
pub use wire_format::{
    DEFAULT_MAX_IMAGE_DIMENSION, FrameLimits, FrameTag, HEADER_SIZE, Header, decode_header,
};
