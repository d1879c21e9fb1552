//! Frames and the message codec built on them.

use bytes::{BufMut, Bytes, BytesMut};

use crate::array::ArrayPayload;
use crate::error::ProtocolError;
use crate::message::{CommandRequest, CommandResponse, ErrorBody, Message};
use crate::wire_format::{FrameLimits, FrameTag, HEADER_SIZE, decode_header};

/// Outcome of a non-blocking decode attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    /// A whole value was decoded from the first `consumed` bytes.
    Complete {
        /// The decoded value.
        value: T,
        /// Bytes consumed from the front of the input.
        consumed: usize,
    },
    /// The input holds only part of a frame.
    NeedMoreData {
        /// Total bytes needed before decoding can proceed.
        required: usize,
    },
}

impl<T> Decoded<T> {
    /// Applies `op` to a complete value.
    pub fn map<U>(self, op: impl FnOnce(T) -> U) -> Decoded<U> {
        match self {
            Self::Complete { value, consumed } => Decoded::Complete {
                value: op(value),
                consumed,
            },
            Self::NeedMoreData { required } => Decoded::NeedMoreData { required },
        }
    }
}

/// One tagged, length-prefixed unit of wire data.
///
/// The router forwards frames without interpreting them, so a frame keeps its
/// payload as raw bytes until [`Message::from_frame`] is asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    tag: FrameTag,
    payload: Bytes,
}

impl Frame {
    /// Wraps an already-encoded payload.
    #[must_use]
    pub const fn new(tag: FrameTag, payload: Bytes) -> Self {
        Self { tag, payload }
    }

    /// Payload type.
    #[must_use]
    pub const fn tag(&self) -> FrameTag {
        self.tag
    }

    /// Raw payload bytes.
    #[must_use]
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Size of the frame on the wire.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Appends the header and payload to `dst`.
    ///
    /// # Errors
    ///
    /// Fails when the payload does not fit the 32-bit length field.
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let length = u32::try_from(self.payload.len()).map_err(|_| ProtocolError::FrameTooLarge {
            length: self.payload.len(),
            limit: u32::MAX as usize,
        })?;
        dst.reserve(self.encoded_len());
        dst.put_u32(length);
        dst.put_u8(self.tag as u8);
        dst.put_slice(&self.payload);
        Ok(())
    }

    /// Encodes the frame into a fresh buffer.
    ///
    /// # Errors
    ///
    /// Fails when the payload does not fit the 32-bit length field.
    pub fn to_bytes(&self) -> Result<Bytes, ProtocolError> {
        let mut dst = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut dst)?;
        Ok(dst.freeze())
    }
}

/// Locates the first frame in `src` without copying it.
///
/// The payload is never inspected before all of it is present. A header that
/// declares an oversized payload is rejected immediately.
pub(crate) fn frame_extent(
    src: &[u8],
    limits: &FrameLimits,
) -> Result<Decoded<FrameTag>, ProtocolError> {
    let Some(header) = decode_header(src) else {
        return Ok(Decoded::NeedMoreData {
            required: HEADER_SIZE,
        });
    };
    limits.check(&header)?;
    let frame_len = header.frame_len();
    if src.len() < frame_len {
        return Ok(Decoded::NeedMoreData {
            required: frame_len,
        });
    }
    Ok(Decoded::Complete {
        value: FrameTag::try_from(header.tag)?,
        consumed: frame_len,
    })
}

/// Attempts to split one frame off the front of `src`.
///
/// # Errors
///
/// Returns [`ProtocolError::FrameTooLarge`] or [`ProtocolError::UnknownTag`].
pub fn decode_frame(src: &Bytes, limits: &FrameLimits) -> Result<Decoded<Frame>, ProtocolError> {
    Ok(match frame_extent(src, limits)? {
        Decoded::Complete { value, consumed } => Decoded::Complete {
            value: Frame::new(value, src.slice(HEADER_SIZE..consumed)),
            consumed,
        },
        Decoded::NeedMoreData { required } => Decoded::NeedMoreData { required },
    })
}

impl Message {
    /// Serialises the message into a frame.
    ///
    /// # Errors
    ///
    /// Fails when JSON encoding fails or an array cannot be expressed on the
    /// wire.
    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        let frame = match self {
            Self::Request(request) => {
                Frame::new(FrameTag::Request, Bytes::from(serde_json::to_vec(request)?))
            }
            Self::Response(CommandResponse::Text(text)) => {
                Frame::new(FrameTag::Text, Bytes::copy_from_slice(text.as_bytes()))
            }
            Self::Response(CommandResponse::Structured(map)) => {
                Frame::new(FrameTag::Structured, Bytes::from(serde_json::to_vec(map)?))
            }
            Self::Response(CommandResponse::Array(array)) => {
                let mut body = BytesMut::with_capacity(array.encoded_len());
                array.encode_into(&mut body)?;
                Frame::new(FrameTag::Array, body.freeze())
            }
            Self::Response(CommandResponse::Error { kind, message }) => {
                let body = ErrorBody {
                    kind: *kind,
                    message: message.clone(),
                };
                Frame::new(FrameTag::Error, Bytes::from(serde_json::to_vec(&body)?))
            }
        };
        Ok(frame)
    }

    /// Interprets a frame's payload according to its tag.
    ///
    /// # Errors
    ///
    /// Fails when the payload is not valid for the tag.
    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        let payload = frame.payload();
        let message = match frame.tag() {
            FrameTag::Request => {
                Self::Request(serde_json::from_slice::<CommandRequest>(payload)?)
            }
            FrameTag::Text => Self::Response(CommandResponse::Text(
                std::str::from_utf8(payload)?.to_owned(),
            )),
            FrameTag::Structured => {
                Self::Response(CommandResponse::Structured(serde_json::from_slice(payload)?))
            }
            FrameTag::Array => {
                Self::Response(CommandResponse::Array(ArrayPayload::decode(payload)?))
            }
            FrameTag::Error => {
                let body: ErrorBody = serde_json::from_slice(payload)?;
                Self::Response(CommandResponse::Error {
                    kind: body.kind,
                    message: body.message,
                })
            }
        };
        Ok(message)
    }
}

/// Encodes a message as one self-delimiting frame.
///
/// # Errors
///
/// See [`Message::to_frame`].
pub fn encode(message: &Message) -> Result<Bytes, ProtocolError> {
    message.to_frame()?.to_bytes()
}

/// Decodes one message from the front of `src` without blocking.
///
/// # Errors
///
/// Fails on oversized frames, unknown tags, or malformed payloads.
pub fn decode(src: &Bytes, limits: &FrameLimits) -> Result<Decoded<Message>, ProtocolError> {
    match decode_frame(src, limits)? {
        Decoded::Complete { value, consumed } => Ok(Decoded::Complete {
            value: Message::from_frame(&value)?,
            consumed,
        }),
        Decoded::NeedMoreData { required } => Ok(Decoded::NeedMoreData { required }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::Destination;
    use crate::message::ErrorKind;
    use rstest::rstest;
    use serde_json::json;

    fn limits() -> FrameLimits {
        FrameLimits::default()
    }

    #[test]
    fn text_frames_carry_raw_utf8() {
        let bytes = encode(&Message::Response(CommandResponse::text("Stage moved"))).expect("encode");
        assert_eq!(&bytes[..5], &[0, 0, 0, 11, 0x10]);
        assert_eq!(&bytes[5..], b"Stage moved");
    }

    #[test]
    fn request_frames_are_json() {
        let mut args = serde_json::Map::new();
        args.insert("x".into(), json!(100.0));
        let request = CommandRequest::new(Destination::new("AS").expect("dest"), "move_stage")
            .with_args(args);
        let frame = Message::Request(request.clone()).to_frame().expect("frame");
        assert_eq!(frame.tag(), FrameTag::Request);
        let value: serde_json::Value = serde_json::from_slice(frame.payload()).expect("json");
        assert_eq!(value["destination"], "AS");
        assert_eq!(value["command"], "move_stage");
        assert_eq!(value["args"]["x"], 100.0);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(4)]
    fn short_input_needs_header(#[case] available: usize) {
        let src = Bytes::from(vec![0_u8; available]);
        assert_eq!(
            decode_frame(&src, &limits()).expect("no error"),
            Decoded::NeedMoreData { required: 5 }
        );
    }

    #[test]
    fn partial_payload_reports_total_required() {
        let bytes = encode(&Message::Response(CommandResponse::text("abc"))).expect("encode");
        let partial = bytes.slice(..6);
        assert_eq!(
            decode(&partial, &limits()).expect("no error"),
            Decoded::NeedMoreData { required: 8 }
        );
    }

    #[test]
    fn unknown_tag_waits_for_full_frame_then_fails() {
        let partial = Bytes::from_static(&[0, 0, 0, 2, 0x77, 1]);
        assert_eq!(
            decode_frame(&partial, &limits()).expect("still buffering"),
            Decoded::NeedMoreData { required: 7 }
        );
        let full = Bytes::from_static(&[0, 0, 0, 2, 0x77, 1, 2]);
        assert!(matches!(
            decode_frame(&full, &limits()),
            Err(ProtocolError::UnknownTag(0x77))
        ));
    }

    #[test]
    fn oversized_header_fails_before_payload_arrives() {
        let src = Bytes::from_static(&[0, 0, 1, 0, 0x10]);
        let tight = FrameLimits::with_max_payload(255);
        assert!(matches!(
            decode_frame(&src, &tight),
            Err(ProtocolError::FrameTooLarge { length: 256, .. })
        ));
    }

    #[test]
    fn invalid_utf8_text_is_rejected() {
        let src = Bytes::from_static(&[0, 0, 0, 2, 0x10, 0xC3, 0x28]);
        assert!(matches!(
            decode(&src, &limits()),
            Err(ProtocolError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn error_frames_round_trip() {
        let message = Message::Response(CommandResponse::error(
            ErrorKind::UnknownCommand,
            "unknown command 'warp_drive'",
        ));
        let bytes = encode(&message).expect("encode");
        let decoded = decode(&bytes, &limits()).expect("decode");
        assert_eq!(
            decoded,
            Decoded::Complete {
                value: message,
                consumed: bytes.len()
            }
        );
    }

    #[test]
    fn trailing_bytes_are_left_for_the_next_frame() {
        let first = encode(&Message::Response(CommandResponse::text("one"))).expect("encode");
        let second = encode(&Message::Response(CommandResponse::text("two"))).expect("encode");
        let mut joined = BytesMut::new();
        joined.extend_from_slice(&first);
        joined.extend_from_slice(&second);
        let joined = joined.freeze();
        match decode(&joined, &limits()).expect("decode") {
            Decoded::Complete { consumed, .. } => assert_eq!(consumed, first.len()),
            Decoded::NeedMoreData { .. } => panic!("first frame was complete"),
        }
    }
}
