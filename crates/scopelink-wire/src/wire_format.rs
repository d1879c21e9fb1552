//! Frame header layout and size limits.
//!
//! ```text
//! +----------------------+-----------+------------------------+
//! | length (u32, BE)     | tag (u8)  | payload (length bytes) |
//! +----------------------+-----------+------------------------+
//! ```
//!
//! `length` counts payload bytes only.

use crate::error::ProtocolError;

/// Bytes occupied by the length field and the tag.
pub const HEADER_SIZE: usize = 5;

/// Largest image edge accepted when no limit is configured.
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 4096;

/// Room reserved for array headers and JSON framing on top of image data.
const PAYLOAD_SLACK: usize = 64 * 1024;

/// Type tag identifying the payload of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameTag {
    /// JSON encoded command request.
    Request = 0x01,
    /// UTF-8 text response.
    Text = 0x10,
    /// JSON object response.
    Structured = 0x11,
    /// Numeric array response.
    Array = 0x12,
    /// JSON encoded error response.
    Error = 0x1F,
}

impl TryFrom<u8> for FrameTag {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0x01 => Ok(Self::Request),
            0x10 => Ok(Self::Text),
            0x11 => Ok(Self::Structured),
            0x12 => Ok(Self::Array),
            0x1F => Ok(Self::Error),
            other => Err(ProtocolError::UnknownTag(other)),
        }
    }
}

/// Decoded fixed-size prefix of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Payload byte count.
    pub length: usize,
    /// Raw tag byte; validated only once the whole frame is buffered.
    pub tag: u8,
}

impl Header {
    /// Total frame size including the header.
    #[must_use]
    pub const fn frame_len(&self) -> usize {
        HEADER_SIZE + self.length
    }
}

/// Reads a header from the front of `src`, if enough bytes are present.
#[must_use]
pub fn decode_header(src: &[u8]) -> Option<Header> {
    let (length, rest) = src.split_first_chunk::<4>()?;
    let &tag = rest.first()?;
    Some(Header {
        length: usize::try_from(u32::from_be_bytes(*length)).unwrap_or(usize::MAX),
        tag,
    })
}

/// Upper bounds enforced while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    max_payload: usize,
}

impl FrameLimits {
    /// Limits sized for square `float64` images of `dimension` pixels a side.
    #[must_use]
    pub fn for_max_image_dimension(dimension: u32) -> Self {
        let edge = usize::try_from(dimension).unwrap_or(usize::MAX);
        let max_payload = edge
            .saturating_mul(edge)
            .saturating_mul(8)
            .saturating_add(PAYLOAD_SLACK)
            .min(u32::MAX as usize);
        Self { max_payload }
    }

    /// Limits with an explicit payload cap.
    #[must_use]
    pub const fn with_max_payload(max_payload: usize) -> Self {
        Self { max_payload }
    }

    /// Largest payload accepted.
    #[must_use]
    pub const fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Rejects headers declaring oversized payloads.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FrameTooLarge`] when the header exceeds the cap.
    pub const fn check(&self, header: &Header) -> Result<(), ProtocolError> {
        if header.length > self.max_payload {
            return Err(ProtocolError::FrameTooLarge {
                length: header.length,
                limit: self.max_payload,
            });
        }
        Ok(())
    }
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self::for_max_image_dimension(DEFAULT_MAX_IMAGE_DIMENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_needs_five_bytes() {
        assert_eq!(decode_header(&[0, 0, 0, 1]), None);
        assert_eq!(
            decode_header(&[0, 0, 1, 0, 0x10, 0xAA]),
            Some(Header {
                length: 256,
                tag: 0x10
            })
        );
    }

    #[test]
    fn default_limit_fits_largest_float_image() {
        let limits = FrameLimits::default();
        assert!(limits.max_payload() >= 4096 * 4096 * 8);
    }

    #[test]
    fn oversized_headers_are_rejected() {
        let limits = FrameLimits::with_max_payload(16);
        let header = Header {
            length: 17,
            tag: 0x10,
        };
        assert!(matches!(
            limits.check(&header),
            Err(ProtocolError::FrameTooLarge {
                length: 17,
                limit: 16
            })
        ));
    }

    #[test]
    fn unknown_tags_are_protocol_errors() {
        assert!(matches!(
            FrameTag::try_from(0x42),
            Err(ProtocolError::UnknownTag(0x42))
        ));
    }
}
