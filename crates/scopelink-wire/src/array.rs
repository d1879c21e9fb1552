//! Numeric array payloads.
//!
//! Arrays travel as an element type byte, a rank byte, `rank` big-endian
//! `u32` dimension sizes, and then the raw elements in row-major order with
//! each element little-endian. Equality is bitwise, so `NaN` payloads compare
//! equal to themselves and `-0.0` differs from `0.0`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ArrayError;

/// Element type tag carried in an array body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    /// Unsigned 8-bit integers.
    U8 = 1,
    /// Unsigned 16-bit integers.
    U16 = 2,
    /// IEEE 754 single precision.
    F32 = 3,
    /// IEEE 754 double precision.
    F64 = 4,
}

impl ElementType {
    /// Width of one element in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Conventional lowercase name (`uint8`, `float64`, ...).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }
}

impl TryFrom<u8> for ElementType {
    type Error = ArrayError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::U8),
            2 => Ok(Self::U16),
            3 => Ok(Self::F32),
            4 => Ok(Self::F64),
            other => Err(ArrayError::UnknownElementType(other)),
        }
    }
}

/// A shaped block of numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArrayPayload {
    element_type: ElementType,
    shape: Vec<usize>,
    data: Bytes,
}

impl ArrayPayload {
    /// Wraps raw little-endian element bytes.
    ///
    /// # Errors
    ///
    /// Fails when the byte count does not match the shape and element type.
    pub fn from_raw(
        element_type: ElementType,
        shape: Vec<usize>,
        data: Bytes,
    ) -> Result<Self, ArrayError> {
        let expected = expected_len(element_type, &shape)?;
        if expected != data.len() {
            return Err(ArrayError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            element_type,
            shape,
            data,
        })
    }

    /// Builds a `uint8` array.
    ///
    /// # Errors
    ///
    /// Fails when `values` does not fill `shape` exactly.
    pub fn from_u8(shape: Vec<usize>, values: Vec<u8>) -> Result<Self, ArrayError> {
        Self::from_raw(ElementType::U8, shape, Bytes::from(values))
    }

    /// Builds a `uint16` array.
    ///
    /// # Errors
    ///
    /// Fails when `values` does not fill `shape` exactly.
    pub fn from_u16(shape: Vec<usize>, values: &[u16]) -> Result<Self, ArrayError> {
        let mut data = BytesMut::with_capacity(values.len() * 2);
        for value in values {
            data.put_u16_le(*value);
        }
        Self::from_raw(ElementType::U16, shape, data.freeze())
    }

    /// Builds a `float32` array.
    ///
    /// # Errors
    ///
    /// Fails when `values` does not fill `shape` exactly.
    pub fn from_f32(shape: Vec<usize>, values: &[f32]) -> Result<Self, ArrayError> {
        let mut data = BytesMut::with_capacity(values.len() * 4);
        for value in values {
            data.put_f32_le(*value);
        }
        Self::from_raw(ElementType::F32, shape, data.freeze())
    }

    /// Builds a `float64` array.
    ///
    /// # Errors
    ///
    /// Fails when `values` does not fill `shape` exactly.
    pub fn from_f64(shape: Vec<usize>, values: &[f64]) -> Result<Self, ArrayError> {
        let mut data = BytesMut::with_capacity(values.len() * 8);
        for value in values {
            data.put_f64_le(*value);
        }
        Self::from_raw(ElementType::F64, shape, data.freeze())
    }

    /// Element type.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Dimension sizes, outermost first.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Raw little-endian element bytes.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Returns true for arrays with a zero-sized dimension.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Widens every element to `f64`, in row-major order.
    #[must_use]
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self.element_type {
            ElementType::U8 => self.data.iter().map(|byte| f64::from(*byte)).collect(),
            ElementType::U16 => {
                let (elements, _) = self.data.as_chunks::<2>();
                elements
                    .iter()
                    .map(|raw| f64::from(u16::from_le_bytes(*raw)))
                    .collect()
            }
            ElementType::F32 => {
                let (elements, _) = self.data.as_chunks::<4>();
                elements
                    .iter()
                    .map(|raw| f64::from(f32::from_le_bytes(*raw)))
                    .collect()
            }
            ElementType::F64 => {
                let (elements, _) = self.data.as_chunks::<8>();
                elements.iter().map(|raw| f64::from_le_bytes(*raw)).collect()
            }
        }
    }

    /// Length of the encoded array body.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        2 + self.shape.len() * 4 + self.data.len()
    }

    /// Appends the encoded array body to `dst`.
    ///
    /// # Errors
    ///
    /// Fails when the rank or a dimension does not fit its wire field.
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<(), ArrayError> {
        let rank =
            u8::try_from(self.shape.len()).map_err(|_| ArrayError::RankTooLarge(self.shape.len()))?;
        dst.reserve(self.encoded_len());
        dst.put_u8(self.element_type as u8);
        dst.put_u8(rank);
        for dimension in &self.shape {
            let wire = u32::try_from(*dimension)
                .map_err(|_| ArrayError::DimensionTooLarge(*dimension))?;
            dst.put_u32(wire);
        }
        dst.put_slice(&self.data);
        Ok(())
    }

    /// Decodes an array body, sharing element storage with `body`.
    ///
    /// # Errors
    ///
    /// Fails when the header is truncated, the element type is unknown, or the
    /// data length disagrees with the shape.
    pub fn decode(body: &Bytes) -> Result<Self, ArrayError> {
        let (&type_byte, rest) = body.split_first().ok_or(ArrayError::TruncatedHeader {
            required: 2,
            available: body.len(),
        })?;
        let element_type = ElementType::try_from(type_byte)?;
        let (&rank, _) = rest.split_first().ok_or(ArrayError::TruncatedHeader {
            required: 2,
            available: body.len(),
        })?;
        let header_len = 2 + usize::from(rank) * 4;
        let dims = body.get(2..header_len).ok_or(ArrayError::TruncatedHeader {
            required: header_len,
            available: body.len(),
        })?;
        let (dimension_words, _) = dims.as_chunks::<4>();
        let shape = dimension_words
            .iter()
            .map(|raw| u32::from_be_bytes(*raw))
            .map(|dimension| usize::try_from(dimension).map_err(|_| ArrayError::DimensionTooLarge(usize::MAX)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_raw(element_type, shape, body.slice(header_len..))
    }
}

fn expected_len(element_type: ElementType, shape: &[usize]) -> Result<usize, ArrayError> {
    shape
        .iter()
        .try_fold(element_type.size(), |acc, dimension| acc.checked_mul(*dimension))
        .ok_or_else(|| ArrayError::ShapeOverflow(shape.to_vec()))
}
