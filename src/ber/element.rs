use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use super::length::{decode_length, encoded_length_size, write_length};
use super::scalar::{
    decode_boolean_value, decode_integer_value, decode_long_value, decode_null_value,
    decode_string_value, encode_boolean_value, encode_integer_value,
};
use super::{container, tags, BerError, BerResult};

/// A single tag-length-value element.
///
/// The length is never stored: it is always `value().len()`. Elements are
/// immutable and cheap to clone; decoded elements share the input buffer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BerElement {
    tag: u8,
    value: Bytes,
}

impl BerElement {
    pub fn new(tag: u8, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self::boolean_with_tag(tags::BOOLEAN, value)
    }

    pub fn boolean_with_tag(tag: u8, value: bool) -> Self {
        Self::new(tag, Bytes::copy_from_slice(&encode_boolean_value(value)))
    }

    pub fn integer(value: i64) -> Self {
        Self::integer_with_tag(tags::INTEGER, value)
    }

    pub fn integer_with_tag(tag: u8, value: i64) -> Self {
        let (buf, width) = encode_integer_value(value);
        Self::new(tag, Bytes::copy_from_slice(&buf[..width]))
    }

    pub fn enumerated(value: i64) -> Self {
        Self::integer_with_tag(tags::ENUMERATED, value)
    }

    pub fn null() -> Self {
        Self::new(tags::NULL, Bytes::new())
    }

    pub fn octet_string(value: impl Into<Bytes>) -> Self {
        Self::new(tags::OCTET_STRING, value)
    }

    pub fn string(value: &str) -> Self {
        Self::new(tags::OCTET_STRING, Bytes::copy_from_slice(value.as_bytes()))
    }

    pub fn string_with_tag(tag: u8, value: &str) -> Self {
        Self::new(tag, Bytes::copy_from_slice(value.as_bytes()))
    }

    pub fn tag(&self) -> u8 {
        self.tag
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub fn into_value(self) -> Bytes {
        self.value
    }

    pub fn is_constructed(&self) -> bool {
        self.tag & tags::CONSTRUCTED != 0
    }

    /// Size of the full tag-length-value encoding.
    pub fn encoded_len(&self) -> usize {
        1 + encoded_length_size(self.value.len()) + self.value.len()
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.tag);
        write_length(out, self.value.len());
        out.extend_from_slice(&self.value);
    }

    pub fn write_to_buf(&self, dst: &mut BytesMut) {
        let (len, size) = super::length::encode_length(self.value.len());
        dst.reserve(1 + size + self.value.len());
        dst.put_u8(self.tag);
        dst.put_slice(&len[..size]);
        dst.put_slice(&self.value);
    }

    pub fn encode(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out);
        Bytes::from(out)
    }

    /// Decode exactly one element that spans all of `data`.
    pub fn decode(data: &[u8]) -> BerResult<Self> {
        let bytes = Bytes::copy_from_slice(data);
        let (element, next) = Self::decode_at(&bytes, 0)?;
        if next != bytes.len() {
            return Err(BerError::TrailingData {
                extra: bytes.len() - next,
            });
        }
        Ok(element)
    }

    /// Decode one element starting at `pos`, returning it and the offset just
    /// past it. The value is a zero-copy slice of `data`.
    pub fn decode_at(data: &Bytes, pos: usize) -> BerResult<(Self, usize)> {
        let tag = *data.get(pos).ok_or(BerError::Truncated {
            needed: 1,
            available: 0,
        })?;
        let (length, value_start) = decode_length(data, pos + 1)?;
        let available = data.len() - value_start;
        if length > available {
            return Err(BerError::LengthExceedsAvailable {
                declared: length,
                available,
            });
        }
        let end = value_start + length;
        Ok((Self::new(tag, data.slice(value_start..end)), end))
    }

    pub fn expect_tag(&self, expected: u8) -> BerResult<&Self> {
        if self.tag == expected {
            Ok(self)
        } else {
            Err(BerError::UnexpectedTag {
                expected,
                actual: self.tag,
            })
        }
    }

    pub fn decode_as_boolean(&self) -> BerResult<bool> {
        decode_boolean_value(&self.value)
    }

    pub fn decode_as_integer(&self) -> BerResult<i32> {
        decode_integer_value(&self.value)
    }

    pub fn decode_as_long(&self) -> BerResult<i64> {
        decode_long_value(&self.value)
    }

    pub fn decode_as_null(&self) -> BerResult<()> {
        decode_null_value(&self.value)
    }

    pub fn decode_as_str(&self) -> BerResult<&str> {
        decode_string_value(&self.value)
    }

    /// Decode the value as a list of child elements.
    pub fn decode_as_children(&self) -> BerResult<Vec<BerElement>> {
        container::decode_children(&self.value)
    }
}

impl fmt::Debug for BerElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BerElement(0x{:02x}, {} bytes", self.tag, self.value.len())?;
        if !self.value.is_empty() && self.value.len() <= 32 {
            write!(f, ":")?;
            for b in self.value.iter() {
                write!(f, " {:02x}", b)?;
            }
        }
        write!(f, ")")
    }
}
