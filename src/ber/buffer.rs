use bytes::{BufMut, Bytes, BytesMut};
use std::fmt::{self, Write as _};

use super::element::BerElement;
use super::length::{encode_length, encoded_length_size, write_length};
use super::scalar::{encode_boolean_value, encode_integer_value};
use super::tags;

/// Marks an open container in a [`BerBuffer`]. Must be handed back to
/// [`BerBuffer::end_container`] in last-opened, first-closed order.
#[derive(Debug)]
#[must_use = "an open container must be closed with end_container"]
pub struct ContainerHandle {
    value_start: usize,
}

/// Incremental BER writer. Container lengths are inserted when the
/// container is closed, so nested values are encoded in one pass.
#[derive(Debug, Default)]
pub struct BerBuffer {
    buf: Vec<u8>,
}

impl BerBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.buf)
    }

    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.reserve(self.buf.len());
        dst.put_slice(&self.buf);
    }

    pub fn add_element(&mut self, element: &BerElement) {
        element.write_to(&mut self.buf);
    }

    pub fn add_boolean(&mut self, tag: u8, value: bool) {
        self.add_octet_string(tag, &encode_boolean_value(value));
    }

    pub fn add_integer(&mut self, tag: u8, value: i64) {
        let (buf, width) = encode_integer_value(value);
        self.add_octet_string(tag, &buf[..width]);
    }

    pub fn add_enumerated(&mut self, tag: u8, value: i64) {
        self.add_integer(tag, value);
    }

    pub fn add_null(&mut self, tag: u8) {
        self.buf.push(tag);
        self.buf.push(0x00);
    }

    pub fn add_octet_string(&mut self, tag: u8, value: &[u8]) {
        self.buf.push(tag);
        write_length(&mut self.buf, value.len());
        self.buf.extend_from_slice(value);
    }

    pub fn add_str(&mut self, tag: u8, value: &str) {
        self.add_octet_string(tag, value.as_bytes());
    }

    /// Append the formatted form of `value` as an octet string.
    ///
    /// The length prefix is written up front from the number of characters
    /// `value` is expected to render (`expected_chars`, one byte each). Once
    /// the text is written the real byte count is compared against that
    /// estimate; on a mismatch the prefix is rewritten in place, moving the
    /// value if the new prefix needs a different number of bytes.
    pub fn add_display(&mut self, tag: u8, value: &dyn fmt::Display, expected_chars: usize) {
        self.buf.push(tag);
        let prefix_start = self.buf.len();
        write_length(&mut self.buf, expected_chars);
        let value_start = self.buf.len();

        let mut writer = VecWriter(&mut self.buf);
        // Writing into a Vec never fails; a Display impl that errors leaves
        // whatever it produced, which is still length-checked below.
        let _ = write!(writer, "{}", value);

        let actual = self.buf.len() - value_start;
        if actual != expected_chars {
            self.repatch_length(prefix_start, value_start, actual);
        }
    }

    fn repatch_length(&mut self, prefix_start: usize, value_start: usize, length: usize) {
        let (prefix, size) = encode_length(length);
        self.buf
            .splice(prefix_start..value_start, prefix[..size].iter().copied());
    }

    pub fn begin_sequence(&mut self) -> ContainerHandle {
        self.begin_container(tags::SEQUENCE)
    }

    pub fn begin_set(&mut self) -> ContainerHandle {
        self.begin_container(tags::SET)
    }

    pub fn begin_container(&mut self, tag: u8) -> ContainerHandle {
        self.buf.push(tag);
        ContainerHandle {
            value_start: self.buf.len(),
        }
    }

    /// Close a container, inserting its length ahead of the children written
    /// since [`begin_container`](Self::begin_container).
    pub fn end_container(&mut self, handle: ContainerHandle) {
        let length = self.buf.len() - handle.value_start;
        if length == 0 {
            self.buf.push(0x00);
            return;
        }

        let (prefix, size) = encode_length(length);
        debug_assert_eq!(size, encoded_length_size(length));
        self.buf.splice(
            handle.value_start..handle.value_start,
            prefix[..size].iter().copied(),
        );
    }
}

struct VecWriter<'a>(&'a mut Vec<u8>);

impl fmt::Write for VecWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}
