use bytes::Bytes;
use std::io::{self, Read};
use tracing::trace;

use super::element::BerElement;
use super::scalar::{
    decode_boolean_value, decode_integer_value, decode_long_value, decode_null_value,
};
use super::{BerError, BerResult, DEFAULT_MAX_DEPTH, MAX_LENGTH};

/// Largest element value the stream reader allocates by default.
pub const DEFAULT_MAX_ELEMENT_SIZE: usize = 16 * 1024 * 1024;

/// An open container returned by [`BerStreamReader::begin_sequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamContainer {
    tag: u8,
    length: usize,
    end_offset: u64,
    depth: usize,
}

impl StreamContainer {
    pub fn tag(&self) -> u8 {
        self.tag
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn end_offset(&self) -> u64 {
        self.end_offset
    }
}

/// Reads BER elements from `R`, keeping a running count of consumed bytes.
pub struct BerStreamReader<R> {
    inner: R,
    total_bytes_read: u64,
    peeked_tag: Option<u8>,
    open_ends: Vec<u64>,
    max_element_size: usize,
    max_depth: usize,
}

impl<R: Read> BerStreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            total_bytes_read: 0,
            peeked_tag: None,
            open_ends: Vec::new(),
            max_element_size: DEFAULT_MAX_ELEMENT_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_element_size(mut self, max: usize) -> Self {
        self.max_element_size = max.min(MAX_LENGTH);
        self
    }

    pub fn with_max_depth(mut self, max: usize) -> Self {
        self.max_depth = max;
        self
    }

    /// Offset of the next unread byte in the stream.
    pub fn position(&self) -> u64 {
        self.total_bytes_read - u64::from(self.peeked_tag.is_some())
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Look at the next tag without consuming it. `None` at end of input.
    pub fn peek(&mut self) -> BerResult<Option<u8>> {
        if self.peeked_tag.is_none() {
            self.peeked_tag = self.read_byte()?;
        }
        Ok(self.peeked_tag)
    }

    /// Read the next complete element. `None` on a clean end of input.
    pub fn read_element(&mut self) -> BerResult<Option<BerElement>> {
        let Some(tag) = self.read_tag()? else {
            return Ok(None);
        };
        let length = self.read_length()?;
        let mut value = vec![0u8; length];
        self.read_fully(&mut value)?;
        Ok(Some(BerElement::new(tag, Bytes::from(value))))
    }

    pub fn skip_element(&mut self) -> BerResult<Option<u8>> {
        let Some(tag) = self.read_tag()? else {
            return Ok(None);
        };
        let length = self.read_length()?;
        let skipped = io::copy(&mut (&mut self.inner).take(length as u64), &mut io::sink())?;
        self.total_bytes_read += skipped;
        if skipped < length as u64 {
            return Err(BerError::Truncated {
                needed: length,
                available: skipped as usize,
            });
        }
        Ok(Some(tag))
    }

    pub fn read_boolean(&mut self) -> BerResult<bool> {
        decode_boolean_value(self.require_element()?.value())
    }

    pub fn read_integer(&mut self) -> BerResult<i32> {
        decode_integer_value(self.require_element()?.value())
    }

    pub fn read_long(&mut self) -> BerResult<i64> {
        decode_long_value(self.require_element()?.value())
    }

    pub fn read_null(&mut self) -> BerResult<()> {
        decode_null_value(self.require_element()?.value())
    }

    pub fn read_octets(&mut self) -> BerResult<Bytes> {
        Ok(self.require_element()?.into_value())
    }

    pub fn read_string(&mut self) -> BerResult<String> {
        let value = self.read_octets()?;
        Ok(std::str::from_utf8(&value)?.to_string())
    }

    pub fn begin_sequence(&mut self) -> BerResult<StreamContainer> {
        let tag = self.read_tag()?.ok_or(BerError::Truncated {
            needed: 1,
            available: 0,
        })?;
        let length = self.read_length()?;

        if self.open_ends.len() >= self.max_depth {
            return Err(BerError::NestingTooDeep {
                max: self.max_depth,
            });
        }

        let container = StreamContainer {
            tag,
            length,
            end_offset: self.position() + length as u64,
            depth: self.open_ends.len(),
        };
        self.open_ends.push(container.end_offset);
        trace!(
            tag = container.tag,
            length,
            depth = container.depth,
            "entered BER container"
        );
        Ok(container)
    }

    /// Whether `container` has unread children.
    ///
    /// Returns `false` exactly at the container's end and
    /// [`BerError::ReadPastEnd`] if more bytes than declared were consumed.
    pub fn has_more_elements(&mut self, container: &StreamContainer) -> BerResult<bool> {
        let position = self.position();
        if position < container.end_offset {
            return Ok(true);
        }
        if position > container.end_offset {
            return Err(BerError::ReadPastEnd {
                expected_end: container.end_offset,
                position,
            });
        }
        self.open_ends.truncate(container.depth);
        Ok(false)
    }

    fn require_element(&mut self) -> BerResult<BerElement> {
        self.read_element()?.ok_or(BerError::Truncated {
            needed: 1,
            available: 0,
        })
    }

    fn read_tag(&mut self) -> BerResult<Option<u8>> {
        // Containers that end at or before this point are finished even if
        // their consumer never asked.
        let position = self.position();
        while self.open_ends.last().is_some_and(|end| *end <= position) {
            self.open_ends.pop();
        }

        match self.peeked_tag.take() {
            Some(tag) => Ok(Some(tag)),
            None => self.read_byte(),
        }
    }

    fn read_length(&mut self) -> BerResult<usize> {
        let first = self.read_byte()?.ok_or(BerError::Truncated {
            needed: 1,
            available: 0,
        })?;

        let length = if first & 0x80 == 0 {
            first as usize
        } else {
            let octets = (first & 0x7F) as usize;
            if octets == 0 {
                return Err(BerError::IndefiniteLength);
            }
            if octets > 4 {
                return Err(BerError::LengthTooLong { octets });
            }
            let mut buf = [0u8; 4];
            self.read_fully(&mut buf[..octets])?;
            let length = buf[..octets]
                .iter()
                .fold(0usize, |acc, b| (acc << 8) | *b as usize);
            if length > MAX_LENGTH {
                return Err(BerError::LengthTooLarge {
                    length,
                    max: MAX_LENGTH,
                });
            }
            length
        };

        if length > self.max_element_size {
            return Err(BerError::ElementTooLarge {
                length,
                max: self.max_element_size,
            });
        }

        if let Some(end) = self.open_ends.last() {
            let available = end.saturating_sub(self.position()) as usize;
            if length > available {
                return Err(BerError::LengthExceedsAvailable {
                    declared: length,
                    available,
                });
            }
        }

        Ok(length)
    }

    fn read_byte(&mut self) -> BerResult<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.total_bytes_read += 1;
                    return Ok(Some(byte[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn read_fully(&mut self, buf: &mut [u8]) -> BerResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(BerError::Truncated {
                        needed: buf.len(),
                        available: filled,
                    })
                }
                Ok(n) => {
                    filled += n;
                    self.total_bytes_read += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
