// Short form is one byte 0..=127. Long form is 0x80 | k then k big-endian bytes, k at most 4.

use super::{BerError, BerResult};

/// Largest length this codec produces or accepts.
pub const MAX_LENGTH: usize = i32::MAX as usize;

pub fn encoded_length_size(length: usize) -> usize {
    if length <= 0x7F {
        1
    } else if length <= 0xFF {
        2
    } else if length <= 0xFFFF {
        3
    } else if length <= 0xFF_FFFF {
        4
    } else {
        5
    }
}

/// Encode `length` in the shortest BER form.
///
/// # Panics
///
/// Panics if `length` exceeds [`MAX_LENGTH`]; callers never build values that
/// large.
pub fn encode_length(length: usize) -> ([u8; 5], usize) {
    assert!(
        length <= MAX_LENGTH,
        "BER length {} exceeds the supported maximum",
        length
    );

    let mut buf = [0u8; 5];
    let size = encoded_length_size(length);
    if size == 1 {
        buf[0] = length as u8;
        return (buf, 1);
    }

    let octets = size - 1;
    buf[0] = 0x80 | octets as u8;
    for i in 0..octets {
        buf[1 + i] = (length >> (8 * (octets - 1 - i))) as u8;
    }
    (buf, size)
}

/// Append the encoding of `length` to `out`.
pub fn write_length(out: &mut Vec<u8>, length: usize) {
    let (buf, size) = encode_length(length);
    out.extend_from_slice(&buf[..size]);
}

/// Decode a length starting at `pos`, returning the length and the position
/// of the first value byte.
pub fn decode_length(data: &[u8], pos: usize) -> BerResult<(usize, usize)> {
    let first = *data.get(pos).ok_or(BerError::Truncated {
        needed: 1,
        available: 0,
    })?;

    if first & 0x80 == 0 {
        return Ok((first as usize, pos + 1));
    }

    let octets = (first & 0x7F) as usize;
    if octets == 0 {
        return Err(BerError::IndefiniteLength);
    }
    if octets > 4 {
        return Err(BerError::LengthTooLong { octets });
    }

    let available = data.len() - pos - 1;
    if available < octets {
        return Err(BerError::Truncated {
            needed: octets,
            available,
        });
    }

    let length = data[pos + 1..pos + 1 + octets]
        .iter()
        .fold(0usize, |acc, b| (acc << 8) | *b as usize);
    if length > MAX_LENGTH {
        return Err(BerError::LengthTooLarge {
            length,
            max: MAX_LENGTH,
        });
    }

    Ok((length, pos + 1 + octets))
}
