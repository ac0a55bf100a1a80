use super::{BerError, BerResult};

/// Encode a boolean value byte. Decoders accept any non-zero byte as true.
pub fn encode_boolean_value(value: bool) -> [u8; 1] {
    if value {
        [0xFF]
    } else {
        [0x00]
    }
}

pub fn decode_boolean_value(value: &[u8]) -> BerResult<bool> {
    match value {
        [b] => Ok(*b != 0x00),
        _ => Err(BerError::InvalidLength {
            kind: "boolean",
            expected: "exactly 1 byte",
            actual: value.len(),
        }),
    }
}

/// Minimal two's-complement big-endian encoding of `value`.
///
/// Returns the buffer and the number of trailing bytes that make up the
/// encoding.
pub fn encode_integer_value(value: i64) -> ([u8; 8], usize) {
    let width = if (-0x80..=0x7F).contains(&value) {
        1
    } else if (-0x8000..=0x7FFF).contains(&value) {
        2
    } else if (-0x80_0000..=0x7F_FFFF).contains(&value) {
        3
    } else if (-0x8000_0000..=0x7FFF_FFFF).contains(&value) {
        4
    } else if (-0x80_0000_0000..=0x7F_FFFF_FFFF).contains(&value) {
        5
    } else if (-0x8000_0000_0000..=0x7FFF_FFFF_FFFF).contains(&value) {
        6
    } else if (-0x80_0000_0000_0000..=0x7F_FFFF_FFFF_FFFF).contains(&value) {
        7
    } else {
        8
    };

    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(&value.to_be_bytes()[8 - width..]);
    (buf, width)
}

fn decode_signed(value: &[u8], kind: &'static str, max: usize) -> BerResult<i64> {
    if value.is_empty() || value.len() > max {
        return Err(BerError::InvalidLength {
            kind,
            expected: if max == 4 { "1 to 4 bytes" } else { "1 to 8 bytes" },
            actual: value.len(),
        });
    }

    let seed: i64 = if value[0] & 0x80 != 0 { -1 } else { 0 };
    Ok(value
        .iter()
        .fold(seed, |acc, b| (acc << 8) | i64::from(*b)))
}

/// Decode a 32-bit integer value (1 to 4 bytes).
pub fn decode_integer_value(value: &[u8]) -> BerResult<i32> {
    decode_signed(value, "integer", 4).map(|v| v as i32)
}

/// Decode a 64-bit integer value (1 to 8 bytes).
pub fn decode_long_value(value: &[u8]) -> BerResult<i64> {
    decode_signed(value, "long", 8)
}

pub fn decode_null_value(value: &[u8]) -> BerResult<()> {
    if value.is_empty() {
        Ok(())
    } else {
        Err(BerError::InvalidLength {
            kind: "null",
            expected: "0 bytes",
            actual: value.len(),
        })
    }
}

pub fn decode_string_value(value: &[u8]) -> BerResult<&str> {
    Ok(std::str::from_utf8(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: i64) -> Vec<u8> {
        let (buf, width) = encode_integer_value(value);
        buf[..width].to_vec()
    }

    fn boundaries() -> Vec<i64> {
        let mut values = vec![0, 1, -1, i64::MIN, i64::MAX];
        for bits in [8u32, 16, 24, 32, 40, 48, 56] {
            let max = (1i64 << (bits - 1)) - 1;
            let min = -(1i64 << (bits - 1));
            values.extend([max, max + 1, min, min - 1]);
        }
        values
    }

    #[test]
    fn test_integer_round_trip_at_width_boundaries() {
        for value in boundaries() {
            let bytes = encode(value);
            assert_eq!(decode_long_value(&bytes).unwrap(), value, "value {}", value);
        }
    }

    #[test]
    fn test_integer_encoding_is_minimal() {
        for value in boundaries() {
            let bytes = encode(value);
            if bytes.len() > 1 {
                // Dropping the leading byte must change the value.
                let shorter = decode_long_value(&bytes[1..]).unwrap();
                assert_ne!(shorter, value, "non-minimal encoding for {}", value);
            }
        }
    }

    #[test]
    fn test_integer_known_encodings() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(127), vec![0x7F]);
        assert_eq!(encode(128), vec![0x00, 0x80]);
        assert_eq!(encode(-128), vec![0x80]);
        assert_eq!(encode(-129), vec![0xFF, 0x7F]);
        assert_eq!(encode(32768), vec![0x00, 0x80, 0x00]);
        assert_eq!(encode(i64::MIN), vec![0x80, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_integer_width_limits() {
        assert!(matches!(
            decode_integer_value(&[]),
            Err(BerError::InvalidLength { .. })
        ));
        assert!(matches!(
            decode_integer_value(&[0, 0, 0, 0, 1]),
            Err(BerError::InvalidLength { actual: 5, .. })
        ));
        assert_eq!(decode_long_value(&[0, 0, 0, 0, 1]).unwrap(), 1);
        assert!(decode_long_value(&[0; 9]).is_err());
        assert_eq!(decode_integer_value(&[0x80, 0, 0, 0]).unwrap(), i32::MIN);
    }

    #[test]
    fn test_decode_tolerates_redundant_leading_byte() {
        assert_eq!(decode_integer_value(&[0x00, 0x7F]).unwrap(), 127);
        assert_eq!(decode_integer_value(&[0xFF, 0xFF]).unwrap(), -1);
    }

    #[test]
    fn test_boolean_values() {
        assert_eq!(encode_boolean_value(true), [0xFF]);
        assert_eq!(encode_boolean_value(false), [0x00]);
        assert!(decode_boolean_value(&[0x01]).unwrap());
        assert!(!decode_boolean_value(&[0x00]).unwrap());
        assert!(matches!(
            decode_boolean_value(&[0xFF, 0x00]),
            Err(BerError::InvalidLength { actual: 2, .. })
        ));
        assert!(decode_boolean_value(&[]).is_err());
    }

    #[test]
    fn test_null_and_string_values() {
        assert!(decode_null_value(&[]).is_ok());
        assert!(decode_null_value(&[0]).is_err());
        assert_eq!(decode_string_value("héllo".as_bytes()).unwrap(), "héllo");
        assert!(matches!(
            decode_string_value(&[0xFF, 0xFE]),
            Err(BerError::InvalidUtf8(_))
        ));
    }
}
