// Framing for BER elements on async byte streams.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use super::element::BerElement;
use super::length::decode_length;
use super::stream::DEFAULT_MAX_ELEMENT_SIZE;
use super::BerError;

/// Splits a byte stream into complete top-level [`BerElement`]s.
#[derive(Debug, Clone)]
pub struct BerElementCodec {
    max_element_size: usize,
}

impl BerElementCodec {
    pub fn new() -> Self {
        Self {
            max_element_size: DEFAULT_MAX_ELEMENT_SIZE,
        }
    }

    pub fn with_max_element_size(max_element_size: usize) -> Self {
        Self { max_element_size }
    }
}

impl Default for BerElementCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for BerElementCodec {
    type Item = BerElement;
    type Error = BerError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Need the tag and the first length byte
        if src.len() < 2 {
            return Ok(None);
        }

        let (length, header_len) = match decode_length(&src[..], 1) {
            Ok(decoded) => decoded,
            Err(BerError::Truncated { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        if length > self.max_element_size {
            return Err(BerError::ElementTooLarge {
                length,
                max: self.max_element_size,
            });
        }

        let total_len = header_len + length;
        if src.len() < total_len {
            // Need more data
            src.reserve(total_len - src.len());
            return Ok(None);
        }

        let tag = src[0];
        src.advance(header_len);
        let value = src.split_to(length).freeze();
        debug!("Decoded BER frame: tag=0x{:02x}, length={}", tag, length);

        Ok(Some(BerElement::new(tag, value)))
    }
}

impl Encoder<BerElement> for BerElementCodec {
    type Error = BerError;

    fn encode(&mut self, item: BerElement, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.write_to_buf(dst);
        Ok(())
    }
}

impl Encoder<&BerElement> for BerElementCodec {
    type Error = BerError;

    fn encode(&mut self, item: &BerElement, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.write_to_buf(dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::BerSequence;
    use futures::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    #[test]
    fn test_waits_for_complete_frame() {
        let mut codec = BerElementCodec::new();
        let encoded = BerElement::octet_string(vec![7u8; 300]).encode();

        let mut src = BytesMut::new();
        src.extend_from_slice(&encoded[..1]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(&encoded[1..3]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(&encoded[3..100]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(&encoded[100..]);

        let element = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(element.value().len(), 300);
        assert!(src.is_empty());
    }

    #[test]
    fn test_decodes_back_to_back_frames() {
        let mut codec = BerElementCodec::new();
        let mut src = BytesMut::new();
        codec.encode(BerElement::integer(1), &mut src).unwrap();
        codec.encode(&BerElement::null(), &mut src).unwrap();

        assert_eq!(
            codec.decode(&mut src).unwrap().unwrap().decode_as_integer().unwrap(),
            1
        );
        assert!(codec.decode(&mut src).unwrap().unwrap().decode_as_null().is_ok());
        assert!(codec.decode(&mut src).unwrap().is_none());
    }

    #[test]
    fn test_rejects_oversized_frame() {
        let mut codec = BerElementCodec::with_max_element_size(16);
        let mut src = BytesMut::from(&[0x04u8, 0x81, 0xC8][..]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(BerError::ElementTooLarge { length: 200, .. })
        ));
    }

    #[test]
    fn test_rejects_bad_length_header() {
        let mut codec = BerElementCodec::new();
        let mut src = BytesMut::from(&[0x30u8, 0x85, 0, 0, 0, 0, 1][..]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(BerError::LengthTooLong { octets: 5 })
        ));
    }

    #[tokio::test]
    async fn test_framed_round_trip() {
        let sequence = BerSequence::new(vec![BerElement::integer(5), BerElement::string("x")]);

        let mut writer = FramedWrite::new(Vec::new(), BerElementCodec::new());
        writer.send(sequence.to_element()).await.unwrap();
        writer.send(BerElement::boolean(true)).await.unwrap();
        let bytes = writer.into_inner();

        let mut reader = FramedRead::new(&bytes[..], BerElementCodec::new());
        let first = reader.next().await.unwrap().unwrap();
        assert_eq!(BerSequence::decode(&first).unwrap(), sequence);
        let second = reader.next().await.unwrap().unwrap();
        assert!(second.decode_as_boolean().unwrap());
        assert!(reader.next().await.is_none());
    }
}
