use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use super::protocol::LdapMessage;
use crate::ber::{BerBuffer, BerElementCodec};
use crate::LdifBerError;

/// Frames [`LdapMessage`]s on a byte stream.
#[derive(Debug, Default)]
pub struct LdapMessageCodec {
    frames: BerElementCodec,
    scratch: BerBuffer,
}

impl LdapMessageCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self {
            frames: BerElementCodec::with_max_element_size(max_message_size),
            scratch: BerBuffer::new(),
        }
    }
}

impl Decoder for LdapMessageCodec {
    type Item = LdapMessage;
    type Error = LdifBerError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(element) = self.frames.decode(src)? else {
            return Ok(None);
        };
        let message = LdapMessage::decode(&element)?;
        debug!(
            "Received LDAP message: id={}, op_tag=0x{:02x}",
            message.message_id,
            message.protocol_op.tag()
        );
        Ok(Some(message))
    }
}

impl Encoder<LdapMessage> for LdapMessageCodec {
    type Error = LdifBerError;

    fn encode(&mut self, item: LdapMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&LdapMessage>>::encode(self, &item, dst)
    }
}

impl Encoder<&LdapMessage> for LdapMessageCodec {
    type Error = LdifBerError;

    fn encode(&mut self, item: &LdapMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.scratch.clear();
        item.encode_to(&mut self.scratch);
        self.scratch.write_to(dst);
        Ok(())
    }
}
