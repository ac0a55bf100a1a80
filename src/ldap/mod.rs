pub mod codec;
pub mod protocol;

pub use codec::LdapMessageCodec;
pub use protocol::{LdapMessage, LdapMessageId, LdapProtocolOp};
