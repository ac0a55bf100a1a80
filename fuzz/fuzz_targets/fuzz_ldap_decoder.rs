#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

use ldifber::ldap::LdapMessageCodec;

fuzz_target!(|data: &[u8]| {
    let mut buf = BytesMut::from(data);
    let mut codec = LdapMessageCodec::new();

    // Malformed input must surface as an error, never a panic.
    while let Ok(Some(message)) = codec.decode(&mut buf) {
        // Whatever decodes must encode again and decode to the same message.
        let reencoded = message.encode();
        let mut again = BytesMut::from(&reencoded[..]);
        let decoded = codec.decode(&mut again).ok().flatten();
        assert_eq!(decoded.as_ref(), Some(&message));
    }
});
