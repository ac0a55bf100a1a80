#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use bytes::{BufMut, BytesMut};
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

use ldifber::ldap::LdapMessageCodec;

// Semi-valid LDAP messages: well-formed framing with fuzzed lengths and tags
#[derive(Arbitrary, Debug)]
struct FuzzLdapMessage {
    sequence_tag: u8,
    length: FuzzLength,
    message_id: FuzzInteger,
    operation: FuzzOperation,
    controls: Option<Vec<FuzzControl>>,
}

#[derive(Arbitrary, Debug)]
enum FuzzLength {
    Short(u8),
    Long { num_octets: u8, value: u32 },
}

#[derive(Arbitrary, Debug)]
struct FuzzInteger {
    tag: u8,
    length: u8,
    value: u32,
}

#[derive(Arbitrary, Debug)]
struct FuzzAttribute {
    name: Vec<u8>,
    values: Vec<Vec<u8>>,
}

#[derive(Arbitrary, Debug)]
struct FuzzControl {
    oid: Vec<u8>,
    critical: Option<u8>,
    value: Option<Vec<u8>>,
}

#[derive(Arbitrary, Debug)]
enum FuzzOperation {
    AddRequest {
        dn: Vec<u8>,
        attributes: Vec<FuzzAttribute>,
    },
    DelRequest {
        dn: Vec<u8>,
    },
    ModifyRequest {
        dn: Vec<u8>,
        changes: Vec<(u8, FuzzAttribute)>,
    },
    ModifyDnRequest {
        dn: Vec<u8>,
        new_rdn: Vec<u8>,
        delete_old_rdn: u8,
        new_superior: Option<Vec<u8>>,
    },
    Random {
        tag: u8,
        data: Vec<u8>,
    },
}

fn put_tlv(buf: &mut BytesMut, tag: u8, value: &[u8]) {
    let value = &value[..value.len().min(255)];
    buf.put_u8(tag);
    if value.len() > 127 {
        buf.put_u8(0x81);
    }
    buf.put_u8(value.len() as u8);
    buf.put_slice(value);
}

fn put_attribute(buf: &mut BytesMut, attribute: &FuzzAttribute) {
    let mut inner = BytesMut::new();
    put_tlv(&mut inner, 0x04, &attribute.name);
    let mut values = BytesMut::new();
    for value in attribute.values.iter().take(8) {
        put_tlv(&mut values, 0x04, value);
    }
    put_tlv(&mut inner, 0x31, &values);
    put_tlv(buf, 0x30, &inner);
}

impl FuzzLdapMessage {
    fn to_bytes(&self) -> BytesMut {
        let mut body = BytesMut::new();

        // Message ID
        body.put_u8(self.message_id.tag);
        body.put_u8(self.message_id.length);
        body.put_u32(self.message_id.value);

        match &self.operation {
            FuzzOperation::AddRequest { dn, attributes } => {
                let mut op = BytesMut::new();
                put_tlv(&mut op, 0x04, dn);
                let mut list = BytesMut::new();
                for attribute in attributes.iter().take(8) {
                    put_attribute(&mut list, attribute);
                }
                put_tlv(&mut op, 0x30, &list);
                put_tlv(&mut body, 0x68, &op);
            }
            FuzzOperation::DelRequest { dn } => put_tlv(&mut body, 0x4A, dn),
            FuzzOperation::ModifyRequest { dn, changes } => {
                let mut op = BytesMut::new();
                put_tlv(&mut op, 0x04, dn);
                let mut list = BytesMut::new();
                for (kind, attribute) in changes.iter().take(8) {
                    let mut change = BytesMut::new();
                    put_tlv(&mut change, 0x0A, &[*kind]);
                    put_attribute(&mut change, attribute);
                    put_tlv(&mut list, 0x30, &change);
                }
                put_tlv(&mut op, 0x30, &list);
                put_tlv(&mut body, 0x66, &op);
            }
            FuzzOperation::ModifyDnRequest {
                dn,
                new_rdn,
                delete_old_rdn,
                new_superior,
            } => {
                let mut op = BytesMut::new();
                put_tlv(&mut op, 0x04, dn);
                put_tlv(&mut op, 0x04, new_rdn);
                put_tlv(&mut op, 0x01, &[*delete_old_rdn]);
                if let Some(superior) = new_superior {
                    put_tlv(&mut op, 0x80, superior);
                }
                put_tlv(&mut body, 0x6C, &op);
            }
            FuzzOperation::Random { tag, data } => {
                body.put_u8(*tag);
                body.put_slice(&data[..data.len().min(1000)]);
            }
        }

        if let Some(controls) = &self.controls {
            let mut list = BytesMut::new();
            for control in controls.iter().take(4) {
                let mut inner = BytesMut::new();
                put_tlv(&mut inner, 0x04, &control.oid);
                if let Some(critical) = control.critical {
                    put_tlv(&mut inner, 0x01, &[critical]);
                }
                if let Some(value) = &control.value {
                    put_tlv(&mut inner, 0x04, value);
                }
                put_tlv(&mut list, 0x30, &inner);
            }
            put_tlv(&mut body, 0xA0, &list);
        }

        let mut buf = BytesMut::new();
        buf.put_u8(self.sequence_tag);
        match &self.length {
            FuzzLength::Short(len) => buf.put_u8(*len),
            FuzzLength::Long { num_octets, value } => {
                buf.put_u8(0x80 | (num_octets & 0x7f));
                for i in (0..*num_octets as u32).rev() {
                    buf.put_u8(value.checked_shr(i * 8).unwrap_or(0) as u8);
                }
            }
        }
        buf.put_slice(&body);
        buf
    }
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    if let Ok(msg) = FuzzLdapMessage::arbitrary(&mut u) {
        let mut buf = msg.to_bytes();
        let mut codec = LdapMessageCodec::new();
        // Errors are expected for malformed input; panics are not.
        let _ = codec.decode(&mut buf);
    }
});
