use bytes::Bytes;

use crate::ber::{tags, BerBuffer, BerElement};
use crate::ldif::{
    AddRecord, Attribute, DeleteRecord, Entry, LdifControl, LdifRecord, Modification,
    ModificationType, ModifyDnRecord, ModifyRecord,
};
use crate::{LdifBerError, Result};

pub type LdapMessageId = i32;

pub const LDAP_SEARCH_RESULT_ENTRY: u8 = 0x64;
pub const LDAP_MODIFY_REQUEST: u8 = 0x66;
pub const LDAP_ADD_REQUEST: u8 = 0x68;
pub const LDAP_DEL_REQUEST: u8 = 0x4A;
pub const LDAP_MODIFY_DN_REQUEST: u8 = 0x6C;

const CONTROLS_TAG: u8 = 0xA0;
const NEW_SUPERIOR_TAG: u8 = 0x80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapMessage {
    pub message_id: LdapMessageId,
    pub protocol_op: LdapProtocolOp,
    pub controls: Vec<LdifControl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LdapProtocolOp {
    SearchResultEntry {
        dn: String,
        attributes: Vec<Attribute>,
    },
    AddRequest {
        dn: String,
        attributes: Vec<Attribute>,
    },
    DelRequest {
        dn: String,
    },
    ModifyRequest {
        dn: String,
        modifications: Vec<Modification>,
    },
    ModifyDnRequest {
        dn: String,
        new_rdn: String,
        delete_old_rdn: bool,
        new_superior: Option<String>,
    },
}

impl LdapProtocolOp {
    pub fn tag(&self) -> u8 {
        match self {
            LdapProtocolOp::SearchResultEntry { .. } => LDAP_SEARCH_RESULT_ENTRY,
            LdapProtocolOp::AddRequest { .. } => LDAP_ADD_REQUEST,
            LdapProtocolOp::DelRequest { .. } => LDAP_DEL_REQUEST,
            LdapProtocolOp::ModifyRequest { .. } => LDAP_MODIFY_REQUEST,
            LdapProtocolOp::ModifyDnRequest { .. } => LDAP_MODIFY_DN_REQUEST,
        }
    }

    pub fn dn(&self) -> &str {
        match self {
            LdapProtocolOp::SearchResultEntry { dn, .. }
            | LdapProtocolOp::AddRequest { dn, .. }
            | LdapProtocolOp::DelRequest { dn }
            | LdapProtocolOp::ModifyRequest { dn, .. }
            | LdapProtocolOp::ModifyDnRequest { dn, .. } => dn,
        }
    }
}

impl LdapMessage {
    pub fn new(message_id: LdapMessageId, protocol_op: LdapProtocolOp) -> Self {
        Self {
            message_id,
            protocol_op,
            controls: Vec::new(),
        }
    }

    /// Entries become search result entries, change records the matching
    /// update request.
    pub fn from_record(message_id: LdapMessageId, record: LdifRecord) -> Self {
        let (protocol_op, controls) = match record {
            LdifRecord::Entry(Entry { dn, attributes }) => {
                (LdapProtocolOp::SearchResultEntry { dn, attributes }, Vec::new())
            }
            LdifRecord::Add(AddRecord {
                dn,
                attributes,
                controls,
            }) => (LdapProtocolOp::AddRequest { dn, attributes }, controls),
            LdifRecord::Delete(DeleteRecord { dn, controls }) => {
                (LdapProtocolOp::DelRequest { dn }, controls)
            }
            LdifRecord::Modify(ModifyRecord {
                dn,
                modifications,
                controls,
            }) => (LdapProtocolOp::ModifyRequest { dn, modifications }, controls),
            LdifRecord::ModifyDn(ModifyDnRecord {
                dn,
                new_rdn,
                delete_old_rdn,
                new_superior,
                controls,
            }) => (
                LdapProtocolOp::ModifyDnRequest {
                    dn,
                    new_rdn,
                    delete_old_rdn,
                    new_superior,
                },
                controls,
            ),
        };

        Self {
            message_id,
            protocol_op,
            controls,
        }
    }

    pub fn into_record(self) -> LdifRecord {
        let controls = self.controls;
        match self.protocol_op {
            LdapProtocolOp::SearchResultEntry { dn, attributes } => {
                LdifRecord::Entry(Entry { dn, attributes })
            }
            LdapProtocolOp::AddRequest { dn, attributes } => LdifRecord::Add(AddRecord {
                dn,
                attributes,
                controls,
            }),
            LdapProtocolOp::DelRequest { dn } => LdifRecord::Delete(DeleteRecord { dn, controls }),
            LdapProtocolOp::ModifyRequest { dn, modifications } => {
                LdifRecord::Modify(ModifyRecord {
                    dn,
                    modifications,
                    controls,
                })
            }
            LdapProtocolOp::ModifyDnRequest {
                dn,
                new_rdn,
                delete_old_rdn,
                new_superior,
            } => LdifRecord::ModifyDn(ModifyDnRecord {
                dn,
                new_rdn,
                delete_old_rdn,
                new_superior,
                controls,
            }),
        }
    }

    /// Append the BER encoding of this message to `buffer`.
    pub fn encode_to(&self, buffer: &mut BerBuffer) {
        let message = buffer.begin_sequence();
        buffer.add_integer(tags::INTEGER, i64::from(self.message_id));

        match &self.protocol_op {
            LdapProtocolOp::SearchResultEntry { dn, attributes }
            | LdapProtocolOp::AddRequest { dn, attributes } => {
                let op = buffer.begin_container(self.protocol_op.tag());
                write_dn(buffer, tags::OCTET_STRING, dn);
                let list = buffer.begin_sequence();
                for attribute in attributes {
                    write_attribute(buffer, attribute);
                }
                buffer.end_container(list);
                buffer.end_container(op);
            }
            LdapProtocolOp::DelRequest { dn } => {
                write_dn(buffer, LDAP_DEL_REQUEST, dn);
            }
            LdapProtocolOp::ModifyRequest { dn, modifications } => {
                let op = buffer.begin_container(LDAP_MODIFY_REQUEST);
                write_dn(buffer, tags::OCTET_STRING, dn);
                let changes = buffer.begin_sequence();
                for modification in modifications {
                    let change = buffer.begin_sequence();
                    buffer.add_enumerated(tags::ENUMERATED, modification.kind as i64);
                    write_attribute(buffer, &modification.attribute);
                    buffer.end_container(change);
                }
                buffer.end_container(changes);
                buffer.end_container(op);
            }
            LdapProtocolOp::ModifyDnRequest {
                dn,
                new_rdn,
                delete_old_rdn,
                new_superior,
            } => {
                let op = buffer.begin_container(LDAP_MODIFY_DN_REQUEST);
                write_dn(buffer, tags::OCTET_STRING, dn);
                write_dn(buffer, tags::OCTET_STRING, new_rdn);
                buffer.add_boolean(tags::BOOLEAN, *delete_old_rdn);
                if let Some(new_superior) = new_superior {
                    write_dn(buffer, NEW_SUPERIOR_TAG, new_superior);
                }
                buffer.end_container(op);
            }
        }

        if !self.controls.is_empty() {
            let controls = buffer.begin_container(CONTROLS_TAG);
            for control in &self.controls {
                let sequence = buffer.begin_sequence();
                buffer.add_str(tags::OCTET_STRING, &control.oid);
                if control.critical {
                    buffer.add_boolean(tags::BOOLEAN, true);
                }
                if let Some(value) = &control.value {
                    buffer.add_octet_string(tags::OCTET_STRING, value);
                }
                buffer.end_container(sequence);
            }
            buffer.end_container(controls);
        }

        buffer.end_container(message);
    }

    pub fn encode(&self) -> Bytes {
        let mut buffer = BerBuffer::new();
        self.encode_to(&mut buffer);
        buffer.into_bytes()
    }

    /// Decode one LDAPMessage sequence.
    pub fn decode(element: &BerElement) -> Result<Self> {
        element.expect_tag(tags::SEQUENCE)?;
        let children = element.decode_as_children()?;
        let mut children = children.into_iter();

        let message_id = next(&mut children, "messageID")?
            .expect_tag(tags::INTEGER)?
            .decode_as_integer()?;
        if message_id < 0 {
            return Err(LdifBerError::Protocol(format!(
                "negative message ID {message_id}"
            )));
        }

        let op = next(&mut children, "protocolOp")?;
        let protocol_op = decode_protocol_op(&op)?;

        let controls = match children.next() {
            Some(controls) => decode_controls(&controls)?,
            None => Vec::new(),
        };
        if let Some(extra) = children.next() {
            return Err(LdifBerError::Protocol(format!(
                "unexpected element with tag 0x{:02x} after controls",
                extra.tag()
            )));
        }

        Ok(Self {
            message_id,
            protocol_op,
            controls,
        })
    }
}

// The prefix is sized from the character count; a non-ASCII DN gets it
// rewritten once the UTF-8 bytes are known.
fn write_dn(buffer: &mut BerBuffer, tag: u8, dn: &str) {
    buffer.add_display(tag, &dn, dn.chars().count());
}

fn write_attribute(buffer: &mut BerBuffer, attribute: &Attribute) {
    let sequence = buffer.begin_sequence();
    buffer.add_str(tags::OCTET_STRING, &attribute.name);
    let values = buffer.begin_set();
    for value in &attribute.values {
        buffer.add_octet_string(tags::OCTET_STRING, value);
    }
    buffer.end_container(values);
    buffer.end_container(sequence);
}

fn next(children: &mut impl Iterator<Item = BerElement>, what: &str) -> Result<BerElement> {
    children
        .next()
        .ok_or_else(|| LdifBerError::Protocol(format!("missing {what}")))
}

fn decode_string(element: &BerElement, tag: u8) -> Result<String> {
    Ok(element.expect_tag(tag)?.decode_as_str()?.to_string())
}

fn decode_attribute(element: &BerElement) -> Result<Attribute> {
    element.expect_tag(tags::SEQUENCE)?;
    let mut parts = element.decode_as_children()?.into_iter();
    let name = decode_string(&next(&mut parts, "attribute type")?, tags::OCTET_STRING)?;
    let values = next(&mut parts, "attribute values")?;
    values.expect_tag(tags::SET)?;
    let values = values
        .decode_as_children()?
        .into_iter()
        .map(|value| -> Result<Bytes> {
            value.expect_tag(tags::OCTET_STRING)?;
            Ok(value.into_value())
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Attribute::new(name, values))
}

fn decode_attribute_list(element: &BerElement) -> Result<Vec<Attribute>> {
    element.expect_tag(tags::SEQUENCE)?;
    element
        .decode_as_children()?
        .iter()
        .map(decode_attribute)
        .collect()
}

fn decode_protocol_op(op: &BerElement) -> Result<LdapProtocolOp> {
    match op.tag() {
        LDAP_DEL_REQUEST => Ok(LdapProtocolOp::DelRequest {
            dn: op.decode_as_str()?.to_string(),
        }),
        LDAP_SEARCH_RESULT_ENTRY | LDAP_ADD_REQUEST => {
            let mut parts = op.decode_as_children()?.into_iter();
            let dn = decode_string(&next(&mut parts, "entry DN")?, tags::OCTET_STRING)?;
            let attributes = decode_attribute_list(&next(&mut parts, "attribute list")?)?;
            Ok(if op.tag() == LDAP_ADD_REQUEST {
                LdapProtocolOp::AddRequest { dn, attributes }
            } else {
                LdapProtocolOp::SearchResultEntry { dn, attributes }
            })
        }
        LDAP_MODIFY_REQUEST => {
            let mut parts = op.decode_as_children()?.into_iter();
            let dn = decode_string(&next(&mut parts, "object DN")?, tags::OCTET_STRING)?;
            let changes = next(&mut parts, "changes")?;
            changes.expect_tag(tags::SEQUENCE)?;

            let modifications = changes
                .decode_as_children()?
                .iter()
                .map(|change| -> Result<Modification> {
                    change.expect_tag(tags::SEQUENCE)?;
                    let mut parts = change.decode_as_children()?.into_iter();
                    let code = next(&mut parts, "modification operation")?
                        .expect_tag(tags::ENUMERATED)?
                        .decode_as_integer()?;
                    let kind = ModificationType::from_code(code).ok_or_else(|| {
                        LdifBerError::Protocol(format!("unknown modification operation {code}"))
                    })?;
                    let attribute = decode_attribute(&next(&mut parts, "modification")?)?;
                    Ok(Modification::new(kind, attribute))
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(LdapProtocolOp::ModifyRequest { dn, modifications })
        }
        LDAP_MODIFY_DN_REQUEST => {
            let mut parts = op.decode_as_children()?.into_iter();
            let dn = decode_string(&next(&mut parts, "entry DN")?, tags::OCTET_STRING)?;
            let new_rdn = decode_string(&next(&mut parts, "new RDN")?, tags::OCTET_STRING)?;
            let delete_old_rdn = next(&mut parts, "deleteoldrdn")?
                .expect_tag(tags::BOOLEAN)?
                .decode_as_boolean()?;
            let new_superior = parts
                .next()
                .map(|element| decode_string(&element, NEW_SUPERIOR_TAG))
                .transpose()?;
            Ok(LdapProtocolOp::ModifyDnRequest {
                dn,
                new_rdn,
                delete_old_rdn,
                new_superior,
            })
        }
        other => Err(LdifBerError::Protocol(format!(
            "unsupported operation tag: 0x{other:02x}"
        ))),
    }
}

fn decode_controls(element: &BerElement) -> Result<Vec<LdifControl>> {
    element.expect_tag(CONTROLS_TAG)?;
    element
        .decode_as_children()?
        .iter()
        .map(|control| -> Result<LdifControl> {
            control.expect_tag(tags::SEQUENCE)?;
            let mut parts = control.decode_as_children()?.into_iter().peekable();
            let oid = decode_string(&next(&mut parts, "control type")?, tags::OCTET_STRING)?;
            let critical = match parts.next_if(|p| p.tag() == tags::BOOLEAN) {
                Some(flag) => flag.decode_as_boolean()?,
                None => false,
            };
            let value = parts
                .next()
                .map(|v| -> Result<Bytes> {
                    v.expect_tag(tags::OCTET_STRING)?;
                    Ok(v.into_value())
                })
                .transpose()?;
            Ok(LdifControl {
                oid,
                critical,
                value,
            })
        })
        .collect()
}
