use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use regex::Regex;
use std::borrow::Cow;
use std::sync::{Arc, OnceLock};
use tracing::trace;

use super::error::LdifError;
use super::matching::{CaseIgnoreStringMatchingRule, MatchingRule};
use super::record::{
    AddRecord, Attribute, DeleteRecord, Entry, LdifControl, LdifRecord, Modification,
    ModificationType, ModifyDnRecord, ModifyRecord,
};
use super::tokenizer::{DuplicateValueBehavior, TrailingSpaceBehavior, UnparsedLdifRecord};

/// Largest file a `name:< file:` reference may pull in.
pub const DEFAULT_MAX_URL_FILE_SIZE: u64 = 10 * 1024 * 1024;

fn attribute_description_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[A-Za-z][A-Za-z0-9-]*|[0-9]+(?:\.[0-9]+)*)(?:;[A-Za-z0-9-]+)*$")
            .expect("attribute description pattern is valid")
    })
}

/// Stateless record decoder; clone it into every worker.
#[derive(Debug, Clone)]
pub struct RecordDecoder {
    matching_rule: Arc<dyn MatchingRule>,
    max_url_file_size: u64,
}

impl Default for RecordDecoder {
    fn default() -> Self {
        Self::new(Arc::new(CaseIgnoreStringMatchingRule), DEFAULT_MAX_URL_FILE_SIZE)
    }
}

impl RecordDecoder {
    pub fn new(matching_rule: Arc<dyn MatchingRule>, max_url_file_size: u64) -> Self {
        Self {
            matching_rule,
            max_url_file_size,
        }
    }

    pub fn matching_rule(&self) -> &Arc<dyn MatchingRule> {
        &self.matching_rule
    }

    pub fn decode(&self, record: &UnparsedLdifRecord) -> Result<LdifRecord, LdifError> {
        RecordParser {
            record,
            decoder: self,
        }
        .parse()
    }
}

/// One `name: value` line after value decoding.
struct Line {
    name: String,
    value: Bytes,
}

impl Line {
    fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }
}

struct RecordParser<'a> {
    record: &'a UnparsedLdifRecord,
    decoder: &'a RecordDecoder,
}

impl<'a> RecordParser<'a> {
    fn error(&self, message: impl Into<String>) -> LdifError {
        LdifError::new(message, self.record.first_line_number(), true)
            .with_data_lines(self.record.lines())
    }

    fn parse(&self) -> Result<LdifRecord, LdifError> {
        if let Some(line) = self.record.invalid_utf8_line() {
            return Err(self.error(format!("line {line} is not valid UTF-8")));
        }
        let lines = self.apply_trailing_space_policy()?;
        let Some((first, rest)) = lines.split_first() else {
            return Err(self.error("record has no lines"));
        };

        let dn_line = self.parse_line(first)?;
        if !dn_line.name.eq_ignore_ascii_case("dn") {
            return Err(self.error(format!(
                "first line of a record must start with 'dn:', found '{first}'"
            )));
        }
        let dn = self.utf8(&dn_line, "DN")?.to_string();

        let mut controls = Vec::new();
        let mut index = 0;
        while let Some(raw) = rest.get(index) {
            let line = self.parse_line(raw)?;
            if !line.name.eq_ignore_ascii_case("control") {
                break;
            }
            controls.push(self.parse_control(&line)?);
            index += 1;
        }

        let body = &rest[index..];
        let change_type = match body.first() {
            Some(raw) => {
                let line = self.parse_line(raw)?;
                line.name
                    .eq_ignore_ascii_case("changetype")
                    .then(|| self.utf8(&line, "changetype").map(|v| v.trim().to_ascii_lowercase()))
                    .transpose()?
            }
            None => None,
        };

        let Some(change_type) = change_type else {
            if !controls.is_empty() {
                return Err(self.error("controls are only allowed in change records"));
            }
            let attributes = self.parse_attributes(body)?;
            trace!("Decoded entry {} with {} attributes", dn, attributes.len());
            return Ok(LdifRecord::Entry(Entry { dn, attributes }));
        };

        let body = &body[1..];
        match change_type.as_str() {
            "add" => {
                let attributes = self.parse_attributes(body)?;
                if attributes.is_empty() {
                    return Err(self.error("add change record must contain at least one attribute"));
                }
                Ok(LdifRecord::Add(AddRecord {
                    dn,
                    attributes,
                    controls,
                }))
            }
            "delete" => {
                if let Some(extra) = body.first() {
                    return Err(self.error(format!(
                        "delete change record must not contain further lines, found '{extra}'"
                    )));
                }
                Ok(LdifRecord::Delete(DeleteRecord { dn, controls }))
            }
            "modify" => Ok(LdifRecord::Modify(ModifyRecord {
                dn,
                modifications: self.parse_modifications(body)?,
                controls,
            })),
            "moddn" | "modrdn" => self.parse_modify_dn(dn, controls, body),
            other => Err(self.error(format!("unsupported changetype '{other}'"))),
        }
    }

    fn apply_trailing_space_policy(&self) -> Result<Vec<Cow<'a, str>>, LdifError> {
        let behavior = self.record.trailing_space_behavior();
        self.record
            .lines()
            .iter()
            .map(|line| {
                if !line.ends_with(' ') || has_blank_value(line) {
                    return Ok(Cow::Borrowed(line.as_str()));
                }
                match behavior {
                    TrailingSpaceBehavior::Strip => Ok(Cow::Borrowed(line.trim_end_matches(' '))),
                    TrailingSpaceBehavior::Retain => Ok(Cow::Borrowed(line.as_str())),
                    TrailingSpaceBehavior::Reject => Err(self.error(format!(
                        "line ends with an illegal trailing space: '{line}'"
                    ))),
                }
            })
            .collect()
    }

    fn parse_line(&self, raw: &str) -> Result<Line, LdifError> {
        let Some(colon) = raw.find(':') else {
            return Err(self.error(format!("line '{raw}' does not contain a colon")));
        };
        let name = &raw[..colon];
        if !attribute_description_regex().is_match(name) {
            return Err(self.error(format!("invalid attribute description '{name}' in line '{raw}'")));
        }

        let rest = &raw[colon + 1..];
        let value = if let Some(encoded) = rest.strip_prefix(':') {
            let encoded = encoded.trim();
            BASE64.decode(encoded).map(Bytes::from).map_err(|e| {
                self.error(format!("unable to base64-decode the value of '{name}'"))
                    .with_cause(e)
            })?
        } else if let Some(url) = rest.strip_prefix('<') {
            self.read_url(name, url.trim())?
        } else {
            Bytes::copy_from_slice(rest.trim_start_matches(' ').as_bytes())
        };

        Ok(Line {
            name: name.to_string(),
            value,
        })
    }

    fn read_url(&self, name: &str, url: &str) -> Result<Bytes, LdifError> {
        let Some(path) = strip_prefix_ignore_case(url, "file:") else {
            return Err(self.error(format!(
                "unsupported URL '{url}' for '{name}': only file: URLs are allowed"
            )));
        };
        let path = path.strip_prefix("//").unwrap_or(path);

        let metadata = std::fs::metadata(path).map_err(|e| {
            self.error(format!("unable to read file '{path}' referenced by '{name}'"))
                .with_cause(e)
        })?;
        if metadata.len() > self.decoder.max_url_file_size {
            return Err(self.error(format!(
                "file '{}' referenced by '{}' is {} bytes, larger than the {} byte limit",
                path,
                name,
                metadata.len(),
                self.decoder.max_url_file_size
            )));
        }

        std::fs::read(path).map(Bytes::from).map_err(|e| {
            self.error(format!("unable to read file '{path}' referenced by '{name}'"))
                .with_cause(e)
        })
    }

    fn utf8<'l>(&self, line: &'l Line, what: &str) -> Result<&'l str, LdifError> {
        line.value_str()
            .ok_or_else(|| self.error(format!("{what} value is not valid UTF-8")))
    }

    fn parse_control(&self, line: &Line) -> Result<LdifControl, LdifError> {
        let text = self.utf8(line, "control")?;
        let text = text.trim_start();
        let oid_end = text.find([' ', ':']).unwrap_or(text.len());
        let oid = &text[..oid_end];
        if oid.is_empty() || !oid.split('.').all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())) {
            return Err(self.error(format!("invalid control OID '{oid}'")));
        }

        let mut rest = text[oid_end..].trim_start_matches(' ');
        let mut critical = false;
        let criticality_end = rest.find(':').unwrap_or(rest.len());
        let token = rest[..criticality_end].trim();
        if !token.is_empty() {
            critical = match token.to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => return Err(self.error(format!("invalid control criticality '{token}'"))),
            };
            rest = &rest[criticality_end..];
        }

        let value = if let Some(encoded) = rest.strip_prefix("::") {
            Some(BASE64.decode(encoded.trim()).map(Bytes::from).map_err(|e| {
                self.error(format!("unable to base64-decode the value of control {oid}"))
                    .with_cause(e)
            })?)
        } else if let Some(url) = rest.strip_prefix(":<") {
            Some(self.read_url("control", url.trim())?)
        } else {
            rest.strip_prefix(':')
                .map(|plain| Bytes::copy_from_slice(plain.trim_start_matches(' ').as_bytes()))
        };

        Ok(LdifControl {
            oid: oid.to_string(),
            critical,
            value,
        })
    }

    fn parse_attributes(&self, lines: &[Cow<'_, str>]) -> Result<Vec<Attribute>, LdifError> {
        let mut accumulator = AttributeAccumulator::new(self);
        for raw in lines {
            let line = self.parse_line(raw)?;
            accumulator.add(line.name, line.value)?;
        }
        Ok(accumulator.finish())
    }

    fn parse_modifications(&self, lines: &[Cow<'_, str>]) -> Result<Vec<Modification>, LdifError> {
        let mut modifications = Vec::new();
        let mut iter = lines.iter().peekable();

        while let Some(raw) = iter.next() {
            let header = self.parse_line(raw)?;
            let Some(kind) = ModificationType::from_keyword(&header.name) else {
                return Err(self.error(format!(
                    "expected add, delete, replace or increment in modify record, found '{raw}'"
                )));
            };
            let attribute_name = self.utf8(&header, "modification attribute")?.trim().to_string();
            if !attribute_description_regex().is_match(&attribute_name) {
                return Err(self.error(format!("invalid attribute description '{attribute_name}'")));
            }

            let mut accumulator = AttributeAccumulator::new(self);
            let mut value_lines = 0usize;
            while let Some(next) = iter.next_if(|l| !is_separator(l)) {
                let line = self.parse_line(next)?;
                if !line.name.eq_ignore_ascii_case(&attribute_name) {
                    return Err(self.error(format!(
                        "attribute '{}' does not match '{}' in {} modification",
                        line.name,
                        attribute_name,
                        kind.keyword()
                    )));
                }
                value_lines += 1;
                accumulator.add(attribute_name.clone(), line.value)?;
            }
            // Consume the '-' separator, optional after the last block.
            iter.next_if(|l| is_separator(l));

            let values = match accumulator.finish().pop() {
                Some(attribute) => attribute.values,
                None => Vec::new(),
            };
            match kind {
                ModificationType::Add if values.is_empty() => {
                    return Err(self.error(format!(
                        "add modification for '{attribute_name}' must have at least one value"
                    )));
                }
                ModificationType::Increment if value_lines != 1 => {
                    return Err(self.error(format!(
                        "increment modification for '{attribute_name}' must have exactly one value"
                    )));
                }
                _ => {}
            }

            modifications.push(Modification::new(kind, Attribute::new(attribute_name, values)));
        }

        if modifications.is_empty() {
            return Err(self.error("modify change record must contain at least one modification"));
        }
        Ok(modifications)
    }

    fn parse_modify_dn(
        &self,
        dn: String,
        controls: Vec<LdifControl>,
        lines: &[Cow<'_, str>],
    ) -> Result<LdifRecord, LdifError> {
        let mut iter = lines.iter();

        let new_rdn = match iter.next() {
            Some(raw) => {
                let line = self.parse_line(raw)?;
                if !line.name.eq_ignore_ascii_case("newrdn") {
                    return Err(self.error(format!("expected 'newrdn:' but found '{raw}'")));
                }
                self.utf8(&line, "newrdn")?.to_string()
            }
            None => return Err(self.error("modify DN change record is missing 'newrdn:'")),
        };

        let delete_old_rdn = match iter.next() {
            Some(raw) => {
                let line = self.parse_line(raw)?;
                if !line.name.eq_ignore_ascii_case("deleteoldrdn") {
                    return Err(self.error(format!("expected 'deleteoldrdn:' but found '{raw}'")));
                }
                let value = self.utf8(&line, "deleteoldrdn")?.trim();
                parse_delete_old_rdn(value).ok_or_else(|| {
                    self.error(format!("invalid deleteoldrdn value '{value}'"))
                })?
            }
            None => return Err(self.error("modify DN change record is missing 'deleteoldrdn:'")),
        };

        let new_superior = match iter.next() {
            Some(raw) => {
                let line = self.parse_line(raw)?;
                if !line.name.eq_ignore_ascii_case("newsuperior") {
                    return Err(self.error(format!("expected 'newsuperior:' but found '{raw}'")));
                }
                Some(self.utf8(&line, "newsuperior")?.to_string())
            }
            None => None,
        };

        if let Some(extra) = iter.next() {
            return Err(self.error(format!(
                "unexpected line '{extra}' in modify DN change record"
            )));
        }

        Ok(LdifRecord::ModifyDn(ModifyDnRecord {
            dn,
            new_rdn,
            delete_old_rdn,
            new_superior,
            controls,
        }))
    }
}

struct AttributeAccumulator<'p, 'a> {
    parser: &'p RecordParser<'a>,
    behavior: DuplicateValueBehavior,
    attributes: Vec<Attribute>,
}

impl<'p, 'a> AttributeAccumulator<'p, 'a> {
    fn new(parser: &'p RecordParser<'a>) -> Self {
        Self {
            parser,
            behavior: parser.record.duplicate_value_behavior(),
            attributes: Vec::new(),
        }
    }

    fn add(&mut self, name: String, value: Bytes) -> Result<(), LdifError> {
        let Some(attribute) = self.attributes.iter_mut().find(|a| a.has_name(&name)) else {
            self.attributes.push(Attribute::new(name, vec![value]));
            return Ok(());
        };

        let rule = &self.parser.decoder.matching_rule;
        let duplicate = attribute
            .values
            .iter()
            .any(|existing| rule.values_match(&attribute.name, existing, &value));
        if !duplicate {
            attribute.values.push(value);
            return Ok(());
        }

        match self.behavior {
            DuplicateValueBehavior::Strip => Ok(()),
            DuplicateValueBehavior::Retain => {
                attribute.values.push(value);
                Ok(())
            }
            DuplicateValueBehavior::Reject => Err(self.parser.error(format!(
                "duplicate value '{}' for attribute '{}'",
                String::from_utf8_lossy(&value),
                attribute.name
            ))),
        }
    }

    fn finish(self) -> Vec<Attribute> {
        self.attributes
    }
}

fn is_separator(line: &str) -> bool {
    line.trim_end() == "-"
}

// `cn: ` style lines carry an empty value, not a trailing space.
fn has_blank_value(line: &str) -> bool {
    line.find(':')
        .is_some_and(|colon| line[colon + 1..].bytes().all(|b| b == b' '))
}

fn strip_prefix_ignore_case<'s>(s: &'s str, prefix: &str) -> Option<&'s str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// `1`, `true`, `yes` map to true; `0`, `false`, `no` to false.
fn parse_delete_old_rdn(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldif::matching::OctetStringMatchingRule;
    use crate::ldif::tokenizer::LdifTokenizer;
    use std::io::Write as _;

    fn unparsed(
        text: &str,
        duplicates: DuplicateValueBehavior,
        trailing: TrailingSpaceBehavior,
    ) -> UnparsedLdifRecord {
        let mut tokenizer = LdifTokenizer::new(duplicates, trailing);
        let mut records = Vec::new();
        for line in text.split('\n') {
            records.extend(tokenizer.push_line(line).unwrap());
        }
        records.extend(tokenizer.finish());
        assert_eq!(records.len(), 1, "expected exactly one record");
        records.remove(0)
    }

    fn decode(text: &str) -> Result<LdifRecord, LdifError> {
        RecordDecoder::default().decode(&unparsed(
            text,
            DuplicateValueBehavior::default(),
            TrailingSpaceBehavior::default(),
        ))
    }

    fn values(attribute: &Attribute) -> Vec<&[u8]> {
        attribute.values.iter().map(|v| v.as_ref()).collect()
    }

    #[test]
    fn test_minimal_entry() {
        let record = decode("dn: cn=a\ncn: a\nobjectClass: top\n").unwrap();
        let LdifRecord::Entry(entry) = record else {
            panic!("expected an entry");
        };
        assert_eq!(entry.dn, "cn=a");
        assert_eq!(entry.attributes.len(), 2);
        assert_eq!(values(entry.attribute("cn").unwrap()), vec![b"a".as_slice()]);
        assert_eq!(values(entry.attribute("objectclass").unwrap()), vec![b"top".as_slice()]);
    }

    #[test]
    fn test_values_accumulate_case_insensitively() {
        let LdifRecord::Entry(entry) = decode("dn: cn=a\nmail: x@y\nMAIL: z@y\n").unwrap() else {
            panic!("expected an entry");
        };
        assert_eq!(entry.attributes.len(), 1);
        assert_eq!(entry.attributes[0].name, "mail");
        assert_eq!(entry.attributes[0].values.len(), 2);
    }

    #[test]
    fn test_base64_values_and_dn() {
        let LdifRecord::Entry(entry) = decode("dn:: Y249YQ==\nattr:: AAE=\n").unwrap() else {
            panic!("expected an entry");
        };
        assert_eq!(entry.dn, "cn=a");
        assert_eq!(values(entry.attribute("attr").unwrap()), vec![[0x00u8, 0x01].as_slice()]);
    }

    #[test]
    fn test_bad_base64_is_recoverable() {
        let err = decode("dn: cn=a\nattr:: !!!\n").unwrap_err();
        assert!(err.may_continue_reading());
        assert_eq!(err.line_number(), Some(1));
        assert_eq!(err.data_lines().len(), 2);
    }

    #[test]
    fn test_dn_must_come_first() {
        let err = decode("cn: a\ndn: cn=a\n").unwrap_err();
        assert!(err.message().contains("dn:"));
        assert!(err.may_continue_reading());
    }

    #[test]
    fn test_invalid_attribute_description() {
        assert!(decode("dn: cn=a\nbad name: x\n").is_err());
        assert!(decode("dn: cn=a\nno colon here\n").is_err());
        assert!(decode("dn: cn=a\ncn;lang-en: a\n2.5.4.3: b\n").is_ok());
    }

    #[test]
    fn test_duplicate_value_policies() {
        let text = "dn: cn=a\ncn: John\ncn: john\n";

        let strip = RecordDecoder::default()
            .decode(&unparsed(text, DuplicateValueBehavior::Strip, TrailingSpaceBehavior::Reject))
            .unwrap();
        let LdifRecord::Entry(entry) = strip else { panic!() };
        assert_eq!(entry.attributes[0].values.len(), 1);

        let retain = RecordDecoder::default()
            .decode(&unparsed(text, DuplicateValueBehavior::Retain, TrailingSpaceBehavior::Reject))
            .unwrap();
        let LdifRecord::Entry(entry) = retain else { panic!() };
        assert_eq!(entry.attributes[0].values.len(), 2);

        let err = RecordDecoder::default()
            .decode(&unparsed(text, DuplicateValueBehavior::Reject, TrailingSpaceBehavior::Reject))
            .unwrap_err();
        assert!(err.message().contains("duplicate"));
        assert!(err.may_continue_reading());
    }

    #[test]
    fn test_matching_rule_is_injected() {
        let decoder = RecordDecoder::new(Arc::new(OctetStringMatchingRule), DEFAULT_MAX_URL_FILE_SIZE);
        let record = decoder
            .decode(&unparsed(
                "dn: cn=a\ncn: John\ncn: john\n",
                DuplicateValueBehavior::Reject,
                TrailingSpaceBehavior::Reject,
            ))
            .unwrap();
        let LdifRecord::Entry(entry) = record else { panic!() };
        assert_eq!(entry.attributes[0].values.len(), 2);
    }

    #[test]
    fn test_trailing_space_policies() {
        let text = "dn: cn=a\ndescription: x \n";

        let err = RecordDecoder::default()
            .decode(&unparsed(text, DuplicateValueBehavior::Strip, TrailingSpaceBehavior::Reject))
            .unwrap_err();
        assert!(err.message().contains("'description: x '"));

        let LdifRecord::Entry(stripped) = RecordDecoder::default()
            .decode(&unparsed(text, DuplicateValueBehavior::Strip, TrailingSpaceBehavior::Strip))
            .unwrap()
        else {
            panic!()
        };
        assert_eq!(values(stripped.attribute("description").unwrap()), vec![b"x".as_slice()]);

        let LdifRecord::Entry(retained) = RecordDecoder::default()
            .decode(&unparsed(text, DuplicateValueBehavior::Strip, TrailingSpaceBehavior::Retain))
            .unwrap()
        else {
            panic!()
        };
        assert_eq!(values(retained.attribute("description").unwrap()), vec![b"x ".as_slice()]);
    }

    #[test]
    fn test_empty_value_is_not_a_trailing_space() {
        let LdifRecord::Entry(entry) = decode("dn: cn=a\ndescription: \n").unwrap() else {
            panic!()
        };
        assert_eq!(values(entry.attribute("description").unwrap()), vec![b"".as_slice()]);
    }

    #[test]
    fn test_file_url_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xCA, 0xFE]).unwrap();
        let path = file.path().display().to_string();

        let LdifRecord::Entry(entry) = decode(&format!("dn: cn=a\njpegPhoto:< file://{path}\n")).unwrap()
        else {
            panic!()
        };
        assert_eq!(values(entry.attribute("jpegPhoto").unwrap()), vec![[0xCAu8, 0xFE].as_slice()]);

        let small = RecordDecoder::new(Arc::new(CaseIgnoreStringMatchingRule), 1);
        let err = small
            .decode(&unparsed(
                &format!("dn: cn=a\njpegPhoto:< file://{path}\n"),
                DuplicateValueBehavior::Strip,
                TrailingSpaceBehavior::Reject,
            ))
            .unwrap_err();
        assert!(err.message().contains("limit"));

        let err = decode("dn: cn=a\nphoto:< http://example.com/x.jpg\n").unwrap_err();
        assert!(err.message().contains("only file: URLs"));
    }

    #[test]
    fn test_modify_record() {
        let record = decode("dn: cn=a\nchangetype: modify\nreplace: description\ndescription: x\n").unwrap();
        assert_eq!(
            record,
            LdifRecord::Modify(ModifyRecord {
                dn: "cn=a".to_string(),
                modifications: vec![Modification::new(
                    ModificationType::Replace,
                    Attribute::from_strings("description", ["x"]),
                )],
                controls: vec![],
            })
        );
    }

    #[test]
    fn test_modify_with_several_blocks() {
        let record = decode(
            "dn: cn=a\nchangetype: modify\nadd: mail\nmail: a@b\nmail: c@d\n-\ndelete: phone\n-\nincrement: uidNumber\nuidNumber: 1\n-\n",
        )
        .unwrap();
        let LdifRecord::Modify(modify) = record else { panic!() };
        let kinds: Vec<_> = modify.modifications.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![ModificationType::Add, ModificationType::Delete, ModificationType::Increment]
        );
        assert_eq!(modify.modifications[0].attribute.values.len(), 2);
        assert!(modify.modifications[1].attribute.values.is_empty());
    }

    #[test]
    fn test_modify_structure_errors() {
        assert!(decode("dn: cn=a\nchangetype: modify\n").is_err());
        assert!(decode("dn: cn=a\nchangetype: modify\nadd: mail\n").is_err());
        assert!(decode("dn: cn=a\nchangetype: modify\nincrement: n\nn: 1\nn: 2\n").is_err());
        assert!(decode("dn: cn=a\nchangetype: modify\nreplace: mail\ncn: x\n").is_err());
        assert!(decode("dn: cn=a\nchangetype: modify\nrename: mail\n").is_err());
    }

    #[test]
    fn test_add_and_delete_records() {
        let LdifRecord::Add(add) = decode("dn: cn=a\nchangetype: add\ncn: a\n").unwrap() else {
            panic!()
        };
        assert_eq!(add.attributes.len(), 1);
        assert!(decode("dn: cn=a\nchangetype: add\n").is_err());

        assert!(matches!(
            decode("dn: cn=a\nchangetype: delete\n").unwrap(),
            LdifRecord::Delete(_)
        ));
        assert!(decode("dn: cn=a\nchangetype: delete\ncn: a\n").is_err());
        assert!(decode("dn: cn=a\nchangetype: rename\n").is_err());
    }

    #[test]
    fn test_moddn_record() {
        let record = decode(
            "dn: cn=a,dc=x\nchangetype: modrdn\nnewrdn: cn=b\ndeleteoldrdn: yes\nnewsuperior: dc=y\n",
        )
        .unwrap();
        assert_eq!(
            record,
            LdifRecord::ModifyDn(ModifyDnRecord {
                dn: "cn=a,dc=x".to_string(),
                new_rdn: "cn=b".to_string(),
                delete_old_rdn: true,
                new_superior: Some("dc=y".to_string()),
                controls: vec![],
            })
        );

        let LdifRecord::ModifyDn(moddn) =
            decode("dn: cn=a\nchangetype: moddn\nnewrdn: cn=b\ndeleteoldrdn: 0\n").unwrap()
        else {
            panic!()
        };
        assert!(!moddn.delete_old_rdn);
        assert_eq!(moddn.new_superior, None);
    }

    #[test]
    fn test_moddn_errors() {
        assert!(decode("dn: cn=a\nchangetype: moddn\n").is_err());
        assert!(decode("dn: cn=a\nchangetype: moddn\nnewrdn: cn=b\n").is_err());
        assert!(decode("dn: cn=a\nchangetype: moddn\nnewrdn: cn=b\ndeleteoldrdn: maybe\n").is_err());
        assert!(decode(
            "dn: cn=a\nchangetype: moddn\nnewrdn: cn=b\ndeleteoldrdn: 1\nnewsuperior: dc=y\nextra: z\n"
        )
        .is_err());
    }

    #[test]
    fn test_delete_old_rdn_tokens() {
        for token in ["1", "true", "TRUE", "yes"] {
            assert_eq!(parse_delete_old_rdn(token), Some(true), "{token}");
        }
        for token in ["0", "false", "No"] {
            assert_eq!(parse_delete_old_rdn(token), Some(false), "{token}");
        }
        assert_eq!(parse_delete_old_rdn("2"), None);
    }

    #[test]
    fn test_controls() {
        let record = decode(
            "dn: cn=a\ncontrol: 1.2.840.113556.1.4.805 true\ncontrol: 1.3.6.1.1.13.1: cn\ncontrol: 1.2.3 false:: AAE=\nchangetype: delete\n",
        )
        .unwrap();
        let controls = record.controls();
        assert_eq!(controls.len(), 3);
        assert!(controls[0].critical);
        assert_eq!(controls[0].value, None);
        assert!(!controls[1].critical);
        assert_eq!(controls[1].value.as_deref(), Some(b"cn".as_slice()));
        assert_eq!(controls[2].value.as_deref(), Some([0x00u8, 0x01].as_slice()));

        assert!(decode("dn: cn=a\ncontrol: 1.2.3\ncn: a\n").is_err());
        assert!(decode("dn: cn=a\ncontrol: abc\nchangetype: delete\n").is_err());
        assert!(decode("dn: cn=a\ncontrol: 1.2.3 sometimes\nchangetype: delete\n").is_err());
    }
}
