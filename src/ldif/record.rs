use bytes::Bytes;
use std::fmt;

use super::writer::{push_name_value, wrap_line};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<Bytes>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, values: Vec<Bytes>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn from_strings<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            name,
            values
                .into_iter()
                .map(|v| Bytes::copy_from_slice(v.as_ref().as_bytes()))
                .collect(),
        )
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Values that are valid UTF-8, lossily converted otherwise.
    pub fn string_values(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub dn: String,
    pub attributes: Vec<Attribute>,
}

impl Entry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Case-insensitive attribute lookup.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.has_name(name))
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModificationType {
    Add = 0,
    Delete = 1,
    Replace = 2,
    Increment = 3,
}

impl ModificationType {
    pub fn keyword(self) -> &'static str {
        match self {
            ModificationType::Add => "add",
            ModificationType::Delete => "delete",
            ModificationType::Replace => "replace",
            ModificationType::Increment => "increment",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        [
            ModificationType::Add,
            ModificationType::Delete,
            ModificationType::Replace,
            ModificationType::Increment,
        ]
        .into_iter()
        .find(|t| t.keyword().eq_ignore_ascii_case(keyword))
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ModificationType::Add),
            1 => Some(ModificationType::Delete),
            2 => Some(ModificationType::Replace),
            3 => Some(ModificationType::Increment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub kind: ModificationType,
    pub attribute: Attribute,
}

impl Modification {
    pub fn new(kind: ModificationType, attribute: Attribute) -> Self {
        Self { kind, attribute }
    }
}

/// A request control attached to a change record with a `control:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdifControl {
    pub oid: String,
    pub critical: bool,
    pub value: Option<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRecord {
    pub dn: String,
    pub attributes: Vec<Attribute>,
    pub controls: Vec<LdifControl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRecord {
    pub dn: String,
    pub controls: Vec<LdifControl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyRecord {
    pub dn: String,
    pub modifications: Vec<Modification>,
    pub controls: Vec<LdifControl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyDnRecord {
    pub dn: String,
    pub new_rdn: String,
    pub delete_old_rdn: bool,
    pub new_superior: Option<String>,
    pub controls: Vec<LdifControl>,
}

/// One decoded LDIF record: a full entry or a change record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LdifRecord {
    Entry(Entry),
    Add(AddRecord),
    Delete(DeleteRecord),
    Modify(ModifyRecord),
    ModifyDn(ModifyDnRecord),
}

impl LdifRecord {
    pub fn dn(&self) -> &str {
        match self {
            LdifRecord::Entry(e) => &e.dn,
            LdifRecord::Add(r) => &r.dn,
            LdifRecord::Delete(r) => &r.dn,
            LdifRecord::Modify(r) => &r.dn,
            LdifRecord::ModifyDn(r) => &r.dn,
        }
    }

    pub fn is_change_record(&self) -> bool {
        !matches!(self, LdifRecord::Entry(_))
    }

    pub fn controls(&self) -> &[LdifControl] {
        match self {
            LdifRecord::Entry(_) => &[],
            LdifRecord::Add(r) => &r.controls,
            LdifRecord::Delete(r) => &r.controls,
            LdifRecord::Modify(r) => &r.controls,
            LdifRecord::ModifyDn(r) => &r.controls,
        }
    }

    pub fn change_type(&self) -> Option<&'static str> {
        match self {
            LdifRecord::Entry(_) => None,
            LdifRecord::Add(_) => Some("add"),
            LdifRecord::Delete(_) => Some("delete"),
            LdifRecord::Modify(_) => Some("modify"),
            LdifRecord::ModifyDn(_) => Some("moddn"),
        }
    }

    /// Render as LDIF lines, folding lines longer than `wrap_column`
    /// (0 disables folding).
    pub fn to_ldif_lines(&self, wrap_column: usize) -> Vec<String> {
        let mut lines = Vec::new();
        push_name_value(&mut lines, "dn", self.dn().as_bytes(), wrap_column);

        for control in self.controls() {
            push_control(&mut lines, control, wrap_column);
        }
        if let Some(change_type) = self.change_type() {
            push_name_value(&mut lines, "changetype", change_type.as_bytes(), wrap_column);
        }

        match self {
            LdifRecord::Entry(Entry { attributes, .. })
            | LdifRecord::Add(AddRecord { attributes, .. }) => {
                for attribute in attributes {
                    for value in &attribute.values {
                        push_name_value(&mut lines, &attribute.name, value, wrap_column);
                    }
                }
            }
            LdifRecord::Delete(_) => {}
            LdifRecord::Modify(record) => {
                for (i, modification) in record.modifications.iter().enumerate() {
                    if i > 0 {
                        lines.push("-".to_string());
                    }
                    let attribute = &modification.attribute;
                    push_name_value(
                        &mut lines,
                        modification.kind.keyword(),
                        attribute.name.as_bytes(),
                        wrap_column,
                    );
                    for value in &attribute.values {
                        push_name_value(&mut lines, &attribute.name, value, wrap_column);
                    }
                }
            }
            LdifRecord::ModifyDn(record) => {
                push_name_value(&mut lines, "newrdn", record.new_rdn.as_bytes(), wrap_column);
                let delete_old = if record.delete_old_rdn { "1" } else { "0" };
                push_name_value(&mut lines, "deleteoldrdn", delete_old.as_bytes(), wrap_column);
                if let Some(new_superior) = &record.new_superior {
                    push_name_value(&mut lines, "newsuperior", new_superior.as_bytes(), wrap_column);
                }
            }
        }

        lines
    }

    pub fn to_ldif_string(&self, wrap_column: usize) -> String {
        let mut out = String::new();
        for line in self.to_ldif_lines(wrap_column) {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

fn push_control(lines: &mut Vec<String>, control: &LdifControl, wrap_column: usize) {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

    let mut line = format!("control: {}", control.oid);
    if control.critical {
        line.push_str(" true");
    }
    if let Some(value) = &control.value {
        if super::writer::needs_base64(value) {
            line.push_str(":: ");
            line.push_str(&BASE64.encode(value));
        } else {
            line.push_str(": ");
            // Plain values are ASCII by construction.
            line.push_str(&String::from_utf8_lossy(value));
        }
    }
    lines.extend(wrap_line(&line, wrap_column));
}

impl fmt::Display for LdifRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ldif_string(0))
    }
}

impl From<Entry> for LdifRecord {
    fn from(entry: Entry) -> Self {
        LdifRecord::Entry(entry)
    }
}
