use std::borrow::Cow;
use std::fmt::Debug;

/// Decides when two values of an attribute are the same value.
///
/// Implementations must be cheap to share across parser workers.
pub trait MatchingRule: Debug + Send + Sync {
    /// Normalized form of `value` for comparisons. Values whose normalized
    /// forms are equal are duplicates.
    fn normalize<'a>(&self, attribute_name: &str, value: &'a [u8]) -> Cow<'a, [u8]>;

    fn values_match(&self, attribute_name: &str, a: &[u8], b: &[u8]) -> bool {
        self.normalize(attribute_name, a) == self.normalize(attribute_name, b)
    }
}

/// Byte-for-byte comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct OctetStringMatchingRule;

impl MatchingRule for OctetStringMatchingRule {
    fn normalize<'a>(&self, _attribute_name: &str, value: &'a [u8]) -> Cow<'a, [u8]> {
        Cow::Borrowed(value)
    }
}

/// Directory-string comparison: ASCII case folded, leading and trailing
/// spaces removed and inner runs of spaces collapsed. Non-UTF-8 values fall
/// back to byte comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseIgnoreStringMatchingRule;

impl MatchingRule for CaseIgnoreStringMatchingRule {
    fn normalize<'a>(&self, _attribute_name: &str, value: &'a [u8]) -> Cow<'a, [u8]> {
        let Ok(text) = std::str::from_utf8(value) else {
            return Cow::Borrowed(value);
        };

        let mut normalized = String::with_capacity(text.len());
        for word in text.split(' ').filter(|w| !w.is_empty()) {
            if !normalized.is_empty() {
                normalized.push(' ');
            }
            normalized.extend(word.chars().map(|c| c.to_ascii_lowercase()));
        }

        if normalized.as_bytes() == value {
            Cow::Borrowed(value)
        } else {
            Cow::Owned(normalized.into_bytes())
        }
    }
}
