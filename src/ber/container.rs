use bytes::Bytes;
use std::sync::OnceLock;

use super::element::BerElement;
use super::{tags, BerError, BerResult};

/// Split a container value into its child elements. A child that would
/// extend past the container fails with [`BerError::LengthExceedsAvailable`].
pub fn decode_children(value: &Bytes) -> BerResult<Vec<BerElement>> {
    let mut children = Vec::new();
    let mut pos = 0;
    while pos < value.len() {
        let (child, next) = BerElement::decode_at(value, pos)?;
        children.push(child);
        pos = next;
    }
    Ok(children)
}

fn encode_children(elements: &[BerElement]) -> Bytes {
    let size = elements.iter().map(BerElement::encoded_len).sum();
    let mut out = Vec::with_capacity(size);
    for element in elements {
        element.write_to(&mut out);
    }
    Bytes::from(out)
}

macro_rules! container_type {
    ($(#[$meta:meta])* $name:ident, $default_tag:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            tag: u8,
            elements: Vec<BerElement>,
            encoded_value: OnceLock<Bytes>,
        }

        impl $name {
            pub fn new(elements: Vec<BerElement>) -> Self {
                Self::with_tag($default_tag, elements)
            }

            pub fn with_tag(tag: u8, elements: Vec<BerElement>) -> Self {
                Self {
                    tag,
                    elements,
                    encoded_value: OnceLock::new(),
                }
            }

            /// Decode a container element; the encoded value is kept as the
            /// cached value so re-encoding is a copy of the input.
            pub fn decode(element: &BerElement) -> BerResult<Self> {
                let elements = decode_children(element.value())?;
                let encoded_value = OnceLock::new();
                let _ = encoded_value.set(element.value().clone());
                Ok(Self {
                    tag: element.tag(),
                    elements,
                    encoded_value,
                })
            }

            pub fn tag(&self) -> u8 {
                self.tag
            }

            pub fn elements(&self) -> &[BerElement] {
                &self.elements
            }

            pub fn into_elements(self) -> Vec<BerElement> {
                self.elements
            }

            /// Concatenated child encodings, computed on first use.
            pub fn value(&self) -> &Bytes {
                self.encoded_value
                    .get_or_init(|| encode_children(&self.elements))
            }

            pub fn to_element(&self) -> BerElement {
                BerElement::new(self.tag, self.value().clone())
            }

            pub fn encode(&self) -> Bytes {
                self.to_element().encode()
            }
        }

        impl From<$name> for BerElement {
            fn from(container: $name) -> Self {
                container.to_element()
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.tag == other.tag && self.elements == other.elements
            }
        }

        impl Eq for $name {}
    };
}

container_type!(
    /// An ordered list of elements.
    BerSequence,
    tags::SEQUENCE
);

container_type!(
    /// A list of elements whose order carries no meaning; the order given is
    /// still the order encoded.
    BerSet,
    tags::SET
);

/// Decode `element` as a sequence of exactly `N` children with any tags.
pub fn decode_exact<const N: usize>(element: &BerElement) -> BerResult<[BerElement; N]> {
    let children = element.decode_as_children()?;
    let count = children.len();
    children.try_into().map_err(|_| BerError::InvalidLength {
        kind: "sequence",
        expected: "a fixed number of elements",
        actual: count,
    })
}
