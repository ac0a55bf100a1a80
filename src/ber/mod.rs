pub mod buffer;
pub mod codec;
pub mod container;
pub mod element;
pub mod length;
pub mod scalar;
pub mod stream;

pub use buffer::{BerBuffer, ContainerHandle};
pub use codec::BerElementCodec;
pub use container::{BerSequence, BerSet};
pub use element::BerElement;
pub use length::{decode_length, encode_length, MAX_LENGTH};
pub use stream::{BerStreamReader, StreamContainer};

/// Universal tag numbers used by this codec.
pub mod tags {
    pub const BOOLEAN: u8 = 0x01;
    pub const INTEGER: u8 = 0x02;
    pub const OCTET_STRING: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const ENUMERATED: u8 = 0x0A;
    pub const SEQUENCE: u8 = 0x30;
    pub const SET: u8 = 0x31;

    /// Bit set on tags whose value is a list of child elements.
    pub const CONSTRUCTED: u8 = 0x20;
    /// Class bits of a tag byte.
    pub const CLASS_MASK: u8 = 0xC0;
}

/// Maximum container nesting depth accepted by the decoders.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(thiserror::Error, Debug)]
pub enum BerError {
    #[error("length uses {octets} length bytes, at most 4 are supported")]
    LengthTooLong { octets: usize },

    #[error("indefinite length encoding is not supported")]
    IndefiniteLength,

    #[error("declared length {length} exceeds the maximum of {max}")]
    LengthTooLarge { length: usize, max: usize },

    #[error("truncated element: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("declared length {declared} exceeds the {available} bytes available in the enclosing element")]
    LengthExceedsAvailable { declared: usize, available: usize },

    #[error("{extra} unexpected bytes after the end of the element")]
    TrailingData { extra: usize },

    #[error("invalid {kind} value length {actual} (expected {expected})")]
    InvalidLength {
        kind: &'static str,
        expected: &'static str,
        actual: usize,
    },

    #[error("read past the end of a container: expected end at offset {expected_end}, now at {position}")]
    ReadPastEnd { expected_end: u64, position: u64 },

    #[error("containers nested deeper than {max} levels")]
    NestingTooDeep { max: usize },

    #[error("element of {length} bytes exceeds the configured maximum of {max}")]
    ElementTooLarge { length: usize, max: usize },

    #[error("unexpected tag 0x{actual:02x} (expected 0x{expected:02x})")]
    UnexpectedTag { expected: u8, actual: u8 },

    #[error("octet string value is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("I/O error while reading BER data: {0}")]
    Io(#[from] std::io::Error),
}

pub type BerResult<T> = std::result::Result<T, BerError>;
