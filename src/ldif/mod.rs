pub mod decode;
pub mod error;
pub mod matching;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod tokenizer;
pub mod writer;

pub use decode::{RecordDecoder, DEFAULT_MAX_URL_FILE_SIZE};
pub use error::LdifError;
pub use matching::{CaseIgnoreStringMatchingRule, MatchingRule, OctetStringMatchingRule};
pub use pipeline::{ParallelLdifReader, RecordTranslator, TranslateResult};
pub use reader::{LdifReader, LdifReaderOptions, DEFAULT_QUEUE_CAPACITY};
pub use record::{
    AddRecord, Attribute, DeleteRecord, Entry, LdifControl, LdifRecord, Modification,
    ModificationType, ModifyDnRecord, ModifyRecord,
};
pub use tokenizer::{DuplicateValueBehavior, LdifTokenizer, TrailingSpaceBehavior, UnparsedLdifRecord};
pub use writer::{encode_name_value, needs_base64, wrap_line, LdifWriter, DEFAULT_WRAP_COLUMN};
