use std::io::BufRead;
use std::sync::Arc;
use tracing::{debug, warn};

use super::decode::{RecordDecoder, DEFAULT_MAX_URL_FILE_SIZE};
use super::error::LdifError;
use super::matching::{CaseIgnoreStringMatchingRule, MatchingRule};
use super::record::{AddRecord, Entry, LdifRecord};
use super::tokenizer::{DuplicateValueBehavior, LdifTokenizer, TrailingSpaceBehavior};
use crate::{LdifBerError, Result};

/// Default capacity of the parallel reader's submission queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 500;

/// Settings shared by the blocking and the parallel reader.
#[derive(Debug, Clone)]
pub struct LdifReaderOptions {
    pub duplicate_value_behavior: DuplicateValueBehavior,
    pub trailing_space_behavior: TrailingSpaceBehavior,
    pub matching_rule: Arc<dyn MatchingRule>,
    pub max_url_file_size: u64,
    /// Worker count for the parallel reader. Ignored by [`LdifReader`].
    pub parse_threads: usize,
    pub queue_capacity: usize,
}

impl Default for LdifReaderOptions {
    fn default() -> Self {
        Self {
            duplicate_value_behavior: DuplicateValueBehavior::default(),
            trailing_space_behavior: TrailingSpaceBehavior::default(),
            matching_rule: Arc::new(CaseIgnoreStringMatchingRule),
            max_url_file_size: DEFAULT_MAX_URL_FILE_SIZE,
            parse_threads: default_parse_threads(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl LdifReaderOptions {
    pub fn tokenizer(&self) -> LdifTokenizer {
        LdifTokenizer::new(self.duplicate_value_behavior, self.trailing_space_behavior)
    }

    pub fn record_decoder(&self) -> RecordDecoder {
        RecordDecoder::new(self.matching_rule.clone(), self.max_url_file_size)
    }
}

pub fn default_parse_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Reads records on the caller's thread.
///
/// A record that fails to decode is returned as an error and the next call
/// moves on to the following record. After an error with
/// `may_continue_reading == false`, or an I/O error, the reader is finished.
pub struct LdifReader<R> {
    inner: R,
    tokenizer: LdifTokenizer,
    decoder: RecordDecoder,
    line: Vec<u8>,
    finished: bool,
    records_read: u64,
}

impl<R: BufRead> LdifReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_options(inner, &LdifReaderOptions::default())
    }

    pub fn with_options(inner: R, options: &LdifReaderOptions) -> Self {
        Self {
            inner,
            tokenizer: options.tokenizer(),
            decoder: options.record_decoder(),
            line: Vec::new(),
            finished: false,
            records_read: 0,
        }
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    pub fn read_record(&mut self) -> Result<Option<LdifRecord>> {
        let Some(unparsed) = self.next_unparsed()? else {
            return Ok(None);
        };
        self.records_read += 1;

        match self.decoder.decode(&unparsed) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                debug!("Failed to decode record at line {}: {}", unparsed.first_line_number(), e);
                if !e.may_continue_reading() {
                    self.finished = true;
                }
                Err(e.into())
            }
        }
    }

    pub fn read_entry(&mut self) -> Result<Option<Entry>> {
        match self.read_record()? {
            None => Ok(None),
            Some(LdifRecord::Entry(entry)) => Ok(Some(entry)),
            Some(other) => Err(LdifError::detached(
                format!("expected an entry but found a change record for '{}'", other.dn()),
                true,
            )
            .into()),
        }
    }

    /// Next record, which must be a change record. With `default_add`, a
    /// plain entry is read as an add.
    pub fn read_change_record(&mut self, default_add: bool) -> Result<Option<LdifRecord>> {
        match self.read_record()? {
            Some(LdifRecord::Entry(entry)) if default_add => Ok(Some(LdifRecord::Add(AddRecord {
                dn: entry.dn,
                attributes: entry.attributes,
                controls: Vec::new(),
            }))),
            Some(LdifRecord::Entry(entry)) => Err(LdifError::detached(
                format!("expected a change record but found an entry for '{}'", entry.dn),
                true,
            )
            .into()),
            other => Ok(other),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn next_unparsed(&mut self) -> Result<Option<super::tokenizer::UnparsedLdifRecord>> {
        while !self.finished {
            self.line.clear();
            let read = match self.inner.read_until(b'\n', &mut self.line) {
                Ok(read) => read,
                Err(e) => {
                    warn!("Error reading LDIF input: {}", e);
                    self.finished = true;
                    return Err(LdifBerError::Io(e));
                }
            };

            if read == 0 {
                self.finished = true;
                return Ok(self.tokenizer.finish());
            }

            let line = self.line.strip_suffix(b"\n").unwrap_or(&self.line[..]);
            match self.tokenizer.push_bytes(line) {
                Ok(Some(record)) => return Ok(Some(record)),
                Ok(None) => {}
                Err(e) => {
                    self.finished = true;
                    return Err(e.into());
                }
            }
        }
        Ok(None)
    }
}

impl<R: BufRead> Iterator for LdifReader<R> {
    type Item = Result<LdifRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "version: 1\n\
dn: dc=example,dc=com\n\
objectClass: top\n\
objectClass: domain\n\
dc: example\n\
\n\
# a person\n\
dn: cn=alice,dc=example,dc=com\n\
cn: alice\n\
description: a long\n  folded value\n\
\n\
dn: cn=bob,dc=example,dc=com\n\
changetype: delete\n";

    #[test]
    fn test_reads_records_in_order() {
        let records: Vec<_> = LdifReader::new(SAMPLE.as_bytes())
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].dn(), "dc=example,dc=com");
        assert_eq!(records[1].dn(), "cn=alice,dc=example,dc=com");
        assert!(records[2].is_change_record());

        let LdifRecord::Entry(alice) = &records[1] else { panic!() };
        assert_eq!(
            alice.attribute("description").unwrap().string_values(),
            vec!["a long folded value"]
        );
    }

    #[test]
    fn test_recoverable_error_then_next_record() {
        let input = "dn: cn=a\nattr:: ###\n\ndn: cn=b\ncn: b\n";
        let mut reader = LdifReader::new(input.as_bytes());

        match reader.read_record() {
            Err(LdifBerError::Ldif(e)) => {
                assert!(e.may_continue_reading());
                assert_eq!(e.line_number(), Some(1));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(reader.read_record().unwrap().unwrap().dn(), "cn=b");
        assert!(reader.read_record().unwrap().is_none());
        assert_eq!(reader.records_read(), 2);
    }

    #[test]
    fn test_fatal_error_stops_reading() {
        let mut reader = LdifReader::new(" dn: cn=a\n\ndn: cn=b\n".as_bytes());
        match reader.read_record() {
            Err(LdifBerError::Ldif(e)) => assert!(!e.may_continue_reading()),
            other => panic!("unexpected {:?}", other),
        }
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_read_entry_and_change_record() {
        let mut reader = LdifReader::new("dn: cn=a\ncn: a\n\ndn: cn=b\nchangetype: delete\n".as_bytes());
        assert_eq!(reader.read_entry().unwrap().unwrap().dn, "cn=a");
        assert!(reader.read_entry().is_err());

        let mut reader = LdifReader::new("dn: cn=a\ncn: a\n".as_bytes());
        let record = reader.read_change_record(true).unwrap().unwrap();
        assert!(matches!(record, LdifRecord::Add(_)));

        let mut reader = LdifReader::new("dn: cn=a\ncn: a\n".as_bytes());
        assert!(reader.read_change_record(false).is_err());
    }

    #[test]
    fn test_options_reach_the_decoder() {
        let options = LdifReaderOptions {
            duplicate_value_behavior: DuplicateValueBehavior::Reject,
            ..LdifReaderOptions::default()
        };
        let mut reader = LdifReader::with_options("dn: cn=a\ncn: a\ncn: A\n".as_bytes(), &options);
        assert!(reader.read_record().is_err());
    }

    #[test]
    fn test_empty_input() {
        let mut reader = LdifReader::new("\n\n# only a comment\n".as_bytes());
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_invalid_utf8_fails_only_its_record() {
        let input: &[u8] = b"dn: cn=a\ncn: caf\xe9\n\ndn: cn=b\ncn: b\n";
        let mut reader = LdifReader::new(input);

        match reader.read_record() {
            Err(LdifBerError::Ldif(e)) => {
                assert!(e.may_continue_reading());
                assert!(e.message().contains("line 2 is not valid UTF-8"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(reader.read_record().unwrap().unwrap().dn(), "cn=b");
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_io_error_is_terminal() {
        struct Failing;
        impl std::io::Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk gone"))
            }
        }

        let mut reader = LdifReader::new(std::io::BufReader::new(Failing));
        assert!(matches!(reader.read_record(), Err(LdifBerError::Io(_))));
        assert!(reader.read_record().unwrap().is_none());
    }
}
