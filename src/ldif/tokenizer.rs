use serde::Deserialize;

use super::error::LdifError;

/// What to do with an attribute value that duplicates one already present
/// under the configured matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateValueBehavior {
    #[default]
    Strip,
    Retain,
    Reject,
}

/// What to do with a line that ends in a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSpaceBehavior {
    Strip,
    Retain,
    #[default]
    Reject,
}

/// The lines of one record, not yet interpreted.
///
/// Also used as the end-of-input marker and to carry a read failure through
/// the parallel pipeline. Never modified once handed to a decoder.
#[derive(Debug)]
pub struct UnparsedLdifRecord {
    lines: Vec<String>,
    first_line_number: u64,
    duplicate_value_behavior: DuplicateValueBehavior,
    trailing_space_behavior: TrailingSpaceBehavior,
    end_of_input: bool,
    failure: Option<crate::LdifBerError>,
    invalid_utf8_line: Option<u64>,
}

impl UnparsedLdifRecord {
    pub fn new(
        lines: Vec<String>,
        first_line_number: u64,
        duplicate_value_behavior: DuplicateValueBehavior,
        trailing_space_behavior: TrailingSpaceBehavior,
    ) -> Self {
        Self {
            lines,
            first_line_number,
            duplicate_value_behavior,
            trailing_space_behavior,
            end_of_input: false,
            failure: None,
            invalid_utf8_line: None,
        }
    }

    pub fn end_of_input() -> Self {
        Self {
            lines: Vec::new(),
            first_line_number: 0,
            duplicate_value_behavior: DuplicateValueBehavior::default(),
            trailing_space_behavior: TrailingSpaceBehavior::default(),
            end_of_input: true,
            failure: None,
            invalid_utf8_line: None,
        }
    }

    /// Marker for input that could not be read further.
    pub fn failed(failure: crate::LdifBerError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::end_of_input()
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn first_line_number(&self) -> u64 {
        self.first_line_number
    }

    pub fn duplicate_value_behavior(&self) -> DuplicateValueBehavior {
        self.duplicate_value_behavior
    }

    pub fn trailing_space_behavior(&self) -> TrailingSpaceBehavior {
        self.trailing_space_behavior
    }

    pub fn is_end_of_input(&self) -> bool {
        self.end_of_input
    }

    pub fn failure(&self) -> Option<&crate::LdifBerError> {
        self.failure.as_ref()
    }

    pub fn take_failure(&mut self) -> Option<crate::LdifBerError> {
        self.failure.take()
    }

    /// Line number of the first data line that was not valid UTF-8.
    pub fn invalid_utf8_line(&self) -> Option<u64> {
        self.invalid_utf8_line
    }
}

/// Line-folding record accumulator. Owned by a single reader.
#[derive(Debug)]
pub struct LdifTokenizer {
    duplicate_value_behavior: DuplicateValueBehavior,
    trailing_space_behavior: TrailingSpaceBehavior,
    line_number: u64,
    lines: Vec<String>,
    first_line_number: u64,
    last_was_comment: bool,
    first_record: bool,
    invalid_utf8_line: Option<u64>,
}

impl LdifTokenizer {
    pub fn new(
        duplicate_value_behavior: DuplicateValueBehavior,
        trailing_space_behavior: TrailingSpaceBehavior,
    ) -> Self {
        Self {
            duplicate_value_behavior,
            trailing_space_behavior,
            line_number: 0,
            lines: Vec::new(),
            first_line_number: 0,
            last_was_comment: false,
            first_record: true,
            invalid_utf8_line: None,
        }
    }

    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Feed the next line of input (without its line terminator).
    pub fn push_line(&mut self, line: &str) -> Result<Option<UnparsedLdifRecord>, LdifError> {
        self.line_number += 1;
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            self.last_was_comment = false;
            return Ok(self.take_record());
        }

        if let Some(continuation) = line.strip_prefix(' ') {
            if self.last_was_comment {
                // A folded comment stays a comment.
                return Ok(None);
            }
            let Some(previous) = self.lines.last_mut() else {
                return Err(LdifError::new(
                    format!(
                        "line {} starts with a space but there is no line to continue",
                        self.line_number
                    ),
                    self.line_number,
                    false,
                )
                .with_data_lines(&[line.to_string()]));
            };
            previous.push_str(continuation);
            return Ok(None);
        }

        if line.starts_with('#') {
            self.last_was_comment = true;
            return Ok(None);
        }
        self.last_was_comment = false;

        if self.lines.is_empty() {
            if self.first_record && is_version_line(line) {
                self.first_record = false;
                return Ok(None);
            }
            self.first_line_number = self.line_number;
        }
        self.lines.push(line.to_string());
        Ok(None)
    }

    /// Like [`push_line`](Self::push_line) for raw bytes. A data line that is
    /// not valid UTF-8 marks its record so that only that record fails.
    pub fn push_bytes(&mut self, line: &[u8]) -> Result<Option<UnparsedLdifRecord>, LdifError> {
        let text = match std::str::from_utf8(line) {
            Ok(text) => return self.push_line(text),
            Err(_) => String::from_utf8_lossy(line),
        };
        let pushed = self.push_line(&text)?;
        if !self.last_was_comment && !self.lines.is_empty() && self.invalid_utf8_line.is_none() {
            self.invalid_utf8_line = Some(self.line_number);
        }
        Ok(pushed)
    }

    /// Flush the record in progress at end of input.
    pub fn finish(&mut self) -> Option<UnparsedLdifRecord> {
        self.last_was_comment = false;
        self.take_record()
    }

    fn take_record(&mut self) -> Option<UnparsedLdifRecord> {
        if self.lines.is_empty() {
            return None;
        }
        self.first_record = false;
        let mut record = UnparsedLdifRecord::new(
            std::mem::take(&mut self.lines),
            self.first_line_number,
            self.duplicate_value_behavior,
            self.trailing_space_behavior,
        );
        record.invalid_utf8_line = self.invalid_utf8_line.take();
        Some(record)
    }
}

fn is_version_line(line: &str) -> bool {
    line.get(..8)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("version:"))
}
