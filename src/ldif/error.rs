use std::fmt;

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A problem with LDIF input.
///
/// `may_continue_reading` tells the caller whether the reader can skip to the
/// next record (`true`) or whether the rest of the input is unreliable.
#[derive(thiserror::Error, Debug)]
pub struct LdifError {
    message: String,
    line_number: Option<u64>,
    data_lines: Vec<String>,
    may_continue_reading: bool,
    #[source]
    cause: Option<Cause>,
}

impl fmt::Display for LdifError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line_number {
            Some(line) => write!(f, "{} (record starting at line {})", self.message, line),
            None => f.write_str(&self.message),
        }
    }
}

impl LdifError {
    pub fn new(message: impl Into<String>, line_number: u64, may_continue_reading: bool) -> Self {
        Self {
            message: message.into(),
            line_number: Some(line_number),
            data_lines: Vec::new(),
            may_continue_reading,
            cause: None,
        }
    }

    /// An error that is not tied to a position in the input.
    pub fn detached(message: impl Into<String>, may_continue_reading: bool) -> Self {
        Self {
            message: message.into(),
            line_number: None,
            data_lines: Vec::new(),
            may_continue_reading,
            cause: None,
        }
    }

    pub fn with_data_lines(mut self, lines: &[String]) -> Self {
        self.data_lines = lines.to_vec();
        self
    }

    pub fn with_cause(mut self, cause: impl Into<Cause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn line_number(&self) -> Option<u64> {
        self.line_number
    }

    /// The raw lines of the offending record, when known.
    pub fn data_lines(&self) -> &[String] {
        &self.data_lines
    }

    pub fn may_continue_reading(&self) -> bool {
        self.may_continue_reading
    }
}
