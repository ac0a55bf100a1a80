use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::io::{self, Write};

use super::record::LdifRecord;

pub const DEFAULT_WRAP_COLUMN: usize = 76;

/// Whether `value` has to be written as `name:: base64`.
pub fn needs_base64(value: &[u8]) -> bool {
    let (Some(&first), Some(&last)) = (value.first(), value.last()) else {
        return false;
    };
    if matches!(first, b' ' | b':' | b'<') || last == b' ' {
        return true;
    }
    value
        .iter()
        .any(|&b| b >= 0x80 || matches!(b, b'\0' | b'\n' | b'\r'))
}

/// `name: value` or `name:: base64(value)`, unfolded.
pub fn encode_name_value(name: &str, value: &[u8]) -> String {
    if value.is_empty() {
        return format!("{name}: ");
    }
    if needs_base64(value) {
        return format!("{}:: {}", name, BASE64.encode(value));
    }
    // Plain values contain only ASCII bytes.
    format!("{}: {}", name, String::from_utf8_lossy(value))
}

/// Fold `line` into segments no longer than `wrap_column` bytes. The first
/// segment holds `wrap_column` bytes, every later one a space followed by
/// `wrap_column - 1` bytes. A column of 0 disables folding. A column of 1
/// leaves no room after the space, so continuations then carry one byte each
/// and run one byte past the column.
pub fn wrap_line(line: &str, wrap_column: usize) -> Vec<String> {
    if wrap_column == 0 || line.len() <= wrap_column {
        return vec![line.to_string()];
    }

    let mut segments = Vec::with_capacity(line.len() / wrap_column + 2);
    let (first, mut rest) = line.split_at(char_boundary(line, wrap_column));
    segments.push(first.to_string());

    let chunk = wrap_column.saturating_sub(1).max(1);
    while !rest.is_empty() {
        let split = char_boundary(rest, chunk.min(rest.len()));
        let (segment, remaining) = rest.split_at(split);
        segments.push(format!(" {segment}"));
        rest = remaining;
    }
    segments
}

// Largest char boundary not above `at`, or the next one when that would be 0.
fn char_boundary(s: &str, at: usize) -> usize {
    let mut index = at;
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    if index == 0 {
        index = at;
        while !s.is_char_boundary(index) {
            index += 1;
        }
    }
    index
}

pub(crate) fn push_name_value(lines: &mut Vec<String>, name: &str, value: &[u8], wrap_column: usize) {
    lines.extend(wrap_line(&encode_name_value(name, value), wrap_column));
}

/// Writes records to a byte sink, separated by blank lines.
#[derive(Debug)]
pub struct LdifWriter<W: Write> {
    inner: W,
    wrap_column: usize,
    pending_separator: bool,
    records_written: u64,
}

impl<W: Write> LdifWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_wrap_column(inner, DEFAULT_WRAP_COLUMN)
    }

    pub fn with_wrap_column(inner: W, wrap_column: usize) -> Self {
        Self {
            inner,
            wrap_column,
            pending_separator: false,
            records_written: 0,
        }
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn write_version_header(&mut self) -> io::Result<()> {
        self.write_separator()?;
        self.inner.write_all(b"version: 1\n")?;
        self.pending_separator = true;
        Ok(())
    }

    /// Write `# comment`, folded like any other line. Embedded line breaks
    /// start a new comment line.
    pub fn write_comment(&mut self, comment: &str) -> io::Result<()> {
        self.write_separator()?;
        for text in comment.lines() {
            for segment in wrap_line(&format!("# {text}"), self.wrap_column) {
                writeln!(self.inner, "{segment}")?;
            }
        }
        Ok(())
    }

    pub fn write_record(&mut self, record: &LdifRecord) -> io::Result<()> {
        self.write_separator()?;
        for line in record.to_ldif_lines(self.wrap_column) {
            self.inner.write_all(line.as_bytes())?;
            self.inner.write_all(b"\n")?;
        }
        self.pending_separator = true;
        self.records_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn write_separator(&mut self) -> io::Result<()> {
        if self.pending_separator {
            self.inner.write_all(b"\n")?;
            self.pending_separator = false;
        }
        Ok(())
    }
}
