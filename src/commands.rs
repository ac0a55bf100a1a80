use futures::SinkExt;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedWrite;
use tracing::{error, info};

use crate::ber::{tags, BerElement, BerError, BerStreamReader, StreamContainer};
use crate::config::{Command, Config};
use crate::ldap::{LdapMessage, LdapMessageCodec};
use crate::ldif::{LdifReaderOptions, LdifRecord, LdifWriter, ParallelLdifReader};
use crate::Result;

/// Counts reported when a command finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub records: u64,
    pub errors: u64,
}

pub async fn run(config: &Config) -> Result<Summary> {
    match &config.command {
        Command::Validate { file } => validate(file, &config.reader).await,
        Command::Reformat { file, output } => {
            reformat(file, output.as_deref(), &config.reader, config.wrap_column).await
        }
        Command::ToBer { file, output } => to_ber(file, output.as_deref(), &config.reader).await,
        Command::DumpBer { file } => {
            let input = BufReader::new(std::fs::File::open(file)?);
            let stdout = io::stdout();
            let mut out = stdout.lock();
            dump_ber(input, &mut out)
        }
    }
}

async fn open_ldif(path: &Path, options: &LdifReaderOptions) -> Result<ParallelLdifReader> {
    let file = tokio::fs::File::open(path).await?;
    info!("Reading LDIF from {}", path.display());
    Ok(ParallelLdifReader::spawn(
        tokio::io::BufReader::new(file),
        options.clone(),
    ))
}

// Next good record; failed records are logged and counted.
async fn next_record(reader: &mut ParallelLdifReader, summary: &mut Summary) -> Option<LdifRecord> {
    loop {
        match reader.read_record().await {
            Ok(Some(record)) => {
                summary.records += 1;
                return Some(record);
            }
            Ok(None) => return None,
            Err(e) => {
                summary.errors += 1;
                error!("{}", e);
            }
        }
    }
}

pub async fn validate(path: &Path, options: &LdifReaderOptions) -> Result<Summary> {
    let mut reader = open_ldif(path, options).await?;
    let mut summary = Summary::default();
    while next_record(&mut reader, &mut summary).await.is_some() {}

    info!(
        "Validated {}: {} records, {} errors",
        path.display(),
        summary.records,
        summary.errors
    );
    Ok(summary)
}

pub async fn reformat(
    path: &Path,
    output: Option<&Path>,
    options: &LdifReaderOptions,
    wrap_column: usize,
) -> Result<Summary> {
    let mut reader = open_ldif(path, options).await?;
    let mut sink: Box<dyn AsyncWrite + Unpin + Send> = match output {
        Some(output) => Box::new(tokio::io::BufWriter::new(
            tokio::fs::File::create(output).await?,
        )),
        None => Box::new(tokio::io::stdout()),
    };
    // Each record is formatted in memory, then copied to the sink.
    let mut writer = LdifWriter::with_wrap_column(Vec::new(), wrap_column);
    writer.write_version_header()?;

    let mut summary = Summary::default();
    while let Some(record) = next_record(&mut reader, &mut summary).await {
        writer.write_record(&record)?;
        sink.write_all(&std::mem::take(writer.get_mut())).await?;
    }
    sink.write_all(&std::mem::take(writer.get_mut())).await?;
    sink.shutdown().await?;

    info!("Wrote {} records", writer.records_written());
    Ok(summary)
}

pub async fn to_ber(path: &Path, output: Option<&Path>, options: &LdifReaderOptions) -> Result<Summary> {
    let mut reader = open_ldif(path, options).await?;
    let sink: Box<dyn AsyncWrite + Unpin + Send> = match output {
        Some(output) => Box::new(tokio::fs::File::create(output).await?),
        None => Box::new(tokio::io::stdout()),
    };
    let mut framed = FramedWrite::new(sink, LdapMessageCodec::new());

    let mut summary = Summary::default();
    let mut message_id = 0i32;
    while let Some(record) = next_record(&mut reader, &mut summary).await {
        message_id = message_id.checked_add(1).ok_or_else(|| {
            crate::LdifBerError::Protocol("message ID space exhausted".to_string())
        })?;
        framed.send(LdapMessage::from_record(message_id, record)).await?;
    }
    framed.into_inner().shutdown().await?;

    info!("Encoded {} LDAP messages", message_id);
    Ok(summary)
}

/// Print the element tree of every top-level element in `input`.
pub fn dump_ber<R: Read, W: Write>(input: R, out: &mut W) -> Result<Summary> {
    let mut reader = BerStreamReader::new(input);
    let mut summary = Summary::default();
    dump_elements(&mut reader, out, None, 0, &mut summary)?;
    out.flush()?;
    Ok(summary)
}

fn dump_elements<R: Read, W: Write>(
    reader: &mut BerStreamReader<R>,
    out: &mut W,
    container: Option<&StreamContainer>,
    depth: usize,
    summary: &mut Summary,
) -> Result<()> {
    let indent = "  ".repeat(depth);
    loop {
        let more = match container {
            Some(container) => reader.has_more_elements(container)?,
            None => reader.peek()?.is_some(),
        };
        if !more {
            return Ok(());
        }

        let tag = reader.peek()?.ok_or(BerError::Truncated {
            needed: 1,
            available: 0,
        })?;
        summary.records += 1;

        if tag & tags::CONSTRUCTED != 0 {
            let child = reader.begin_sequence()?;
            writeln!(out, "{}{} ({} bytes)", indent, describe_tag(tag), child.length())?;
            dump_elements(reader, out, Some(&child), depth + 1, summary)?;
        } else if let Some(element) = reader.read_element()? {
            writeln!(out, "{}{} {}", indent, describe_tag(tag), describe_value(&element))?;
        }
    }
}

fn describe_tag(tag: u8) -> String {
    let name = match tag {
        tags::BOOLEAN => "BOOLEAN".to_string(),
        tags::INTEGER => "INTEGER".to_string(),
        tags::OCTET_STRING => "OCTET STRING".to_string(),
        tags::NULL => "NULL".to_string(),
        tags::ENUMERATED => "ENUMERATED".to_string(),
        tags::SEQUENCE => "SEQUENCE".to_string(),
        tags::SET => "SET".to_string(),
        _ => {
            let number = tag & 0x1F;
            match tag & tags::CLASS_MASK {
                0x40 => format!("[APPLICATION {number}]"),
                0x80 => format!("[{number}]"),
                0xC0 => format!("[PRIVATE {number}]"),
                _ => format!("[UNIVERSAL {number}]"),
            }
        }
    };
    format!("0x{tag:02x} {name}")
}

fn describe_value(element: &BerElement) -> String {
    match element.tag() {
        tags::BOOLEAN => element
            .decode_as_boolean()
            .map(|b| b.to_string())
            .unwrap_or_else(|_| hex(element.value())),
        tags::INTEGER | tags::ENUMERATED => element
            .decode_as_long()
            .map(|n| n.to_string())
            .unwrap_or_else(|_| hex(element.value())),
        tags::NULL => String::new(),
        _ => match std::str::from_utf8(element.value()) {
            Ok(text) if !text.chars().any(char::is_control) => format!("{text:?}"),
            _ => hex(element.value()),
        },
    }
}

fn hex(bytes: &[u8]) -> String {
    const PREVIEW: usize = 32;
    let mut out: String = bytes
        .iter()
        .take(PREVIEW)
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ");
    if bytes.len() > PREVIEW {
        out.push_str(&format!(" ... ({} bytes)", bytes.len()));
    }
    out
}
