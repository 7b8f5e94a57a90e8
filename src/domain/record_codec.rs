//! CSV encoding and decoding of single records, and offset scanning.
//!
//! Records are comma-delimited and quoted only when a field needs it. Offsets
//! are scanned with `\n` as the only terminator, so a record's span always
//! ends on its `\n`. A file written with `\r\n` line endings keeps them: the
//! `\r` is stripped when a record is decoded and added back when one is
//! encoded.

use csv::{ByteRecord, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use std::io::Read;

/// Line ending used when writing records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineEnding::Lf => b"\n",
            LineEnding::CrLf => b"\r\n",
        }
    }

    /// The ending of one raw record span.
    pub fn of(span: &[u8]) -> Self {
        if span.ends_with(b"\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    fn terminator(self) -> Terminator {
        match self {
            LineEnding::Lf => Terminator::Any(b'\n'),
            LineEnding::CrLf => Terminator::CRLF,
        }
    }
}

/// Field written for a record that would otherwise serialize as a blank line.
const EMPTY_FIELD: &[u8] = b"\"\"";

fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .has_headers(false)
        .flexible(true)
        .terminator(Terminator::Any(b'\n'));
    builder
}

/// Serializes one record, terminator included.
pub fn encode(record: &StringRecord, ending: LineEnding) -> Result<Vec<u8>, csv::Error> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(ending.terminator())
        .from_writer(Vec::new());
    wtr.write_record(record)?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;

    // A bare terminator reads back as a skipped blank line.
    if bytes.len() <= ending.as_bytes().len() {
        return Ok([EMPTY_FIELD, ending.as_bytes()].concat());
    }
    Ok(bytes)
}

/// Parses the first record found in `bytes`. Leading blank lines and a
/// trailing `\r\n` are skipped.
pub fn decode(bytes: &[u8]) -> Result<Option<StringRecord>, csv::Error> {
    let body = bytes.strip_suffix(b"\r\n").unwrap_or(bytes);
    let mut rdr = reader_builder().from_reader(body);
    let mut record = StringRecord::new();
    if rdr.read_record(&mut record)? {
        Ok(Some(record))
    } else {
        Ok(None)
    }
}

/// Renders a record as one line of CSV text, without the terminator.
pub fn to_line(record: &StringRecord) -> Result<String, csv::Error> {
    let mut bytes = encode(record, LineEnding::Lf)?;
    bytes.pop();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads every record of an arbitrary CSV source (LF or CRLF line endings).
pub fn read_all<R: Read>(reader: R) -> Result<Vec<StringRecord>, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    rdr.records().collect()
}

/// Parses one CSV line of text (no terminator needed) into a record.
pub fn parse_line(line: &str) -> Result<Option<StringRecord>, csv::Error> {
    decode(line.as_bytes())
}

/// Reads `reader` to the end, returning the end offset of every record.
///
/// Blank lines between records are folded into the following record's span;
/// [`tidy`] separates them out again.
pub fn scan_offsets<R: Read>(reader: R) -> Result<Vec<u64>, csv::Error> {
    let mut rdr = reader_builder().from_reader(reader);
    let mut record = ByteRecord::new();
    let mut offsets = Vec::new();
    while rdr.read_byte_record(&mut record)? {
        offsets.push(rdr.position().byte());
    }
    Ok(offsets)
}

/// A record file rewritten so every byte belongs to exactly one record.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Tidied {
    pub bytes: Vec<u8>,
    pub offsets: Vec<u64>,
    /// Line ending of the first terminated record.
    pub ending: LineEnding,
    /// Bytes of blank lines that were removed.
    pub dropped: u64,
    /// Whether the last record was missing its terminator.
    pub terminated_last: bool,
}

impl Tidied {
    pub fn changed(&self) -> bool {
        self.dropped > 0 || self.terminated_last
    }
}

/// Why a scanned file cannot be tidied.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TidyError {
    #[error("{0}")]
    Csv(String),
    #[error("last record at offset {0} never closes its quote")]
    OpenQuote(u64),
}

/// Drops blank lines from `bytes` and terminates an unterminated last record.
///
/// `offsets` must come from [`scan_offsets`] over the same bytes. A last
/// record that ends inside an open quote is rejected: terminating it would
/// only put the terminator inside the quoted field.
pub fn tidy(bytes: &[u8], offsets: &[u64]) -> Result<Tidied, TidyError> {
    let mut tidied = Tidied {
        bytes: Vec::with_capacity(bytes.len() + 2),
        ..Tidied::default()
    };
    let mut ending = None;
    let mut start = 0usize;
    let mut last_start = 0u64;

    for &end in offsets {
        let span = &bytes[start..end as usize];
        start = end as usize;
        let body = strip_blank_lines(span);
        tidied.dropped += (span.len() - body.len()) as u64;
        if body.iter().all(|&b| b == b'\r') {
            tidied.dropped += body.len() as u64;
            continue;
        }
        if body.ends_with(b"\n") {
            ending.get_or_insert(LineEnding::of(body));
        }
        last_start = tidied.bytes.len() as u64;
        tidied.bytes.extend_from_slice(body);
        tidied.offsets.push(tidied.bytes.len() as u64);
    }
    tidied.dropped += (bytes.len() - start) as u64;
    tidied.ending = ending.unwrap_or_default();

    if tidied.offsets.is_empty() {
        return Ok(tidied);
    }
    if !tidied.bytes.ends_with(b"\n") {
        tidied.bytes.extend_from_slice(tidied.ending.as_bytes());
        tidied.terminated_last = true;
        if let Some(last) = tidied.offsets.last_mut() {
            *last = tidied.bytes.len() as u64;
        }
    }
    if !closes_cleanly(&tidied.bytes[last_start as usize..])? {
        return Err(TidyError::OpenQuote(last_start));
    }
    Ok(tidied)
}

/// Removes leading `\n` and `\r\n` lines from a record span.
fn strip_blank_lines(mut span: &[u8]) -> &[u8] {
    loop {
        if let Some(rest) = span.strip_prefix(b"\n") {
            span = rest;
        } else if let Some(rest) = span.strip_prefix(b"\r\n") {
            span = rest;
        } else {
            return span;
        }
    }
}

/// True if a record written after `last` would be read as a record of its own.
fn closes_cleanly(last: &[u8]) -> Result<bool, TidyError> {
    let followed = [last, &b"x\n"[..]].concat();
    let offsets =
        scan_offsets(followed.as_slice()).map_err(|e| TidyError::Csv(e.to_string()))?;
    Ok(offsets.first() == Some(&(last.len() as u64)) && offsets.len() == 2)
}
