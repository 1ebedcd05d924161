//! I/O utilities for CSV reading, writing, encoding, and delimiter resolution.
//!
//! All file I/O in wellbeing-merge flows through this module. It provides:
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.tsv` → tab,
//!   `.csv` → the source profile's default) with manual override support.
//! - **Encoding**: input decoding and output transcoding via `encoding_rs`,
//!   defaulting to UTF-8.
//! - **Reader/writer construction**: `open_csv_reader` and `open_csv_writer`.
//!   Readers are flexible; `RawTable` pads or truncates ragged rows.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.

use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

/// Picks the input delimiter: explicit override, then `.tsv` extension, then
/// the profile default.
pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>, profile_default: u8) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => profile_default,
    })
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>) -> u8 {
    if let Some(delim) = provided {
        return delim;
    }
    match path
        .and_then(|p| p.extension())
        .and_then(|ext| ext.to_str())
    {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

/// Opens a writer on `path` (stdout for `None` or `-`), transcoding to
/// `encoding` when it is not UTF-8.
pub fn open_output(path: Option<&Path>, encoding: &'static Encoding) -> Result<Box<dyn Write>> {
    let base: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };

    Ok(if encoding == UTF_8 {
        base
    } else {
        Box::new(TranscodingWriter::new(base, encoding))
    })
}

pub fn open_csv_writer<W>(writer: W, delimiter: u8) -> csv::Writer<W>
where
    W: Write,
{
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    builder.from_writer(writer)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    decode_record(&headers, encoding)
}

/// Re-encodes UTF-8 output into a legacy encoding. Buffers partial UTF-8
/// sequences that straddle `write` calls.
struct TranscodingWriter<W: Write> {
    inner: W,
    encoding: &'static Encoding,
    buffer: Vec<u8>,
}

impl<W: Write> TranscodingWriter<W> {
    fn new(inner: W, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            encoding,
            buffer: Vec::new(),
        }
    }

    fn drain_valid(&mut self, force: bool) -> io::Result<()> {
        let valid_up_to = match std::str::from_utf8(&self.buffer) {
            Ok(_) => self.buffer.len(),
            Err(err) if err.error_len().is_some() => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "Invalid UTF-8 sequence in output stream",
                ));
            }
            Err(err) => err.valid_up_to(),
        };
        if force && valid_up_to < self.buffer.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Incomplete UTF-8 sequence at end of output stream",
            ));
        }
        if valid_up_to == 0 {
            return Ok(());
        }
        let pending: Vec<u8> = self.buffer.drain(..valid_up_to).collect();
        let text = std::str::from_utf8(&pending)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let (encoded, _, had_errors) = self.encoding.encode(text);
        if had_errors {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to encode text using {}", self.encoding.name()),
            ));
        }
        self.inner.write_all(encoded.as_ref())
    }
}

impl<W: Write> Write for TranscodingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.drain_valid(false)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain_valid(true)?;
        self.inner.flush()
    }
}
