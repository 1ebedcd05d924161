//! Immutable raw tables as loaded from a source file.

use std::io::Read;

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::debug;

use crate::{data::RawCell, io_utils};

static EMPTY_CELL: RawCell = RawCell::Empty;

/// Rows of raw cells addressed by header. Headers are trimmed on construction
/// and every row has exactly one cell per header.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    source: String,
    headers: Vec<String>,
    rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    pub fn new(source: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<RawCell>>) -> Self {
        let headers: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, RawCell::Empty);
                row
            })
            .collect();
        Self {
            source: source.into(),
            headers,
            rows,
        }
    }

    /// Builds a table from string headers and string cells.
    pub fn from_strings(source: impl Into<String>, headers: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            source,
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|cell| RawCell::from_text(cell)).collect())
                .collect(),
        )
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<RawCell>] {
        &self.rows
    }

    pub fn header_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    pub fn cell(&self, row: usize, column: usize) -> &RawCell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn column(&self, column: usize) -> impl Iterator<Item = &RawCell> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(column).unwrap_or(&EMPTY_CELL))
    }
}

pub fn read_raw_table<R: Read>(
    reader: R,
    source: &str,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<RawTable> {
    let mut reader = io_utils::open_csv_reader(reader, delimiter);
    collect_table(&mut reader, source, encoding)
}

fn collect_table<R: Read>(
    reader: &mut csv::Reader<R>,
    source: &str,
    encoding: &'static Encoding,
) -> Result<RawTable> {
    let headers = io_utils::reader_headers(reader, encoding)
        .with_context(|| format!("Reading {source} headers"))?;
    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading {source} row {}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, encoding)
            .with_context(|| format!("Decoding {source} row {}", row_idx + 2))?;
        if decoded.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(decoded.iter().map(|cell| RawCell::from_text(cell)).collect());
    }
    debug!(
        "Loaded {} row(s) x {} column(s) from {source}",
        rows.len(),
        headers.len()
    );
    Ok(RawTable::new(source, headers, rows))
}
