//! I/O utilities for CSV reading, writing, and encoding resolution.
//!
//! All CSV access flows through this module:
//!
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//!   Fields that fail to decode are kept in lossy form rather than aborting
//!   a load.
//! - **Reader construction**: readers are flexible, so ragged rows surface
//!   as missing trailing fields instead of errors.
//! - **Headers**: a leading byte-order mark is stripped from the first header.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn open_csv_reader<R>(reader: R, has_headers: bool) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(has_headers)
        .delimiter(DEFAULT_CSV_DELIMITER)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(
    path: &Path,
    has_headers: bool,
) -> std::io::Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(open_csv_reader(BufReader::new(file), has_headers))
}

pub fn open_csv_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(DEFAULT_CSV_DELIMITER)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(BufWriter::new(file)))
}

/// Decodes one field, falling back to lossy replacement on invalid input.
pub fn decode_field(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(
            "Field is not valid {}; keeping lossy text",
            encoding.name()
        );
    }
    text.into_owned()
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Vec<String> {
    record
        .iter()
        .map(|field| decode_field(field, encoding))
        .collect()
}

pub fn decode_headers(record: &csv::ByteRecord, encoding: &'static Encoding) -> Vec<String> {
    let mut headers = decode_record(record, encoding);
    if let Some(first) = headers.first_mut()
        && first.starts_with('\u{feff}')
    {
        *first = first.trim_start_matches('\u{feff}').to_string();
    }
    headers
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> csv::Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    Ok(decode_headers(&headers, encoding))
}
