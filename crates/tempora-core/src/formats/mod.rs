//! Whitespace-delimited file formats.
//!
//! - [`stream`]: `time src trg` edge records
//! - [`scores`]: `node_id score` snapshot exports and batch-score tables
//! - [`predictions`]: `interval src trg rating` candidate edges for replay

pub mod predictions;
pub mod scores;
pub mod stream;

use crate::error::{Error, Result};

/// Space-delimited, headerless reader shared by all formats.
fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All);
    builder
}

/// Whitespace-separated columns of a record.
///
/// Runs of spaces produce empty csv fields and tabs stay inside one, so
/// every field is split again on any whitespace.
fn fields(record: &csv::StringRecord) -> Vec<&str> {
    record.iter().flat_map(str::split_whitespace).collect()
}

fn line_of(record: &csv::StringRecord) -> usize {
    record
        .position()
        .map_or(0, |p| usize::try_from(p.line()).unwrap_or(usize::MAX))
}

fn parse_field<T: std::str::FromStr>(raw: &str, line: usize, what: &str) -> Result<T> {
    raw.parse().map_err(|_| Error::MalformedRecord {
        line,
        reason: format!("cannot parse {what} from {raw:?}"),
    })
}
