//! Edge stream files: one `time src trg` record per line.

use super::{fields, line_of, parse_field, reader_builder};
use crate::edge::EdgeRecord;
use crate::error::{Error, Result};
use crate::indexer::EdgeStream;
use std::io::Read;
use std::path::Path;

/// Read edge records from a reader.
///
/// Columns beyond the third are ignored. Blank lines are skipped.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<EdgeRecord>> {
    let mut reader = reader_builder().from_reader(reader);
    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = line_of(&record);
        let cols = fields(&record);
        if cols.is_empty() {
            continue;
        }
        if cols.len() < 3 {
            return Err(Error::MalformedRecord {
                line,
                reason: format!("expected `time src trg`, got {} column(s)", cols.len()),
            });
        }
        records.push(EdgeRecord::new(
            parse_field(cols[0], line, "time")?,
            parse_field(cols[1], line, "source")?,
            parse_field(cols[2], line, "target")?,
        ));
    }
    Ok(records)
}

/// Read and index an edge stream file.
pub fn read_stream(path: impl AsRef<Path>) -> Result<EdgeStream> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    Ok(EdgeStream::from_records(read_records(file)?))
}
