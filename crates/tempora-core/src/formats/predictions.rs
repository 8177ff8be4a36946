//! Predicted edge files: `interval src trg rating` per line, no header.

use super::{fields, line_of, parse_field, reader_builder};
use crate::edge::Edge;
use crate::error::{Error, Result};
use std::io::Read;
use std::path::Path;

/// One candidate edge predicted for an interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionRecord {
    /// Interval the edge is predicted for.
    pub interval: usize,
    pub edge: Edge,
    /// Predictor confidence; higher is more likely.
    pub rating: f64,
}

/// Read prediction records from a reader.
pub fn read_predictions<R: Read>(reader: R) -> Result<Vec<PredictionRecord>> {
    let mut reader = reader_builder().from_reader(reader);
    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = line_of(&record);
        let cols = fields(&record);
        if cols.is_empty() {
            continue;
        }
        if cols.len() < 4 {
            return Err(Error::MalformedRecord {
                line,
                reason: format!(
                    "expected `interval src trg rating`, got {} column(s)",
                    cols.len()
                ),
            });
        }
        let rating: f64 = parse_field(cols[3], line, "rating")?;
        if !rating.is_finite() {
            return Err(Error::MalformedRecord {
                line,
                reason: format!("rating must be finite, got {rating}"),
            });
        }
        records.push(PredictionRecord {
            interval: parse_field(cols[0], line, "interval")?,
            edge: Edge::new(
                parse_field(cols[1], line, "source")?,
                parse_field(cols[2], line, "target")?,
            ),
            rating,
        });
    }
    Ok(records)
}

/// Read a prediction file. A missing file is [`Error::MissingInput`].
pub fn read_prediction_file(path: &Path) -> Result<Vec<PredictionRecord>> {
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    read_predictions(std::fs::File::open(path)?)
}
