//! Two-column score tables: `node_id score`, no header.
//!
//! Snapshot exports only contain nodes with a strictly positive score, sorted
//! by node id. Readers accept ids written as floats (`12.0`), which some
//! external tools produce.

use super::{fields, line_of, parse_field, reader_builder};
use crate::edge::NodeId;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Per-node scores keyed by node id.
pub type ScoreMap = BTreeMap<NodeId, f64>;

/// Location of one exported snapshot: `{dir}/{label}/{prefix}_{index}.csv`.
pub fn score_file_path(dir: &Path, label: &str, prefix: &str, index: usize) -> PathBuf {
    dir.join(label).join(format!("{prefix}_{index}.csv"))
}

/// Write `(node, score)` rows with a strictly positive score.
///
/// Rows are written in the order given; callers pass them sorted by node id.
pub fn write_scores<W: Write>(writer: W, rows: &[(NodeId, f64)]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .from_writer(writer);
    for &(node, score) in rows.iter().filter(|(_, s)| *s > 0.0) {
        writer.write_record([node.to_string(), score.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a score table to `path`, creating parent directories.
pub fn write_score_file(path: &Path, rows: &[(NodeId, f64)]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_scores(std::io::BufWriter::new(file), rows)
}

fn parse_node(raw: &str, line: usize) -> Result<NodeId> {
    if let Ok(id) = raw.parse::<NodeId>() {
        return Ok(id);
    }
    let value: f64 = parse_field(raw, line, "node id")?;
    if value.fract() == 0.0 && (0.0..=u64::MAX as f64).contains(&value) {
        return Ok(value as NodeId);
    }
    Err(Error::MalformedRecord {
        line,
        reason: format!("node id {raw:?} is not a non-negative integer"),
    })
}

/// Read a score table.
pub fn read_scores<R: Read>(reader: R) -> Result<ScoreMap> {
    let mut reader = reader_builder().from_reader(reader);
    let mut scores = ScoreMap::new();
    for result in reader.records() {
        let record = result?;
        let line = line_of(&record);
        let cols = fields(&record);
        match cols.len() {
            0 => continue,
            1 => {
                return Err(Error::MalformedRecord {
                    line,
                    reason: "expected `node score`".into(),
                })
            }
            _ => {
                let node = parse_node(cols[0], line)?;
                let score = parse_field(cols[1], line, "score")?;
                scores.insert(node, score);
            }
        }
    }
    Ok(scores)
}

/// Read a score table from disk. A missing file is [`Error::MissingInput`].
pub fn read_score_file(path: &Path) -> Result<ScoreMap> {
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    read_scores(std::fs::File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_skips_non_positive() {
        let mut buf = Vec::new();
        write_scores(&mut buf, &[(1, 0.5), (2, 0.0), (3, -1.0), (4, 2.0)]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1 0.5\n4 2\n");
    }

    #[test]
    fn test_read_tolerates_float_ids() {
        let scores = read_scores("12.0 0.25\n3 1.5\n\n".as_bytes()).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[&12], 0.25);
        assert_eq!(scores[&3], 1.5);
    }

    #[test]
    fn test_read_rejects_fractional_id() {
        assert!(read_scores("1.5 0.25\n".as_bytes()).is_err());
    }

    #[test]
    fn test_path_layout() {
        let path = score_file_path(Path::new("/tmp/run/original"), "tk_b0.50_Const(1.00)", "tk", 3);
        assert_eq!(
            path,
            PathBuf::from("/tmp/run/original/tk_b0.50_Const(1.00)/tk_3.csv")
        );
    }
}
