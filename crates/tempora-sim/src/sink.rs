//! Destinations for exported score tables.
//!
//! Computers return tables in memory; a [`SnapshotSink`] decides where they
//! go. [`FileExporter`] writes the on-disk layout
//! `{root}/{scope}/{label}/{prefix}_{index}.csv`, [`MemorySink`] keeps
//! everything in a map for tests and embedding.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tempora_core::formats::scores::{read_score_file, score_file_path, write_score_file};
use tempora_core::{Error, Result, ScoreMap};
use tempora_rank::{ScoreLookup, ScoreTable};

/// Where a set of snapshots belongs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExportScope {
    /// Scores of the live computers.
    Original,
    /// Scores of a replay simulator, by simulator id.
    Prediction(String),
}

impl fmt::Display for ExportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => f.write_str("original"),
            Self::Prediction(id) => write!(f, "predictions/{id}"),
        }
    }
}

/// Receives exported tables and serves them back to later readers.
pub trait SnapshotSink {
    /// Store one table of snapshot `index`.
    fn write(&mut self, scope: &ExportScope, index: usize, table: &ScoreTable) -> Result<()>;

    /// Read back a table stored under `part` (`"{label}/{prefix}"`).
    fn read(&self, scope: &ExportScope, part: &str, index: usize) -> Result<ScoreMap>;
}

/// A sink restricted to one scope, handed to computers after an export.
pub struct ScopedLookup<'a> {
    pub sink: &'a dyn SnapshotSink,
    pub scope: &'a ExportScope,
}

impl ScoreLookup for ScopedLookup<'_> {
    fn scores(&self, part: &str, index: usize) -> Result<ScoreMap> {
        self.sink.read(self.scope, part, index)
    }
}

/// Writes every table to its own whitespace-delimited file.
#[derive(Debug, Clone)]
pub struct FileExporter {
    root: PathBuf,
}

impl FileExporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a scope.
    pub fn scope_dir(&self, scope: &ExportScope) -> PathBuf {
        self.root.join(scope.to_string())
    }

    /// File a table of snapshot `index` is written to.
    pub fn table_path(
        &self,
        scope: &ExportScope,
        label: &str,
        prefix: &str,
        index: usize,
    ) -> PathBuf {
        score_file_path(&self.scope_dir(scope), label, prefix, index)
    }
}

impl SnapshotSink for FileExporter {
    fn write(&mut self, scope: &ExportScope, index: usize, table: &ScoreTable) -> Result<()> {
        let path = self.table_path(scope, &table.label, table.prefix, index);
        write_score_file(&path, table.rows())
    }

    fn read(&self, scope: &ExportScope, part: &str, index: usize) -> Result<ScoreMap> {
        let path = self.scope_dir(scope).join(format!("{part}_{index}.csv"));
        read_score_file(&path)
    }
}

/// Keeps exported tables in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    tables: BTreeMap<(ExportScope, String, usize), ScoreTable>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table of `label` at snapshot `index`.
    pub fn get(&self, scope: &ExportScope, label: &str, index: usize) -> Option<&ScoreTable> {
        self.tables.get(&(scope.clone(), label.to_string(), index))
    }

    /// Number of stored tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Snapshot indices stored for `label`, ascending.
    pub fn indices(&self, scope: &ExportScope, label: &str) -> Vec<usize> {
        self.tables
            .keys()
            .filter(|(s, l, _)| s == scope && l == label)
            .map(|(_, _, i)| *i)
            .collect()
    }
}

impl SnapshotSink for MemorySink {
    fn write(&mut self, scope: &ExportScope, index: usize, table: &ScoreTable) -> Result<()> {
        self.tables
            .insert((scope.clone(), table.label.clone(), index), table.clone());
        Ok(())
    }

    fn read(&self, scope: &ExportScope, part: &str, index: usize) -> Result<ScoreMap> {
        let missing = || Error::MissingInput(PathBuf::from(format!("{scope}/{part}_{index}.csv")));
        let (label, prefix) = part.split_once('/').ok_or_else(missing)?;
        let table = self.get(scope, label, index).ok_or_else(missing)?;
        if table.prefix != prefix {
            return Err(missing());
        }
        Ok(table.rows().iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ScoreTable {
        ScoreTable::new("tk_b1.00_Const(1.00)", "tk", vec![(2, 1.5), (1, 0.25), (3, 0.0)])
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(ExportScope::Original.to_string(), "original");
        assert_eq!(
            ExportScope::Prediction("ranked_lr".into()).to_string(),
            "predictions/ranked_lr"
        );
    }

    #[test]
    fn test_memory_round_trip() {
        let mut sink = MemorySink::new();
        sink.write(&ExportScope::Original, 3, &table()).unwrap();
        let scores = sink
            .read(&ExportScope::Original, "tk_b1.00_Const(1.00)/tk", 3)
            .unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[&2], 1.5);

        assert!(sink.read(&ExportScope::Original, "tk_b1.00_Const(1.00)/tk", 4).is_err());
        assert!(sink.read(&ExportScope::Original, "tk_b1.00_Const(1.00)/ttk", 3).is_err());
        assert!(sink
            .read(&ExportScope::Prediction("x".into()), "tk_b1.00_Const(1.00)/tk", 3)
            .is_err());
    }

    #[test]
    fn test_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileExporter::new(dir.path());
        sink.write(&ExportScope::Original, 0, &table()).unwrap();

        let path = dir.path().join("original/tk_b1.00_Const(1.00)/tk_0.csv");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1 0.25\n2 1.5\n");

        let scores = sink
            .read(&ExportScope::Original, "tk_b1.00_Const(1.00)/tk", 0)
            .unwrap();
        assert_eq!(scores[&1], 0.25);
        assert!(matches!(
            sink.read(&ExportScope::Original, "tk_b1.00_Const(1.00)/tk", 1),
            Err(Error::MissingInput(_))
        ));
    }
}
