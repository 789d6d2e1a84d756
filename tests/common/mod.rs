//! Common test utilities and helpers

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use disttable::{LocalTable, Value};
use tempfile::TempDir;

/// Table keyed by `id` with rows `(id, id * 10)` for every id in `ids`.
pub fn id_table(ids: impl IntoIterator<Item = i64>) -> LocalTable {
    LocalTable::from_rows(
        &["id", "value"],
        ids.into_iter()
            .map(|i| vec![Value::Int(i), Value::Int(i * 10)])
            .collect(),
        &["id"],
    )
    .unwrap()
}

/// Table keyed by `id` from explicit `(id, value)` pairs.
pub fn pairs_table(pairs: &[(i64, i64)]) -> LocalTable {
    LocalTable::from_rows(
        &["id", "value"],
        pairs
            .iter()
            .map(|(k, v)| vec![Value::Int(*k), Value::Int(*v)])
            .collect(),
        &["id"],
    )
    .unwrap()
}

/// `(id, value)` pairs of a table in stored order.
pub fn pairs_of(table: &LocalTable) -> Vec<(i64, i64)> {
    table
        .rows()
        .map(|row| match (&row[0], &row[1]) {
            (Value::Int(k), Value::Int(v)) => (*k, *v),
            other => panic!("unexpected row {:?}", other),
        })
        .collect()
}

/// Temporary directory holding CSV fixtures.
pub struct CsvFixture {
    pub dir: TempDir,
}

impl CsvFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Write `content` to `name` inside the fixture directory.
    pub fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
