//! Splitting a local table into a distributed one.

use tracing::debug;

use super::builder::TableBuilder;
use super::chunk::ChunkHandle;
use super::table::DistributedTable;
use crate::error::{ErrorCode, Result, TableError};
use crate::table::LocalTable;

/// How rows are assigned to chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partitioning {
    /// `n` contiguous chunks whose sizes differ by at most one. Earlier chunks
    /// take the remainder.
    Chunks(usize),
    /// Explicit chunk lengths summing to the row count.
    Lengths(Vec<usize>),
}

impl Partitioning {
    /// Chunk lengths for a table of `rows` rows.
    pub fn lengths(&self, rows: usize) -> Result<Vec<usize>> {
        match self {
            Partitioning::Chunks(0) => Err(TableError::construction_with_code(
                ErrorCode::CONSTRUCTION_BAD_PARTITIONING,
                "cannot distribute into zero chunks",
            )),
            Partitioning::Chunks(n) => {
                let (base, remainder) = (rows / n, rows % n);
                Ok((0..*n).map(|i| base + usize::from(i < remainder)).collect())
            }
            Partitioning::Lengths(lengths) => {
                let total: usize = lengths.iter().sum();
                if total != rows {
                    return Err(TableError::construction_with_code(
                        ErrorCode::CONSTRUCTION_BAD_PARTITIONING,
                        format!(
                            "chunk lengths sum to {} but the table has {} rows",
                            total, rows
                        ),
                    ));
                }
                Ok(lengths.clone())
            }
        }
    }
}

/// Split `table` into contiguous key-sorted chunks.
///
/// The source is sorted by its primary key, so the result is globally
/// ordered. Empty chunks are dropped by the builder.
pub fn distribute(table: &LocalTable, partitioning: &Partitioning) -> Result<DistributedTable> {
    let lengths = partitioning.lengths(table.num_rows())?;
    debug!(
        "Distributing {} rows into {} chunks",
        table.num_rows(),
        lengths.len()
    );

    let mut start = 0;
    let chunks = lengths
        .iter()
        .map(|len| {
            let chunk = table.slice(start..start + len);
            start += len;
            ChunkHandle::materialized(chunk)
        })
        .collect();

    TableBuilder::new(chunks).build_resolved()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn numbers(n: i64) -> LocalTable {
        LocalTable::from_rows(
            &["id"],
            (1..=n).map(|i| vec![Value::Int(i)]).collect(),
            &["id"],
        )
        .unwrap()
    }

    #[test]
    fn test_even_split_with_remainder() {
        assert_eq!(Partitioning::Chunks(3).lengths(10).unwrap(), vec![4, 3, 3]);
        assert_eq!(Partitioning::Chunks(4).lengths(2).unwrap(), vec![1, 1, 0, 0]);
    }

    #[test]
    fn test_distribute_is_ordered() {
        let table = distribute(&numbers(10), &Partitioning::Chunks(2)).unwrap();
        assert_eq!(table.num_chunks(), 2);
        assert!(table.is_ordered());

        let domain = table.domain().unwrap();
        assert_eq!(domain.first().values(), &[Value::Int(1)]);
        assert_eq!(domain.last().values(), &[Value::Int(10)]);
        assert_eq!(domain.row_count, Some(10));
    }

    #[test]
    fn test_more_chunks_than_rows() {
        let table = distribute(&numbers(3), &Partitioning::Chunks(8)).unwrap();
        assert_eq!(table.num_chunks(), 3);
        assert_eq!(table.length().unwrap(), 3);
    }

    #[test]
    fn test_explicit_lengths() {
        let table = distribute(&numbers(5), &Partitioning::Lengths(vec![1, 0, 4])).unwrap();
        let counts: Vec<_> = table.domains().iter().map(|d| d.row_count).collect();
        assert_eq!(counts, vec![Some(1), Some(4)]);
    }

    #[test]
    fn test_bad_partitioning() {
        let zero = distribute(&numbers(5), &Partitioning::Chunks(0)).unwrap_err();
        assert_eq!(zero.code(), ErrorCode::CONSTRUCTION_BAD_PARTITIONING);

        let short = distribute(&numbers(5), &Partitioning::Lengths(vec![2, 2])).unwrap_err();
        assert!(matches!(short, TableError::Construction { .. }));
        assert!(short.to_string().contains("sum to 4"));
    }

    #[test]
    fn test_render_summary() {
        let table = distribute(&numbers(12), &Partitioning::Chunks(3)).unwrap();
        let rendered = table.render(5);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "Distributed table with 12 rows in 3 chunks:");
        assert_eq!(lines[1], "id*");
        assert_eq!(lines[2], "1");
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[7], "⋮ (7 more rows)");
    }
}
