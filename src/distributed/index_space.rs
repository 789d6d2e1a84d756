//! Per-chunk key-range metadata.

use serde::{Deserialize, Serialize};

use crate::table::{Key, LocalTable, Value};

/// Key range summary of one non-empty chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpace {
    /// Keys of the first and last stored rows.
    pub interval: (Key, Key),
    /// Componentwise minimum and maximum keys.
    pub bounding_rectangle: (Key, Key),
    /// Number of rows, if known without materializing.
    pub row_count: Option<usize>,
}

/// Domain of a chunk: either the empty marker or an index space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkDomain {
    Empty,
    Space(IndexSpace),
}

impl ChunkDomain {
    pub fn is_empty(&self) -> bool {
        matches!(self, ChunkDomain::Empty)
    }

    pub fn into_space(self) -> Option<IndexSpace> {
        match self {
            ChunkDomain::Empty => None,
            ChunkDomain::Space(space) => Some(space),
        }
    }
}

impl From<IndexSpace> for ChunkDomain {
    fn from(space: IndexSpace) -> Self {
        ChunkDomain::Space(space)
    }
}

impl IndexSpace {
    pub fn first(&self) -> &Key {
        &self.interval.0
    }

    pub fn last(&self) -> &Key {
        &self.interval.1
    }

    /// True if the two intervals share at least one key (bounds inclusive).
    pub fn overlaps(&self, other: &IndexSpace) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }

    /// True if every key of `self` sorts strictly before every key of `other`.
    pub fn precedes(&self, other: &IndexSpace) -> bool {
        self.last() < other.first()
    }

    /// Smallest space covering both inputs.
    pub fn union(&self, other: &IndexSpace) -> IndexSpace {
        let interval = (
            self.first().clone().min(other.first().clone()),
            self.last().clone().max(other.last().clone()),
        );
        let bounding_rectangle = (
            componentwise(&self.bounding_rectangle.0, &other.bounding_rectangle.0, Value::min),
            componentwise(&self.bounding_rectangle.1, &other.bounding_rectangle.1, Value::max),
        );
        let row_count = match (self.row_count, other.row_count) {
            (Some(a), Some(b)) => Some(a + b),
            _ => None,
        };
        IndexSpace {
            interval,
            bounding_rectangle,
            row_count,
        }
    }

    /// Same space with the row count forgotten.
    pub fn without_row_count(&self) -> IndexSpace {
        IndexSpace {
            row_count: None,
            ..self.clone()
        }
    }
}

fn componentwise(a: &Key, b: &Key, pick: fn(Value, Value) -> Value) -> Key {
    Key::new(
        a.values()
            .iter()
            .zip(b.values())
            .map(|(x, y)| pick(x.clone(), y.clone()))
            .collect(),
    )
}

/// Derive the primary key and domain of a key-sorted local table.
///
/// The leading key column is sorted, so its extrema are the first and last
/// stored values. Trailing key columns are only sorted within runs of equal
/// leading values and are scanned for their true minimum and maximum.
pub fn derive_domain(table: &LocalTable) -> (Vec<String>, ChunkDomain) {
    let pkey = table.pkey();
    let (Some(first), Some(last)) = (table.first_key(), table.last_key()) else {
        return (pkey, ChunkDomain::Empty);
    };

    let mut lower = Vec::with_capacity(pkey.len());
    let mut upper = Vec::with_capacity(pkey.len());
    for component in 0..pkey.len() {
        if component == 0 {
            lower.push(first.values()[0].clone());
            upper.push(last.values()[0].clone());
            continue;
        }
        let column = table.key_column(component).unwrap_or_default();
        // Non-empty table, so both extrema exist
        let min = column.iter().min().cloned().unwrap_or(Value::Null);
        let max = column.iter().max().cloned().unwrap_or(Value::Null);
        lower.push(min);
        upper.push(max);
    }

    let space = IndexSpace {
        interval: (first, last),
        bounding_rectangle: (Key::new(lower), Key::new(upper)),
        row_count: Some(table.num_rows()),
    };
    (pkey, ChunkDomain::Space(space))
}
