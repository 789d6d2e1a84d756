//! The distributed table value.

use std::fmt;
use std::sync::Arc;

use super::chunk::ChunkHandle;
use super::index_space::IndexSpace;
use crate::table::display::{self, ELLIPSIS};
use crate::table::Schema;

/// A logical table split into key-sorted chunks.
///
/// `domains[i]` describes `chunks[i]`. Each chunk is sorted by `pkey`, but
/// chunks may overlap one another. Values are immutable once built; cloning
/// is cheap and shares chunk data and pins.
#[derive(Debug, Clone)]
pub struct DistributedTable {
    pub(crate) pkey: Vec<String>,
    pub(crate) schema: Arc<Schema>,
    pub(crate) key_schema: Arc<Schema>,
    pub(crate) domains: Vec<IndexSpace>,
    pub(crate) chunks: Vec<ChunkHandle>,
}

impl DistributedTable {
    pub(crate) fn from_parts(
        pkey: Vec<String>,
        schema: Schema,
        key_schema: Schema,
        domains: Vec<IndexSpace>,
        chunks: Vec<ChunkHandle>,
    ) -> Self {
        debug_assert_eq!(domains.len(), chunks.len());
        Self {
            pkey,
            schema: Arc::new(schema),
            key_schema: Arc::new(key_schema),
            domains,
            chunks,
        }
    }

    /// Primary key column names.
    pub fn pkey(&self) -> &[String] {
        &self.pkey
    }

    /// Row schema promoted across all chunks.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Key schema promoted across all chunks.
    pub fn key_schema(&self) -> &Arc<Schema> {
        &self.key_schema
    }

    pub fn domains(&self) -> &[IndexSpace] {
        &self.domains
    }

    pub fn chunks(&self) -> &[ChunkHandle] {
        &self.chunks
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn has_pending(&self) -> bool {
        self.chunks.iter().any(ChunkHandle::is_pending)
    }

    /// Index space covering every chunk, or `None` for a table without chunks.
    pub fn domain(&self) -> Option<IndexSpace> {
        let mut spaces = self.domains.iter();
        let first = spaces.next()?.clone();
        Some(spaces.fold(first, |acc, space| acc.union(space)))
    }

    /// True if each chunk's keys strictly precede the next chunk's keys.
    pub fn is_ordered(&self) -> bool {
        self.domains.windows(2).all(|w| w[0].precedes(&w[1]))
    }

    /// Render a summary line and the first `max_rows` rows of materialized
    /// chunks in chunk order. Nothing is merged or computed.
    pub fn render(&self, max_rows: usize) -> String {
        let rows = match self.row_count() {
            Some(n) => n.to_string(),
            None => "an unknown number of".to_string(),
        };
        let mut lines = vec![format!(
            "Distributed table with {} rows in {} chunks:",
            rows,
            self.num_chunks()
        )];

        let mut shown = 0;
        let mut blocked_by_pending = false;
        let mut header_done = false;
        for chunk in &self.chunks {
            if shown >= max_rows {
                break;
            }
            let Some(table) = chunk.table() else {
                blocked_by_pending = true;
                break;
            };
            if !header_done {
                lines.push(display::render_header(table));
                header_done = true;
            }
            for row in table.rows().take(max_rows - shown) {
                lines.push(display::render_row(&row));
                shown += 1;
            }
        }

        if blocked_by_pending {
            lines.push(format!("{} (pending chunks not shown)", ELLIPSIS));
        } else if let Some(hidden) = self.row_count().map(|n| n.saturating_sub(shown)) {
            if hidden > 0 {
                lines.push(format!("{} ({} more rows)", ELLIPSIS, hidden));
            }
        }
        lines.join("\n")
    }
}

impl fmt::Display for DistributedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(display::DEFAULT_MAX_ROWS))
    }
}
